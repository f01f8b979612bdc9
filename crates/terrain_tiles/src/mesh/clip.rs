//! Clip a mesh to the tile cube `[-1, 1]^3`.
//!
//! Planes are processed one at a time: `-X, +X, -Y, +Y, -Z, +Z`. Against a
//! plane, a triangle is
//!
//! - kept when all three vertices are inside (on the plane counts as inside),
//! - dropped when no vertex is strictly inside,
//! - cut into one triangle when one vertex is inside and two outside,
//! - cut into two triangles when two vertices are inside and one outside.
//!
//! New vertices interpolate position and normal along the cut edge and are
//! snapped onto the plane. Crossings are shared between the two triangles of
//! an edge. Unreferenced vertices are removed at the end, keeping the relative
//! order of the survivors, which makes clipping an already clipped mesh a no-op.

use std::collections::HashMap;

use glam::Vec2;
use smallvec::SmallVec;

use super::{TileMesh, TileVertex};

type Triangle = [u32; 3];

/// Clip `mesh` against the unit cube.
#[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "mesh::clip"))]
pub fn clip_to_unit_cube(mesh: &TileMesh) -> TileMesh {
  let mut vertices = mesh.vertices.clone();
  let mut triangles: Vec<Triangle> = mesh
    .indices
    .chunks_exact(3)
    .map(|t| [t[0], t[1], t[2]])
    .collect();

  for axis in 0..3 {
    for side in [-1.0f32, 1.0] {
      triangles = clip_plane(&mut vertices, &triangles, axis, side);
      if triangles.is_empty() {
        return TileMesh::new();
      }
    }
  }

  compact(vertices, triangles)
}

/// Signed distance to the plane, positive inside.
#[inline]
fn inside_distance(vertex: &TileVertex, axis: usize, side: f32) -> f32 {
  1.0 - side * vertex.position[axis]
}

fn clip_plane(
  vertices: &mut Vec<TileVertex>,
  triangles: &[Triangle],
  axis: usize,
  side: f32,
) -> Vec<Triangle> {
  let mut out = Vec::with_capacity(triangles.len());
  let mut crossings: HashMap<(u32, u32), u32> = HashMap::new();

  for tri in triangles {
    let d = tri.map(|i| inside_distance(&vertices[i as usize], axis, side));
    let inside = d.map(|d| d >= 0.0);
    let inside_count = inside.iter().filter(|&&b| b).count();

    if inside_count == 3 {
      out.push(*tri);
      continue;
    }
    if !d.iter().any(|&d| d > 0.0) {
      continue;
    }

    let mut pieces: SmallVec<[Triangle; 2]> = SmallVec::new();
    match inside_count {
      1 => {
        // Rotate so the inside vertex leads, keeping winding.
        let k = inside.iter().position(|&b| b).unwrap_or(0);
        let [i, x, y] = rotate(*tri, k);
        let ix = crossing(vertices, &mut crossings, i, x, axis, side);
        let yi = crossing(vertices, &mut crossings, i, y, axis, side);
        pieces.push([i, ix, yi]);
      }
      2 => {
        // Rotate so the outside vertex leads.
        let k = inside.iter().position(|&b| !b).unwrap_or(0);
        let [o, p, q] = rotate(*tri, k);
        let op = crossing(vertices, &mut crossings, p, o, axis, side);
        let qo = crossing(vertices, &mut crossings, q, o, axis, side);
        pieces.push([op, p, q]);
        pieces.push([op, q, qo]);
      }
      _ => {}
    }

    out.extend(
      pieces
        .into_iter()
        .filter(|t| t[0] != t[1] && t[1] != t[2] && t[2] != t[0]),
    );
  }

  out
}

#[inline]
fn rotate(tri: Triangle, k: usize) -> Triangle {
  [tri[k], tri[(k + 1) % 3], tri[(k + 2) % 3]]
}

/// Vertex where edge `inside -> outside` meets the plane, created once per edge.
fn crossing(
  vertices: &mut Vec<TileVertex>,
  cache: &mut HashMap<(u32, u32), u32>,
  inside: u32,
  outside: u32,
  axis: usize,
  side: f32,
) -> u32 {
  if let Some(&index) = cache.get(&(inside, outside)) {
    return index;
  }

  let a = vertices[inside as usize];
  let b = vertices[outside as usize];
  let da = inside_distance(&a, axis, side);
  let db = inside_distance(&b, axis, side);
  let t = da / (da - db);
  debug_assert!((0.0..=1.0).contains(&t), "clip ratio out of range: {t}");

  let index = if t <= 0.0 {
    inside
  } else {
    let mut position = a.pos().lerp(b.pos(), t);
    position[axis] = side;
    // Axes already processed stay inside the cube despite rounding.
    for done in 0..axis {
      position[done] = position[done].clamp(-1.0, 1.0);
    }
    let normal = a
      .norm()
      .lerp(b.norm(), t)
      .try_normalize()
      .unwrap_or_else(|| a.norm());
    let uv = Vec2::from_array(a.uv).lerp(Vec2::from_array(b.uv), t);

    vertices.push(TileVertex {
      position: position.to_array(),
      normal: normal.to_array(),
      uv: uv.to_array(),
    });
    (vertices.len() - 1) as u32
  };

  cache.insert((inside, outside), index);
  index
}

/// Drop unreferenced vertices and remap indices, preserving vertex order.
fn compact(vertices: Vec<TileVertex>, triangles: Vec<Triangle>) -> TileMesh {
  let mut remap = vec![u32::MAX; vertices.len()];
  for tri in &triangles {
    for &i in tri {
      remap[i as usize] = 0;
    }
  }

  let mut mesh = TileMesh::new();
  for (old, vertex) in vertices.into_iter().enumerate() {
    if remap[old] == 0 {
      remap[old] = mesh.vertices.len() as u32;
      mesh.vertices.push(vertex);
    }
  }
  mesh.indices = triangles
    .iter()
    .flat_map(|tri| tri.map(|i| remap[i as usize]))
    .collect();
  mesh.recalculate_bounds();
  mesh
}

#[cfg(test)]
#[path = "clip_test.rs"]
mod clip_test;
