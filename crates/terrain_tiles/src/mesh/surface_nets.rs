//! Naive surface nets over a [`DensityGrid`].
//!
//! One vertex per cell whose corners straddle the zero level, placed at the
//! centroid of the cell's edge crossings. One quad per grid edge with a sign
//! change, connecting the four cells around that edge. Quads are split along
//! their shorter diagonal and vertex normals are the normalized sum of the
//! unit face normals around each vertex.

use glam::{UVec3, Vec3};

use super::sampling::DensityGrid;
use super::{TileMesh, TileVertex};

/// Corner offsets in bit order: bit 0 = X, bit 1 = Y, bit 2 = Z.
const CORNER_OFFSETS: [UVec3; 8] = [
  UVec3::new(0, 0, 0),
  UVec3::new(1, 0, 0),
  UVec3::new(0, 1, 0),
  UVec3::new(1, 1, 0),
  UVec3::new(0, 0, 1),
  UVec3::new(1, 0, 1),
  UVec3::new(0, 1, 1),
  UVec3::new(1, 1, 1),
];

/// The 12 cube edges as corner index pairs.
const CUBE_EDGES: [(usize, usize); 12] = [
  // X-aligned
  (0, 1),
  (2, 3),
  (4, 5),
  (6, 7),
  // Y-aligned
  (0, 2),
  (1, 3),
  (4, 6),
  (5, 7),
  // Z-aligned
  (0, 4),
  (1, 5),
  (2, 6),
  (3, 7),
];

const NO_VERTEX: u32 = u32::MAX;

#[inline]
fn is_solid(value: f32) -> bool {
  value < 0.0
}

/// Extract the zero level set as an indexed mesh without UVs.
#[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "mesh::surface_nets"))]
pub fn extract(grid: &DensityGrid) -> TileMesh {
  let size = grid.size;
  let cells = size - 1;
  let mut mesh = TileMesh::new();
  let mut cell_vertex = vec![NO_VERTEX; cells * cells * cells];
  let cell_index = |x: usize, y: usize, z: usize| (z * cells + y) * cells + x;

  // Vertices
  for z in 0..cells {
    for y in 0..cells {
      for x in 0..cells {
        let mut corners = [0.0f32; 8];
        let mut mask = 0u8;
        for (i, offset) in CORNER_OFFSETS.iter().enumerate() {
          let v = grid.get(x + offset.x as usize, y + offset.y as usize, z + offset.z as usize);
          corners[i] = v;
          if is_solid(v) {
            mask |= 1 << i;
          }
        }
        if mask == 0 || mask == 0xFF {
          continue;
        }

        let mut sum = Vec3::ZERO;
        let mut crossings = 0u32;
        for &(a, b) in &CUBE_EDGES {
          let (va, vb) = (corners[a], corners[b]);
          if is_solid(va) == is_solid(vb) {
            continue;
          }
          let t = va / (va - vb);
          let pa = CORNER_OFFSETS[a].as_vec3();
          let pb = CORNER_OFFSETS[b].as_vec3();
          sum += pa + (pb - pa) * t;
          crossings += 1;
        }
        let offset = sum / crossings as f32;
        let local = grid.grid_to_local(Vec3::new(x as f32, y as f32, z as f32) + offset);

        cell_vertex[cell_index(x, y, z)] = mesh.vertices.len() as u32;
        mesh.vertices.push(TileVertex::new(local, Vec3::ZERO));
      }
    }
  }

  if mesh.vertices.is_empty() {
    return mesh;
  }

  // Quads: every sample edge with a sign change whose 4 surrounding cells exist.
  for z in 0..size {
    for y in 0..size {
      for x in 0..size {
        let p = [x, y, z];
        let solid_here = is_solid(grid.get(x, y, z));
        for axis in 0..3 {
          if p[axis] + 1 >= size {
            continue;
          }
          let u = (axis + 1) % 3;
          let v = (axis + 2) % 3;
          if p[u] == 0 || p[v] == 0 || p[u] >= cells || p[v] >= cells {
            continue;
          }
          let mut q = p;
          q[axis] += 1;
          if solid_here == is_solid(grid.get(q[0], q[1], q[2])) {
            continue;
          }

          let cell = |du: usize, dv: usize| {
            let mut c = p;
            c[u] -= du;
            c[v] -= dv;
            cell_vertex[cell_index(c[0], c[1], c[2])]
          };
          let mut quad = [cell(1, 1), cell(0, 1), cell(0, 0), cell(1, 0)];
          debug_assert!(quad.iter().all(|&i| i != NO_VERTEX), "cells around a crossing edge must have vertices");
          if !solid_here {
            quad.reverse();
          }
          emit_quad(&mut mesh, quad);
        }
      }
    }
  }

  finish_normals(&mut mesh);
  mesh.recalculate_bounds();
  mesh
}

/// Split along the shorter diagonal and accumulate unit face normals.
fn emit_quad(mesh: &mut TileMesh, quad: [u32; 4]) {
  let p = quad.map(|i| mesh.vertices[i as usize].pos());
  let triangles = if p[0].distance_squared(p[2]) <= p[1].distance_squared(p[3]) {
    [[quad[0], quad[1], quad[2]], [quad[0], quad[2], quad[3]]]
  } else {
    [[quad[1], quad[2], quad[3]], [quad[1], quad[3], quad[0]]]
  };

  for tri in triangles {
    let [a, b, c] = tri.map(|i| mesh.vertices[i as usize].pos());
    let Some(normal) = (b - a).cross(c - a).try_normalize() else {
      continue;
    };
    for i in tri {
      let vertex = &mut mesh.vertices[i as usize];
      vertex.normal = (vertex.norm() + normal).to_array();
    }
    mesh.indices.extend_from_slice(&tri);
  }
}

/// Normalize accumulated normals; vertices without faces point up.
pub(crate) fn finish_normals(mesh: &mut TileMesh) {
  for vertex in &mut mesh.vertices {
    vertex.normal = vertex.norm().try_normalize().unwrap_or(Vec3::Y).to_array();
  }
}

#[cfg(test)]
#[path = "surface_nets_test.rs"]
mod surface_nets_test;
