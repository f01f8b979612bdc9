//! CPU collision mesh for a tile.
//!
//! Triangles in tile-local space behind a bounding volume hierarchy, built
//! once on the generating thread and shared immutably afterwards. Segment
//! queries are parameterized in `[0, 1]` along the segment, which is invariant
//! under the tile transform, so callers can cast in world space by mapping the
//! segment end points into local space.

use glam::Vec3;

use crate::mesh::{MinMaxAABB, TileMesh};

/// Triangles per leaf.
const LEAF_SIZE: usize = 4;
const TRAVERSAL_STACK: usize = 64;

#[derive(Clone, Copy, Debug)]
enum NodeKind {
  Leaf { start: u32, count: u32 },
  Inner { left: u32, right: u32 },
}

#[derive(Clone, Copy, Debug)]
struct BvhNode {
  bounds: MinMaxAABB,
  kind: NodeKind,
}

/// Closest intersection along a segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentHit {
  /// Fraction of the segment, in `[0, 1]`.
  pub t: f32,
  /// Tile-local hit point.
  pub point: Vec3,
  /// Unit geometric normal of the hit triangle (front face winding).
  pub normal: Vec3,
}

/// Immutable triangle BVH in tile-local space.
#[derive(Clone, Debug, Default)]
pub struct TileCollider {
  triangles: Vec<[Vec3; 3]>,
  nodes: Vec<BvhNode>,
}

impl TileCollider {
  /// Build from the positions of a tile mesh.
  #[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "collider::build"))]
  pub fn from_mesh(mesh: &TileMesh) -> Self {
    let triangles: Vec<[Vec3; 3]> = (0..mesh.triangle_count()).map(|t| mesh.triangle(t)).collect();
    Self::from_triangles(triangles)
  }

  pub fn from_triangles(mut triangles: Vec<[Vec3; 3]>) -> Self {
    let mut nodes = Vec::with_capacity((triangles.len() / LEAF_SIZE + 1) * 2);
    if !triangles.is_empty() {
      let count = triangles.len();
      build(&mut triangles, 0, count, &mut nodes);
    }
    Self { triangles, nodes }
  }

  pub fn is_empty(&self) -> bool {
    self.triangles.is_empty()
  }

  pub fn triangle_count(&self) -> usize {
    self.triangles.len()
  }

  /// Local bounds of all triangles.
  pub fn bounds(&self) -> MinMaxAABB {
    self.nodes.first().map(|n| n.bounds).unwrap_or_default()
  }

  /// Approximate heap footprint.
  pub fn memory_bytes(&self) -> usize {
    self.triangles.len() * std::mem::size_of::<[Vec3; 3]>()
      + self.nodes.len() * std::mem::size_of::<BvhNode>()
  }

  /// Closest hit of the segment `origin -> target`, both in tile-local space.
  pub fn cast_segment(&self, origin: Vec3, target: Vec3) -> Option<SegmentHit> {
    if self.nodes.is_empty() {
      return None;
    }
    let dir = target - origin;
    let inv_dir = dir.recip();
    let mut best: Option<(f32, usize)> = None;
    let mut stack = [0u32; TRAVERSAL_STACK];
    let mut depth = 1;

    while depth > 0 {
      depth -= 1;
      let node = &self.nodes[stack[depth] as usize];
      let limit = best.map_or(1.0, |(t, _)| t);
      if node.bounds.ray_entry(origin, inv_dir, limit).is_none() {
        continue;
      }
      match node.kind {
        NodeKind::Leaf { start, count } => {
          for i in start as usize..(start + count) as usize {
            if let Some(t) = intersect_triangle(origin, dir, &self.triangles[i]) {
              if best.map_or(true, |(bt, _)| t < bt) {
                best = Some((t, i));
              }
            }
          }
        }
        NodeKind::Inner { left, right } => {
          // Depth is bounded by the median split: log2(n / LEAF_SIZE) + 1.
          if depth + 2 <= TRAVERSAL_STACK {
            stack[depth] = right;
            stack[depth + 1] = left;
            depth += 2;
          }
        }
      }
    }

    best.map(|(t, i)| {
      let [a, b, c] = self.triangles[i];
      SegmentHit {
        t,
        point: origin + dir * t,
        normal: (b - a).cross(c - a).normalize_or_zero(),
      }
    })
  }

  /// Brute-force reference query over every triangle.
  pub fn cast_segment_linear(&self, origin: Vec3, target: Vec3) -> Option<f32> {
    let dir = target - origin;
    self
      .triangles
      .iter()
      .filter_map(|tri| intersect_triangle(origin, dir, tri))
      .min_by(f32::total_cmp)
  }
}

fn centroid(tri: &[Vec3; 3]) -> Vec3 {
  (tri[0] + tri[1] + tri[2]) / 3.0
}

/// Median split on the longest centroid axis; returns the node index.
fn build(triangles: &mut [[Vec3; 3]], start: usize, end: usize, nodes: &mut Vec<BvhNode>) -> u32 {
  let slice = &mut triangles[start..end];
  let mut bounds = MinMaxAABB::empty();
  let mut centroids = MinMaxAABB::empty();
  for tri in slice.iter() {
    for &p in tri {
      bounds.encapsulate(p);
    }
    centroids.encapsulate(centroid(tri));
  }

  let index = nodes.len() as u32;
  let count = end - start;
  if count <= LEAF_SIZE {
    nodes.push(BvhNode {
      bounds,
      kind: NodeKind::Leaf {
        start: start as u32,
        count: count as u32,
      },
    });
    return index;
  }

  let axis = centroids.longest_axis();
  let mid = count / 2;
  slice.select_nth_unstable_by(mid, |a, b| centroid(a)[axis].total_cmp(&centroid(b)[axis]));

  nodes.push(BvhNode {
    bounds,
    kind: NodeKind::Leaf { start: 0, count: 0 },
  });
  let left = build(triangles, start, start + mid, nodes);
  let right = build(triangles, start + mid, end, nodes);
  nodes[index as usize].kind = NodeKind::Inner { left, right };
  index
}

/// Moller-Trumbore, double sided; `t` along `dir` restricted to `[0, 1]`.
#[inline]
fn intersect_triangle(origin: Vec3, dir: Vec3, tri: &[Vec3; 3]) -> Option<f32> {
  const EPSILON: f32 = 1e-9;
  let e1 = tri[1] - tri[0];
  let e2 = tri[2] - tri[0];
  let p = dir.cross(e2);
  let det = e1.dot(p);
  if det.abs() < EPSILON {
    return None;
  }
  let inv_det = 1.0 / det;
  let s = origin - tri[0];
  let u = s.dot(p) * inv_det;
  if !(0.0..=1.0).contains(&u) {
    return None;
  }
  let q = s.cross(e1);
  let v = dir.dot(q) * inv_det;
  if v < 0.0 || u + v > 1.0 {
    return None;
  }
  let t = e2.dot(q) * inv_det;
  (0.0..=1.0).contains(&t).then_some(t)
}

#[cfg(test)]
#[path = "collider_test.rs"]
mod collider_test;
