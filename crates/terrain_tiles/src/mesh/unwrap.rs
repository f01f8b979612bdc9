//! UV unwrapping: one chart per triangle, shelf-packed into a square atlas.
//!
//! Each triangle is laid flat at its true world-space size (tile-local length
//! times tile radius) with its longest edge on the chart baseline:
//!
//! ```text
//!   pad ┌──────────────────────┐
//!       │          k           │   height = distance of k from edge i-j
//!       │        /   \         │   width  = |i-j| (the longest edge)
//!       │      /       \       │
//!       │    i ───────── j     │
//!       └──────────────────────┘ pad
//! ```
//!
//! Charts are sorted by height and placed left to right on shelves. The atlas
//! edge starts at the smallest power of two that could hold the total area and
//! doubles until everything fits. When even the maximum resolution is too small,
//! the texel density is reduced and packing starts over.

use glam::{UVec2, Vec2, Vec3};

use super::{TileMesh, TileVertex};
use crate::config::MeshSettings;

const MIN_RESOLUTION: u32 = 16;
/// Density factor applied after a failed pass at maximum resolution.
const DENSITY_BACKOFF: f32 = 0.8;
const MAX_DENSITY_PASSES: usize = 64;

/// Texture layout of an unwrapped tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Atlas {
  /// Edge length of the square texture in texels.
  pub resolution: u32,
  /// Density actually used, after any backoff.
  pub texels_per_unit: f32,
}

/// A triangle laid flat, in world units, corners in triangle vertex order.
#[derive(Clone, Copy, Debug)]
struct Chart {
  corners: [Vec2; 3],
  size: Vec2,
}

impl Chart {
  fn from_triangle(points: [Vec3; 3]) -> Self {
    let edge_len = |e: usize| points[e].distance(points[(e + 1) % 3]);
    let longest = (0..3)
      .max_by(|&a, &b| edge_len(a).total_cmp(&edge_len(b)))
      .unwrap_or(0);
    let (i, j, k) = (longest, (longest + 1) % 3, (longest + 2) % 3);

    let base = points[j] - points[i];
    let length = base.length();
    let mut corners = [Vec2::ZERO; 3];
    if length <= f32::EPSILON {
      return Self {
        corners,
        size: Vec2::ZERO,
      };
    }

    let dir = base / length;
    let rel = points[k] - points[i];
    let x = rel.dot(dir).clamp(0.0, length);
    let y = rel.cross(dir).length();
    corners[j] = Vec2::new(length, 0.0);
    corners[k] = Vec2::new(x, y);
    Self {
      corners,
      size: Vec2::new(length, y),
    }
  }

  /// Footprint in texels including padding on both sides.
  fn footprint(&self, density: f32, padding: u32) -> UVec2 {
    let inner = (self.size * density).ceil().max(Vec2::ONE).as_uvec2();
    inner + UVec2::splat(2 * padding)
  }
}

/// Place footprints on shelves; `None` if they do not fit in `resolution`.
fn shelf_pack(footprints: &[UVec2], order: &[usize], resolution: u32) -> Option<Vec<UVec2>> {
  let mut offsets = vec![UVec2::ZERO; footprints.len()];
  let mut cursor = UVec2::ZERO;
  let mut shelf_height = 0;

  for &index in order {
    let size = footprints[index];
    if size.x > resolution {
      return None;
    }
    if cursor.x + size.x > resolution {
      cursor = UVec2::new(0, cursor.y + shelf_height);
      shelf_height = 0;
    }
    if cursor.y + size.y > resolution {
      return None;
    }
    offsets[index] = cursor;
    cursor.x += size.x;
    shelf_height = shelf_height.max(size.y);
  }

  Some(offsets)
}

/// Try every power of two from the area estimate up to `max_resolution`.
fn pack_at_density(
  charts: &[Chart],
  density: f32,
  settings: &MeshSettings,
) -> Option<(u32, Vec<UVec2>, Vec<UVec2>)> {
  let footprints: Vec<UVec2> = charts
    .iter()
    .map(|c| c.footprint(density, settings.chart_padding))
    .collect();
  let mut order: Vec<usize> = (0..charts.len()).collect();
  order.sort_by(|&a, &b| footprints[b].y.cmp(&footprints[a].y).then(a.cmp(&b)));

  let area: u64 = footprints.iter().map(|f| f.x as u64 * f.y as u64).sum();
  let estimate = ((area as f64).sqrt().ceil() as u32).max(MIN_RESOLUTION);
  let mut resolution = estimate.checked_next_power_of_two()?;

  while resolution <= settings.max_texture_resolution {
    if let Some(offsets) = shelf_pack(&footprints, &order, resolution) {
      return Some((resolution, offsets, footprints));
    }
    resolution *= 2;
  }
  None
}

/// Unwrap a clipped mesh. Vertices are duplicated per triangle.
#[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "mesh::unwrap"))]
pub fn unwrap_charts(mesh: &TileMesh, radius: f32, settings: &MeshSettings) -> (TileMesh, Atlas) {
  let charts: Vec<Chart> = (0..mesh.triangle_count())
    .map(|t| Chart::from_triangle(mesh.triangle(t).map(|p| p * radius)))
    .collect();

  let mut density = settings.texels_per_unit;
  let mut packed = None;
  for _ in 0..MAX_DENSITY_PASSES {
    packed = pack_at_density(&charts, density, settings);
    if packed.is_some() {
      break;
    }
    density *= DENSITY_BACKOFF;
  }
  debug_assert!(packed.is_some(), "charts never fit into {} texels", settings.max_texture_resolution);

  let (resolution, offsets) = match packed {
    Some((resolution, offsets, _)) => (resolution, offsets),
    // Unreachable for tile-sized meshes; collapse every chart onto one texel.
    None => (settings.max_texture_resolution, vec![UVec2::ZERO; charts.len()]),
  };
  debug_assert!(resolution <= settings.max_texture_resolution);

  let scale = 1.0 / resolution as f32;
  let pad = Vec2::splat(settings.chart_padding as f32);
  let mut out = TileMesh::new();
  out.vertices.reserve(mesh.indices.len());
  for (t, chart) in charts.iter().enumerate() {
    let origin = offsets[t].as_vec2() + pad;
    for k in 0..3 {
      let source = mesh.vertices[mesh.indices[t * 3 + k] as usize];
      let texel = origin + chart.corners[k] * density;
      out.vertices.push(TileVertex {
        uv: (texel * scale).clamp(Vec2::ZERO, Vec2::ONE).to_array(),
        ..source
      });
    }
  }
  out.indices = (0..out.vertices.len() as u32).collect();
  out.bounds = mesh.bounds;

  (
    out,
    Atlas {
      resolution,
      texels_per_unit: density,
    },
  )
}

#[cfg(test)]
#[path = "unwrap_test.rs"]
mod unwrap_test;
