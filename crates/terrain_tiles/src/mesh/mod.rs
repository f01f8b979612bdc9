//! Tile mesh generation.
//!
//! ```text
//! density field ──> DensityGrid ──> surface nets ──> clip to [-1,1]^3 ──> unwrap
//!                   (apron incl.)    (quads split,     (fan 1-in/2-out,   (one chart per
//!                                     face normals)     2-in/1-out)        triangle, packed)
//! ```
//!
//! All geometry is in tile-local space, where the tile occupies `[-1, 1]^3`.
//! An empty result at any stage means the tile holds no surface.

pub mod clip;
pub mod sampling;
pub mod surface_nets;
pub mod unwrap;

use glam::Vec3;

use crate::config::MeshSettings;
use crate::density::DensityField;
use crate::tile::TilePosition;

pub use clip::clip_to_unit_cube;
pub use sampling::{sample_tile, DensityGrid};
pub use unwrap::{unwrap_charts, Atlas};

/// Output vertex with all mesh attributes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileVertex {
  /// Tile-local position in `[-1, 1]^3`.
  pub position: [f32; 3],
  /// Surface normal (unit vector).
  pub normal: [f32; 3],
  /// Atlas coordinate in `[0, 1]^2`.
  pub uv: [f32; 2],
}

impl Default for TileVertex {
  fn default() -> Self {
    Self {
      position: [0.0; 3],
      normal: [0.0, 1.0, 0.0],
      uv: [0.0; 2],
    }
  }
}

impl TileVertex {
  pub fn new(position: Vec3, normal: Vec3) -> Self {
    Self {
      position: position.to_array(),
      normal: normal.to_array(),
      uv: [0.0; 2],
    }
  }

  #[inline]
  pub fn pos(&self) -> Vec3 {
    Vec3::from_array(self.position)
  }

  #[inline]
  pub fn norm(&self) -> Vec3 {
    Vec3::from_array(self.normal)
  }
}

/// Axis-aligned bounding box in tile-local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: Vec3,
  pub max: Vec3,
}

impl MinMaxAABB {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: Vec3::INFINITY,
      max: Vec3::NEG_INFINITY,
    }
  }

  pub fn new(min: Vec3, max: Vec3) -> Self {
    Self { min, max }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: Vec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min.cmple(self.max).all()
  }

  #[inline]
  pub fn center(&self) -> Vec3 {
    (self.min + self.max) * 0.5
  }

  /// Index of the longest axis.
  pub fn longest_axis(&self) -> usize {
    let size = self.max - self.min;
    if size.x >= size.y && size.x >= size.z {
      0
    } else if size.y >= size.z {
      1
    } else {
      2
    }
  }

  /// Slab test for `origin + t * dir` with `t` in `[0, t_max]`; returns the entry `t`.
  #[inline]
  pub fn ray_entry(&self, origin: Vec3, inv_dir: Vec3, t_max: f32) -> Option<f32> {
    let t0 = (self.min - origin) * inv_dir;
    let t1 = (self.max - origin) * inv_dir;
    let near = t0.min(t1).max_element().max(0.0);
    let far = t0.max(t1).min_element().min(t_max);
    (near <= far).then_some(near)
  }
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::empty()
  }
}

/// Indexed triangle mesh in tile-local space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileMesh {
  pub vertices: Vec<TileVertex>,
  /// Triangle indices (3 indices per triangle, counter-clockwise front faces).
  pub indices: Vec<u32>,
  /// Bounding box encompassing all vertices.
  pub bounds: MinMaxAABB,
}

impl TileMesh {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns true if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  /// Number of triangles in the mesh.
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Vertex positions of triangle `t`.
  #[inline]
  pub fn triangle(&self, t: usize) -> [Vec3; 3] {
    let i = &self.indices[t * 3..t * 3 + 3];
    [
      self.vertices[i[0] as usize].pos(),
      self.vertices[i[1] as usize].pos(),
      self.vertices[i[2] as usize].pos(),
    ]
  }

  /// Recompute bounds from vertex positions.
  pub fn recalculate_bounds(&mut self) {
    self.bounds = MinMaxAABB::empty();
    for v in &self.vertices {
      self.bounds.encapsulate(v.pos());
    }
  }

  /// Approximate CPU/GPU footprint: vertices + indices.
  pub fn memory_bytes(&self) -> usize {
    self.vertices.len() * std::mem::size_of::<TileVertex>() + self.indices.len() * 4
  }
}

/// Full mesh pipeline for one tile.
///
/// Returns `None` when the tile holds no surface, either because the field has
/// no sign change near the tile or because all geometry fell outside the tile.
#[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "mesh::generate"))]
pub fn generate_mesh<D: DensityField + ?Sized>(
  tile: &TilePosition,
  field: &D,
  settings: &MeshSettings,
) -> Option<(TileMesh, Atlas)> {
  let grid = sample_tile(tile, field, settings);
  if !grid.has_sign_change() {
    return None;
  }

  let raw = surface_nets::extract(&grid);
  if raw.is_empty() {
    return None;
  }

  let clipped = clip_to_unit_cube(&raw);
  if clipped.is_empty() {
    return None;
  }

  Some(unwrap_charts(&clipped, tile.radius as f32, settings))
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
