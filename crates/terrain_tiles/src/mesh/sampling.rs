//! Density sampling on the tile grid.
//!
//! The grid covers the tile plus an apron of `apron` samples on every side:
//!
//! ```text
//!   sample:  0   1   2   3  ...  N+2  N+3  N+4        (apron = 2, N cells)
//!   local:  -1-4/N  ... -1  ...   1  ...  1+4/N
//!                   ^ tile face          ^ tile face
//! ```
//!
//! World coordinates are formed from exact integer grid coordinates
//! (`center * N + radius * (2 * (i - apron) - N)`, divided by `N` once), so two
//! neighboring tiles of equal radius evaluate the field at bit-identical points
//! along their shared face.

use glam::{DVec3, IVec3, Vec3};

use crate::config::MeshSettings;
use crate::density::DensityField;
use crate::tile::TilePosition;

/// Sampled density values for one tile, `x` fastest.
#[derive(Clone, Debug)]
pub struct DensityGrid {
  /// Samples per axis, including apron.
  pub size: usize,
  /// Cells across the tile proper.
  pub cells_per_tile: u32,
  /// Samples outside the tile on every side.
  pub apron: u32,
  pub values: Vec<f32>,
}

impl DensityGrid {
  #[inline]
  pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
    (z * self.size + y) * self.size + x
  }

  #[inline]
  pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
    self.values[self.index(x, y, z)]
  }

  /// Tile-local coordinate of a (possibly fractional) grid coordinate.
  #[inline]
  pub fn grid_to_local(&self, grid: Vec3) -> Vec3 {
    (grid - Vec3::splat(self.apron as f32)) / self.cells_per_tile as f32 * 2.0 - Vec3::ONE
  }

  /// Whether the grid contains both solid and air samples.
  pub fn has_sign_change(&self) -> bool {
    let mut solid = false;
    let mut air = false;
    for &v in &self.values {
      if v < 0.0 {
        solid = true;
      } else {
        air = true;
      }
      if solid && air {
        return true;
      }
    }
    false
  }
}

/// World position of grid sample `index` for a tile.
#[inline]
pub fn sample_world_position(tile: &TilePosition, settings: &MeshSettings, index: IVec3) -> DVec3 {
  let n = settings.cells_per_tile as i64;
  let apron = settings.apron as i64;
  let radius = tile.radius as i64;
  let axis = |c: i32, i: i32| {
    let numerator = c as i64 * n + radius * (2 * (i as i64 - apron) - n);
    numerator as f64 / n as f64
  };
  DVec3::new(
    axis(tile.center.x, index.x),
    axis(tile.center.y, index.y),
    axis(tile.center.z, index.z),
  )
}

/// Evaluate the field on the tile grid.
#[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "mesh::sample_tile"))]
pub fn sample_tile<D: DensityField + ?Sized>(
  tile: &TilePosition,
  field: &D,
  settings: &MeshSettings,
) -> DensityGrid {
  let size = settings.samples_per_axis();
  let mut values = Vec::with_capacity(size * size * size);
  for z in 0..size as i32 {
    for y in 0..size as i32 {
      for x in 0..size as i32 {
        let p = sample_world_position(tile, settings, IVec3::new(x, y, z));
        values.push(field.density(p) as f32);
      }
    }
  }

  DensityGrid {
    size,
    cells_per_tile: settings.cells_per_tile,
    apron: settings.apron,
    values,
  }
}
