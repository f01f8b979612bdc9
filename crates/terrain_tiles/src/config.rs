//! Terrain configuration.
//!
//! All sections deserialize from TOML/JSON with defaults for every missing
//! field, so an empty document is a valid configuration:
//!
//! ```toml
//! seed = 1234
//!
//! [hierarchy]
//! root_tile_size = 32
//! root_range = 2
//!
//! [mesh]
//! cells_per_tile = 12
//!
//! [manager]
//! slot_count = 4096
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration of the terrain subsystem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
  /// World seed. The world is a pure function of position and seed.
  pub seed: u64,
  pub hierarchy: HierarchyConfig,
  pub mesh: MeshSettings,
  pub texture: TextureSettings,
  pub manager: ManagerConfig,
}

impl Default for TerrainConfig {
  fn default() -> Self {
    Self {
      seed: 0,
      hierarchy: HierarchyConfig::default(),
      mesh: MeshSettings::default(),
      texture: TextureSettings::default(),
      manager: ManagerConfig::default(),
    }
  }
}

impl TerrainConfig {
  pub fn with_seed(mut self, seed: u64) -> Self {
    self.seed = seed;
    self
  }

  pub fn with_hierarchy(mut self, hierarchy: HierarchyConfig) -> Self {
    self.hierarchy = hierarchy;
    self
  }

  pub fn with_mesh(mut self, mesh: MeshSettings) -> Self {
    self.mesh = mesh;
    self
  }

  pub fn with_texture(mut self, texture: TextureSettings) -> Self {
    self.texture = texture;
    self
  }

  pub fn with_manager(mut self, manager: ManagerConfig) -> Self {
    self.manager = manager;
    self
  }

  /// Check every section.
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.hierarchy.validate()?;
    self.mesh.validate()?;
    self.manager.validate()
  }
}

/// Tile selection parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
  /// Edge length of root tiles in world units.
  pub root_tile_size: i32,
  /// Root tiles enumerated per axis on each side of the player's root cell.
  pub root_range: i32,
  /// Tiles at or below this radius are never split.
  pub min_radius: i32,
  /// A tile is coarse enough once the player is farther than `factor * radius`.
  pub coarseness_factor: f64,
}

impl Default for HierarchyConfig {
  fn default() -> Self {
    Self {
      root_tile_size: 32,
      root_range: 2,
      min_radius: 4,
      coarseness_factor: 4.0,
    }
  }
}

impl HierarchyConfig {
  pub fn with_root_tile_size(mut self, size: i32) -> Self {
    self.root_tile_size = size;
    self
  }

  pub fn with_root_range(mut self, range: i32) -> Self {
    self.root_range = range;
    self
  }

  pub fn with_min_radius(mut self, radius: i32) -> Self {
    self.min_radius = radius;
    self
  }

  pub fn with_coarseness_factor(mut self, factor: f64) -> Self {
    self.coarseness_factor = factor;
    self
  }

  /// Radius of root tiles.
  #[inline]
  pub fn root_radius(&self) -> i32 {
    self.root_tile_size / 2
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.root_tile_size < 2 {
      return Err(ConfigError::TooSmall {
        field: "hierarchy.root_tile_size",
        min: 2,
        value: self.root_tile_size as i64,
      });
    }
    if !(self.root_tile_size as u32).is_power_of_two() {
      return Err(ConfigError::NotPowerOfTwo {
        field: "hierarchy.root_tile_size",
        value: self.root_tile_size as i64,
      });
    }
    if self.min_radius < 1 {
      return Err(ConfigError::TooSmall {
        field: "hierarchy.min_radius",
        min: 1,
        value: self.min_radius as i64,
      });
    }
    if !(self.min_radius as u32).is_power_of_two() {
      return Err(ConfigError::NotPowerOfTwo {
        field: "hierarchy.min_radius",
        value: self.min_radius as i64,
      });
    }
    if self.min_radius > self.root_radius() {
      return Err(ConfigError::MinRadiusTooLarge {
        min_radius: self.min_radius,
        root_radius: self.root_radius(),
      });
    }
    if self.root_range < 0 {
      return Err(ConfigError::TooSmall {
        field: "hierarchy.root_range",
        min: 0,
        value: self.root_range as i64,
      });
    }
    if !(self.coarseness_factor.is_finite() && self.coarseness_factor > 0.0) {
      return Err(ConfigError::NotPositive {
        field: "hierarchy.coarseness_factor",
        value: self.coarseness_factor,
      });
    }
    Ok(())
  }
}

/// Geometry extraction and UV layout parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
  /// Grid cells across the tile (per axis), independent of tile radius.
  pub cells_per_tile: u32,
  /// Extra samples outside the tile on every side.
  pub apron: u32,
  /// Texel density in texels per world unit.
  pub texels_per_unit: f32,
  /// Empty texels around every chart.
  pub chart_padding: u32,
  /// Hard cap on the atlas edge length.
  pub max_texture_resolution: u32,
}

impl Default for MeshSettings {
  fn default() -> Self {
    Self {
      cells_per_tile: 12,
      apron: 2,
      texels_per_unit: 6.0,
      chart_padding: 2,
      max_texture_resolution: 2048,
    }
  }
}

impl MeshSettings {
  pub fn with_cells_per_tile(mut self, cells: u32) -> Self {
    self.cells_per_tile = cells;
    self
  }

  pub fn with_apron(mut self, apron: u32) -> Self {
    self.apron = apron;
    self
  }

  pub fn with_texels_per_unit(mut self, texels: f32) -> Self {
    self.texels_per_unit = texels;
    self
  }

  pub fn with_chart_padding(mut self, padding: u32) -> Self {
    self.chart_padding = padding;
    self
  }

  pub fn with_max_texture_resolution(mut self, resolution: u32) -> Self {
    self.max_texture_resolution = resolution;
    self
  }

  /// Samples per axis including the apron on both sides.
  #[inline]
  pub fn samples_per_axis(&self) -> usize {
    (self.cells_per_tile + 1 + 2 * self.apron) as usize
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.cells_per_tile < 2 {
      return Err(ConfigError::TooSmall {
        field: "mesh.cells_per_tile",
        min: 2,
        value: self.cells_per_tile as i64,
      });
    }
    if self.apron < 1 {
      return Err(ConfigError::TooSmall {
        field: "mesh.apron",
        min: 1,
        value: self.apron as i64,
      });
    }
    if !(self.texels_per_unit.is_finite() && self.texels_per_unit > 0.0) {
      return Err(ConfigError::NotPositive {
        field: "mesh.texels_per_unit",
        value: self.texels_per_unit as f64,
      });
    }
    if !self.max_texture_resolution.is_power_of_two() {
      return Err(ConfigError::NotPowerOfTwo {
        field: "mesh.max_texture_resolution",
        value: self.max_texture_resolution as i64,
      });
    }
    let smallest_chart = 4 + 2 * self.chart_padding;
    if self.max_texture_resolution < smallest_chart {
      return Err(ConfigError::TooSmall {
        field: "mesh.max_texture_resolution",
        min: smallest_chart as i64,
        value: self.max_texture_resolution as i64,
      });
    }
    Ok(())
  }
}

/// Texture synthesis parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
  /// Frontier expansions when filling blank texels around charts.
  pub inpaint_iterations: u32,
}

impl Default for TextureSettings {
  fn default() -> Self {
    Self {
      inpaint_iterations: 2,
    }
  }
}

impl TextureSettings {
  pub fn with_inpaint_iterations(mut self, iterations: u32) -> Self {
    self.inpaint_iterations = iterations;
    self
  }
}

/// Lifecycle manager parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
  /// Fixed number of tile slots.
  pub slot_count: usize,
  /// Generator threads. `None` = available parallelism minus one, at least one.
  pub worker_threads: Option<usize>,
  /// Tiles uploaded per dispatch call.
  pub max_uploads_per_dispatch: usize,
}

impl Default for ManagerConfig {
  fn default() -> Self {
    Self {
      slot_count: 4096,
      worker_threads: None,
      max_uploads_per_dispatch: 1,
    }
  }
}

impl ManagerConfig {
  pub fn with_slot_count(mut self, slots: usize) -> Self {
    self.slot_count = slots;
    self
  }

  pub fn with_worker_threads(mut self, threads: usize) -> Self {
    self.worker_threads = Some(threads);
    self
  }

  pub fn with_max_uploads_per_dispatch(mut self, uploads: usize) -> Self {
    self.max_uploads_per_dispatch = uploads;
    self
  }

  /// Resolved worker count.
  pub fn worker_count(&self) -> usize {
    match self.worker_threads {
      Some(threads) => threads.max(1),
      None => std::thread::available_parallelism()
        .map(|n| n.get().max(2) - 1)
        .unwrap_or(1),
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.slot_count == 0 {
      return Err(ConfigError::TooSmall {
        field: "manager.slot_count",
        min: 1,
        value: 0,
      });
    }
    if self.max_uploads_per_dispatch == 0 {
      return Err(ConfigError::TooSmall {
        field: "manager.max_uploads_per_dispatch",
        min: 1,
        value: 0,
      });
    }
    if self.worker_threads == Some(0) {
      return Err(ConfigError::TooSmall {
        field: "manager.worker_threads",
        min: 1,
        value: 0,
      });
    }
    Ok(())
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
