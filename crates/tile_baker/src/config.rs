//! Configuration loading for the tile baker.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use terrain_tiles::{HierarchyConfig, ManagerConfig, MeshSettings, TerrainConfig, TextureSettings};

/// Baker configuration file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	/// World seed. A random seed is picked when absent.
	pub seed: Option<u64>,
	pub hierarchy: HierarchyConfig,
	pub mesh: MeshSettings,
	pub texture: TextureSettings,
	pub manager: ManagerConfig,
}

impl Config {
	/// Load configuration from a TOML file, or defaults without one.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let Some(path) = path else {
			return Ok(Self::default());
		};
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
	}

	pub fn parse(content: &str) -> Result<Self> {
		let config: Config = toml::from_str(content).context("Failed to parse config TOML")?;
		Ok(config)
	}

	/// Resolve into a validated terrain config. `seed` overrides the file.
	pub fn into_terrain(self, seed: Option<u64>) -> Result<TerrainConfig> {
		let seed = match seed.or(self.seed) {
			Some(seed) => seed,
			None => {
				let seed = rand::random::<u64>();
				log::info!("No seed configured, using random seed {seed}");
				seed
			}
		};

		let config = TerrainConfig::default()
			.with_seed(seed)
			.with_hierarchy(self.hierarchy)
			.with_mesh(self.mesh)
			.with_texture(self.texture)
			.with_manager(self.manager);
		config.validate().context("Invalid terrain settings")?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_file_is_default() {
		let config = Config::parse("").expect("empty config parses");
		assert!(config.seed.is_none());
		assert_eq!(config.mesh, MeshSettings::default());
	}

	#[test]
	fn test_partial_sections() {
		let config = Config::parse(
			r#"
			seed = 42

			[hierarchy]
			root_range = 1

			[mesh]
			cells_per_tile = 8
			"#,
		)
		.expect("valid toml");

		let terrain = config.into_terrain(None).expect("valid settings");
		assert_eq!(terrain.seed, 42);
		assert_eq!(terrain.hierarchy.root_range, 1);
		assert_eq!(terrain.hierarchy.root_tile_size, HierarchyConfig::default().root_tile_size);
		assert_eq!(terrain.mesh.cells_per_tile, 8);
	}

	#[test]
	fn test_seed_override() {
		let config = Config::parse("seed = 1").expect("valid toml");
		assert_eq!(config.into_terrain(Some(9)).expect("valid").seed, 9);
	}

	#[test]
	fn test_invalid_settings_rejected() {
		let config = Config::parse("[hierarchy]\nroot_tile_size = 24").expect("valid toml");
		let err = config.into_terrain(Some(1)).expect_err("24 is not a power of two");
		assert!(format!("{err:#}").contains("root_tile_size"));
	}
}
