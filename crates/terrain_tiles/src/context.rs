//! World generation context.
//!
//! Everything a worker needs to turn a [`TilePosition`](crate::TilePosition)
//! into a payload: the density field, seed-derived material noise seeds and the
//! generation settings. Built once from a [`TerrainConfig`] and shared
//! read-only between workers via `Arc`.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{MeshSettings, TerrainConfig, TextureSettings};
use crate::density::{DensityField, NoiseDensity};

/// Independent seed streams, one per consumer, so adding a layer to one
/// consumer never reshuffles another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SeedStream {
  Density = 1,
  Material = 2,
}

/// Derive `N` noise seeds from the world seed for one stream.
pub fn derive_seeds<const N: usize>(world_seed: u64, stream: SeedStream) -> [u32; N] {
  let mut rng = ChaCha8Rng::seed_from_u64(world_seed);
  rng.set_stream(stream as u64);
  std::array::from_fn(|_| rng.random::<u32>())
}

/// Shared, immutable generation context.
#[derive(Clone, Debug)]
pub struct WorldGen<D = NoiseDensity> {
  pub seed: u64,
  pub density: D,
  pub mesh: MeshSettings,
  pub texture: TextureSettings,
  /// Seeds for the material noise layers.
  pub material_seeds: [u32; MATERIAL_SEED_COUNT],
}

/// Noise layers consumed by the texture synthesizer.
pub const MATERIAL_SEED_COUNT: usize = 13;

impl WorldGen<NoiseDensity> {
  /// Context with the default noise terrain for the configured seed.
  pub fn from_config(config: &TerrainConfig) -> Self {
    let [primary, secondary] = derive_seeds::<2>(config.seed, SeedStream::Density);
    Self::with_density(config, NoiseDensity::new(primary, secondary))
  }
}

impl<D: DensityField> WorldGen<D> {
  /// Context around a caller-provided density field.
  pub fn with_density(config: &TerrainConfig, density: D) -> Self {
    Self {
      seed: config.seed,
      density,
      mesh: config.mesh.clone(),
      texture: config.texture.clone(),
      material_seeds: derive_seeds(config.seed, SeedStream::Material),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_seed_derivation_is_stable() {
    let a = derive_seeds::<4>(42, SeedStream::Material);
    let b = derive_seeds::<4>(42, SeedStream::Material);
    assert_eq!(a, b);
  }

  #[test]
  fn test_streams_are_independent() {
    let density = derive_seeds::<4>(42, SeedStream::Density);
    let material = derive_seeds::<4>(42, SeedStream::Material);
    assert_ne!(density, material);
    assert_ne!(
      derive_seeds::<4>(42, SeedStream::Density),
      derive_seeds::<4>(43, SeedStream::Density)
    );
  }

  #[test]
  fn test_context_copies_settings() {
    let config = TerrainConfig::default().with_seed(5);
    let world = WorldGen::from_config(&config);
    assert_eq!(world.seed, 5);
    assert_eq!(world.mesh, config.mesh);
    assert_eq!(world.material_seeds, derive_seeds(5, SeedStream::Material));
  }
}
