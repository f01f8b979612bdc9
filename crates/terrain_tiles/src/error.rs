//! Error types.

use thiserror::Error;

/// Rejected configuration values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
  #[error("{field} must be a power of two, got {value}")]
  NotPowerOfTwo { field: &'static str, value: i64 },

  #[error("{field} must be at least {min}, got {value}")]
  TooSmall {
    field: &'static str,
    min: i64,
    value: i64,
  },

  #[error("{field} must be positive and finite, got {value}")]
  NotPositive { field: &'static str, value: f64 },

  #[error("min_radius ({min_radius}) must not exceed the root tile radius ({root_radius})")]
  MinRadiusTooLarge { min_radius: i32, root_radius: i32 },
}

/// Errors raised while setting up the terrain subsystem.
#[derive(Debug, Error)]
pub enum TerrainError {
  #[error("invalid terrain configuration: {0}")]
  Config(#[from] ConfigError),

  #[error("failed to spawn terrain generator thread: {0}")]
  SpawnWorker(#[from] std::io::Error),
}
