//! terrain_tiles - Engine independent hierarchical procedural terrain
//!
//! The world is a pure function of position and seed. It is cut into cubic
//! tiles of power-of-two radius; tiles near the player are finer, distant ones
//! coarser. Each tile is generated independently into a textured, collidable
//! mesh.
//!
//! # Features
//!
//! - **Tile hierarchy**: hole-free refinement around the player, parents stay
//!   on screen until all their children are ready
//! - **Surface Nets**: isosurface extraction from a seeded noise density,
//!   clipped to the tile cube so neighbours meet without seams
//! - **Texture synthesis**: per-triangle atlas charts shaded by a procedural
//!   material function, with inpainted gutters
//! - **Concurrent lifecycle**: a fixed slot arena driven by background workers,
//!   a dispatch step for GPU uploads and a control step for the scene
//!
//! # Example
//!
//! ```ignore
//! use terrain_tiles::{generate_tile, TerrainConfig, TilePosition, WorldGen};
//!
//! let world = WorldGen::from_config(&TerrainConfig::default().with_seed(7));
//! let tile = TilePosition::new(IVec3::ZERO, 4);
//! if let Some(payload) = generate_tile(&tile, &world) {
//!     println!("{} triangles, {}px atlas",
//!         payload.mesh.triangle_count(), payload.texture_resolution());
//! }
//! ```

pub mod config;
pub mod error;
pub use config::{HierarchyConfig, ManagerConfig, MeshSettings, TerrainConfig, TextureSettings};
pub use error::{ConfigError, TerrainError};

// Tile addressing
pub mod tile;
pub use tile::{DAabb3, TilePosition};

// Density fields and the shared generation context
pub mod context;
pub mod density;
pub use context::WorldGen;
pub use density::{DensityField, NoiseDensity};

// Per-tile generation
pub mod collider;
pub mod generator;
pub mod mesh;
pub mod texture;
pub use collider::TileCollider;
pub use generator::{generate_tile, GenerationCompletion, GenerationStage, TilePayload};
pub use mesh::{TileMesh, TileVertex};
pub use texture::TileTextures;

// Which tiles exist
pub mod hierarchy;
pub use hierarchy::find_needed_tiles;

// Slots, workers and the engine seams
pub mod collision;
pub mod lifecycle;
pub use collision::CollisionIndex;
pub use lifecycle::backend::{AssetId, CollisionWorld, EntityHandle, GpuBackend, SceneBackend, TextureUsage};
pub use lifecycle::{TileManager, UpdateStats};

pub mod metrics;
