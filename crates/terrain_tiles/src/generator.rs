//! Tile generation: `mesh → collider → texture`.
//!
//! [`generate_tile`] is what a lifecycle worker runs for one claimed slot.
//! [`GenerationStage`] batches the same work for offline baking, following
//! the Enqueue → Tick → Completions pattern.

use std::sync::Arc;

use rayon::prelude::*;
use web_time::Instant;

use crate::collider::TileCollider;
use crate::context::WorldGen;
use crate::density::DensityField;
use crate::mesh::{generate_mesh, Atlas, TileMesh};
use crate::texture::{synthesize, TileTextures};
use crate::tile::TilePosition;

/// A generated tile, ready for upload.
pub struct TilePayload {
  pub mesh: TileMesh,
  pub collider: Arc<TileCollider>,
  pub textures: TileTextures,
  pub atlas: Atlas,
  /// Wall time spent generating, in microseconds.
  pub generation_us: u64,
}

impl TilePayload {
  pub fn texture_resolution(&self) -> u32 {
    self.atlas.resolution
  }

  /// CPU memory held until upload.
  pub fn memory_bytes(&self) -> usize {
    self.mesh.memory_bytes() + self.textures.memory_bytes()
  }
}

/// Generate one tile. `None` when the tile holds no surface.
#[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "generator::generate_tile"))]
pub fn generate_tile<D: DensityField>(tile: &TilePosition, world: &WorldGen<D>) -> Option<TilePayload> {
  let start = Instant::now();

  let (mesh, atlas) = generate_mesh(tile, &world.density, &world.mesh)?;
  let collider = Arc::new(TileCollider::from_mesh(&mesh));
  let textures = synthesize(tile, &mesh, &atlas, &world.material_seeds, &world.texture);

  Some(TilePayload {
    mesh,
    collider,
    textures,
    atlas,
    generation_us: start.elapsed().as_micros() as u64,
  })
}

/// Completed batch entry.
pub struct GenerationCompletion {
  /// Request ID this completion corresponds to
  pub id: u64,
  pub tile: TilePosition,
  /// `None` for tiles without surface.
  pub payload: Option<TilePayload>,
  pub generation_us: u64,
}

/// Batch generation stage over the rayon pool.
pub struct GenerationStage<D: DensityField = crate::density::NoiseDensity> {
  world: Arc<WorldGen<D>>,
  pending: Vec<(u64, TilePosition)>,
  completed: Vec<GenerationCompletion>,
  next_id: u64,
}

impl<D: DensityField> GenerationStage<D> {
  pub fn new(world: Arc<WorldGen<D>>) -> Self {
    Self {
      world,
      pending: Vec::new(),
      completed: Vec::new(),
      next_id: 0,
    }
  }

  /// Enqueue a tile, returning the assigned ID.
  pub fn enqueue(&mut self, tile: TilePosition) -> u64 {
    let id = self.next_id;
    self.next_id += 1;
    self.pending.push((id, tile));
    id
  }

  /// Generate all pending tiles in parallel. Returns the number processed.
  pub fn tick(&mut self) -> usize {
    if self.pending.is_empty() {
      return 0;
    }

    let requests = std::mem::take(&mut self.pending);
    let count = requests.len();
    let world = &*self.world;

    let completions: Vec<GenerationCompletion> = requests
      .into_par_iter()
      .map(|(id, tile)| {
        let start = Instant::now();
        let payload = generate_tile(&tile, world);
        GenerationCompletion {
          id,
          tile,
          payload,
          generation_us: start.elapsed().as_micros() as u64,
        }
      })
      .collect();

    self.completed.extend(completions);
    count
  }

  /// Take all completions, in enqueue order.
  pub fn drain_completions(&mut self) -> Vec<GenerationCompletion> {
    std::mem::take(&mut self.completed)
  }

  pub fn pending_count(&self) -> usize {
    self.pending.len()
  }

  pub fn completed_count(&self) -> usize {
    self.completed.len()
  }

  /// True when no work remains.
  pub fn is_idle(&self) -> bool {
    self.pending.is_empty() && self.completed.is_empty()
  }
}

#[cfg(test)]
#[path = "generator_test.rs"]
mod generator_test;
