//! Concurrent tile lifecycle.
//!
//! # Flow
//!
//! ```text
//! Control step (update)          Workers                  Dispatch step
//! ┌──────────────────────┐
//! │ find_needed_tiles    │
//! │ remove / toggle tiles│
//! │ assign Init slots    │──wake──> claim Generate
//! └──────────────────────┘          generate_tile
//!                                   ──> Upload ─────────> create GPU assets
//! ┌──────────────────────┐                                ──> Entity
//! │ spawn entity ──> Ready│<───────────────────────────────────┘
//! └──────────────────────┘
//! ```
//!
//! The control step and the dispatch step take `&self` and may run on
//! different threads. Neither ever waits on generation.
//!
//! # Usage
//!
//! ```ignore
//! let mut manager = TileManager::from_config(config)?;
//! loop {
//!     manager.update(player, &mut scene, &mut collision);
//!     manager.dispatch(&mut gpu);
//! }
//! manager.shutdown();
//! while !manager.is_drained() {
//!     manager.update(player, &mut scene, &mut collision);
//!     manager.dispatch(&mut gpu);
//! }
//! ```

pub mod backend;
pub mod slot;
mod workers;

use std::collections::BTreeSet;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use glam::DVec3;
use web_time::Instant;

use self::backend::{AssetId, CollisionWorld, GpuBackend, SceneBackend, TextureUsage, TileAssets};
use self::slot::{SlotData, TilePool, TileState};
use crate::config::{HierarchyConfig, ManagerConfig, TerrainConfig};
use crate::context::WorldGen;
use crate::density::{DensityField, NoiseDensity};
use crate::error::TerrainError;
use crate::hierarchy::find_needed_tiles;
use crate::metrics::TerrainMetrics;
use crate::tile::TilePosition;

/// What one control step did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStats {
  /// Tiles the hierarchy asked for.
  pub requested: usize,
  /// Tiles handed to free slots this tick.
  pub assigned: usize,
  /// Tiles released back to `Init`.
  pub removed: usize,
  /// Tiles that found no free slot.
  pub dropped: usize,
  pub entities_created: usize,
  pub visibility_changes: usize,
}

impl UpdateStats {
  /// Nothing changed this tick.
  pub fn is_idle(&self) -> bool {
    self.assigned == 0
      && self.removed == 0
      && self.entities_created == 0
      && self.visibility_changes == 0
  }
}

/// State shared with the worker threads.
pub(crate) struct Shared<D> {
  world: WorldGen<D>,
  pool: TilePool,
  stopping: AtomicBool,
  metrics: Mutex<TerrainMetrics>,
}

/// Owns the slot arena and the generation workers.
pub struct TileManager<D: DensityField + 'static = NoiseDensity> {
  shared: Arc<Shared<D>>,
  hierarchy: HierarchyConfig,
  manager: ManagerConfig,
  wake: Mutex<Option<Sender<()>>>,
  pending_releases: Mutex<Vec<AssetId>>,
  workers: Vec<JoinHandle<()>>,
}

impl TileManager<NoiseDensity> {
  /// Manager over the default noise terrain.
  pub fn from_config(config: TerrainConfig) -> Result<Self, TerrainError> {
    config.validate()?;
    let world = WorldGen::from_config(&config);
    Self::with_world(&config, world)
  }
}

impl<D: DensityField + 'static> TileManager<D> {
  /// Manager over a caller-provided density field.
  pub fn new(config: TerrainConfig, density: D) -> Result<Self, TerrainError> {
    config.validate()?;
    let world = WorldGen::with_density(&config, density);
    Self::with_world(&config, world)
  }

  fn with_world(config: &TerrainConfig, world: WorldGen<D>) -> Result<Self, TerrainError> {
    let shared = Arc::new(Shared {
      world,
      pool: TilePool::new(config.manager.slot_count),
      stopping: AtomicBool::new(false),
      metrics: Mutex::new(TerrainMetrics::new()),
    });

    let (sender, receiver) = crossbeam_channel::unbounded();
    let count = config.manager.worker_count();
    let workers = workers::spawn_workers(&shared, &receiver, count)?;
    tracing::info!(workers = count, slots = config.manager.slot_count, "terrain manager started");

    Ok(Self {
      shared,
      hierarchy: config.hierarchy.clone(),
      manager: config.manager.clone(),
      wake: Mutex::new(Some(sender)),
      pending_releases: Mutex::new(Vec::new()),
      workers,
    })
  }

  pub fn world(&self) -> &WorldGen<D> {
    &self.shared.world
  }

  pub fn pool(&self) -> &TilePool {
    &self.shared.pool
  }

  pub fn is_stopping(&self) -> bool {
    self.shared.stopping.load(Ordering::Acquire)
  }

  /// Snapshot of the collected metrics.
  pub fn metrics(&self) -> TerrainMetrics {
    self.shared.metrics.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Slots currently in `state`.
  pub fn count(&self, state: TileState) -> usize {
    self.shared.pool.count(state)
  }

  /// Slots between assignment and presentation.
  pub fn in_flight(&self) -> usize {
    self.shared.pool.iter().filter(|(_, s)| s.state.load().is_in_flight()).count()
  }

  /// Tiles that are generated and presentable.
  pub fn ready_tiles(&self) -> BTreeSet<TilePosition> {
    self.shared.pool.tiles_in(TileState::Ready).into_iter().collect()
  }

  /// Control step: reconcile slots with the tiles the player needs.
  #[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "manager::update"))]
  pub fn update(
    &self,
    player: DVec3,
    scene: &mut impl SceneBackend,
    collision: &mut impl CollisionWorld,
  ) -> UpdateStats {
    let pool = &self.shared.pool;
    pool.set_player(player);
    let stopping = self.is_stopping();

    let mut needed = if stopping {
      BTreeSet::new()
    } else {
      find_needed_tiles(player, &self.ready_tiles(), &self.hierarchy)
    };
    let mut stats = UpdateStats {
      requested: needed.len(),
      ..Default::default()
    };

    for (_, slot) in pool.iter() {
      let state = slot.state.load();
      if state == TileState::Init {
        continue;
      }
      let mut data = slot.lock();
      let requested = needed.take(&data.tile);

      match state {
        TileState::Ready => match requested {
          Some(request) => {
            if self.apply_visibility(&mut data, request.visible, scene, collision) {
              stats.visibility_changes += 1;
            }
          }
          None => {
            self.release(&mut data, scene, collision);
            drop(data);
            slot.state.transition(TileState::Ready, TileState::Init);
            stats.removed += 1;
          }
        },
        TileState::Entity => {
          data.entity = Some(scene.spawn_entity(data.tile.transform()));
          data.tile.visible = false;
          stats.entities_created += 1;
          if let Some(request) = requested {
            if self.apply_visibility(&mut data, request.visible, scene, collision) {
              stats.visibility_changes += 1;
            }
          }
          drop(data);
          slot.state.transition(TileState::Entity, TileState::Ready);
        }
        // In flight. Tiles no longer needed finish and are removed once ready.
        TileState::Generate | TileState::Generating | TileState::Upload | TileState::Init => {}
      }
    }

    collision.rebuild_if_needed();

    if !stopping && !needed.is_empty() {
      self.assign(needed, &mut stats);
    }
    stats
  }

  fn assign(&self, needed: BTreeSet<TilePosition>, stats: &mut UpdateStats) {
    let pool = &self.shared.pool;
    let wake = self.wake.lock().unwrap_or_else(PoisonError::into_inner);
    let mut free = pool
      .iter()
      .filter(|(_, s)| s.state.load() == TileState::Init)
      .map(|(id, _)| id);

    let mut remaining = needed.into_iter();
    for tile in remaining.by_ref() {
      let Some(id) = free.next() else {
        stats.dropped += 1;
        break;
      };
      if pool.assign(id, tile) {
        stats.assigned += 1;
        if let Some(sender) = wake.as_ref() {
          // Workers only disconnect after shutdown.
          let _ = sender.send(());
        }
      }
    }
    stats.dropped += remaining.count();

    if stats.dropped > 0 {
      tracing::warn!(dropped = stats.dropped, slots = pool.len(), "not enough terrain tile slots");
    }
  }

  /// Show or hide a presented tile. Returns true if anything changed.
  fn apply_visibility(
    &self,
    data: &mut SlotData,
    visible: bool,
    scene: &mut impl SceneBackend,
    collision: &mut impl CollisionWorld,
  ) -> bool {
    if data.tile.visible == visible {
      return false;
    }
    let (Some(entity), Some(assets)) = (data.entity, data.assets) else {
      // Empty tiles have nothing to show.
      data.tile.visible = false;
      return false;
    };

    if visible {
      scene.attach_renderable(entity, assets.render_object);
      if let Some(collider) = &data.collider {
        collision.update(assets.collider, Arc::clone(collider), data.tile.transform());
        data.collider_registered = true;
      }
    } else {
      scene.detach_renderable(entity);
      if data.collider_registered {
        collision.remove(assets.collider);
        data.collider_registered = false;
      }
    }
    data.tile.visible = visible;
    true
  }

  /// Tear down a ready tile and queue its GPU assets for release.
  fn release(&self, data: &mut SlotData, scene: &mut impl SceneBackend, collision: &mut impl CollisionWorld) {
    if let Some(entity) = data.entity.take() {
      scene.destroy_entity(entity);
    }
    if let Some(assets) = data.assets.take() {
      if data.collider_registered {
        collision.remove(assets.collider);
      }
      self
        .pending_releases
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .extend(assets.gpu_ids());
    }
    self
      .shared
      .metrics
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .record_removed(data.tile.radius, data.triangles, data.mesh_bytes);
    data.reset();
  }

  /// Dispatch step: release queued assets, then upload generated tiles.
  /// Returns the number of tiles uploaded.
  #[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "manager::dispatch"))]
  pub fn dispatch(&self, gpu: &mut impl GpuBackend) -> usize {
    let releases = mem::take(&mut *self.pending_releases.lock().unwrap_or_else(PoisonError::into_inner));
    for id in releases {
      gpu.release(id);
    }

    let mut uploaded = 0;
    for (_, slot) in self.shared.pool.iter() {
      if uploaded >= self.manager.max_uploads_per_dispatch {
        break;
      }
      if slot.state.load() != TileState::Upload {
        continue;
      }

      let start = Instant::now();
      {
        let mut data = slot.lock();
        let Some(payload) = data.payload.take() else {
          debug_assert!(false, "tile {} in Upload without payload", data.tile);
          continue;
        };

        let assets = TileAssets::allocate();
        gpu.create_texture(assets.albedo, &payload.textures.albedo, TextureUsage::Albedo);
        gpu.create_texture(assets.special, &payload.textures.special, TextureUsage::Special);
        gpu.create_mesh(assets.mesh, &payload.mesh);
        gpu.create_render_object(assets.render_object, assets.mesh, [assets.albedo, assets.special]);

        data.assets = Some(assets);
        // CPU mesh and images are dropped here; the collider lives on.
        data.collider = Some(payload.collider);
      }
      slot.state.transition(TileState::Upload, TileState::Entity);
      uploaded += 1;

      self
        .shared
        .metrics
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .record_upload(start.elapsed().as_micros() as u64);
    }
    uploaded
  }

  /// Stop generating. In-flight tiles finish; further `update` and
  /// `dispatch` calls drain every slot back to `Init`.
  pub fn shutdown(&mut self) {
    if self.shared.stopping.swap(true, Ordering::AcqRel) {
      return;
    }
    // Disconnecting the channel ends the worker loops.
    self.wake.lock().unwrap_or_else(PoisonError::into_inner).take();
    for handle in self.workers.drain(..) {
      if handle.join().is_err() {
        tracing::error!("terrain worker panicked");
      }
    }
    let reverted = self.shared.pool.revert_unclaimed();
    tracing::info!(reverted, "terrain manager stopped");
  }

  /// Shutdown has completed: every slot is free and every asset released.
  pub fn is_drained(&self) -> bool {
    self.is_stopping()
      && self.count(TileState::Init) == self.shared.pool.len()
      && self.pending_releases.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
  }
}

impl<D: DensityField + 'static> Drop for TileManager<D> {
  fn drop(&mut self) {
    self.shutdown();
  }
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod lifecycle_test;
