//! Seams to the engine: scene graph, GPU assets and collision.
//!
//! The lifecycle manager only talks to these traits. Scene and collision calls
//! happen on the control step, GPU calls on the dispatch step.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::{DAffine3, DVec3};
use image::DynamicImage;

use crate::collider::TileCollider;
use crate::mesh::TileMesh;

/// Process-unique asset identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

impl AssetId {
  /// Allocate a fresh id.
  pub fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  pub fn raw(self) -> u64 {
    self.0
  }
}

impl fmt::Display for AssetId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "terrain_{}", self.0)
  }
}

/// Ids of everything one tile owns on the GPU, plus its collider name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileAssets {
  pub mesh: AssetId,
  pub albedo: AssetId,
  pub special: AssetId,
  pub render_object: AssetId,
  pub collider: AssetId,
}

impl TileAssets {
  pub fn allocate() -> Self {
    Self {
      mesh: AssetId::next(),
      albedo: AssetId::next(),
      special: AssetId::next(),
      render_object: AssetId::next(),
      collider: AssetId::next(),
    }
  }

  /// GPU-side ids, in release order.
  pub fn gpu_ids(&self) -> [AssetId; 4] {
    [self.render_object, self.mesh, self.albedo, self.special]
  }
}

/// Opaque scene entity handle issued by the [`SceneBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub u64);

/// Color space a texture is sampled in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureUsage {
  /// sRGB color.
  Albedo,
  /// Linear roughness/metallic.
  Special,
}

/// Scene graph. Called from the control step only.
pub trait SceneBackend {
  fn spawn_entity(&mut self, transform: DAffine3) -> EntityHandle;
  fn attach_renderable(&mut self, entity: EntityHandle, render_object: AssetId);
  fn detach_renderable(&mut self, entity: EntityHandle);
  fn destroy_entity(&mut self, entity: EntityHandle);
}

/// GPU asset system. Called from the dispatch step only.
pub trait GpuBackend {
  fn create_texture(&mut self, id: AssetId, image: &DynamicImage, usage: TextureUsage);
  fn create_mesh(&mut self, id: AssetId, mesh: &TileMesh);
  fn create_render_object(&mut self, id: AssetId, mesh: AssetId, textures: [AssetId; 2]);
  fn release(&mut self, id: AssetId);
}

/// Collision broad-phase. Updates take effect after `rebuild_if_needed`.
pub trait CollisionWorld {
  fn update(&mut self, id: AssetId, collider: Arc<TileCollider>, transform: DAffine3);
  fn remove(&mut self, id: AssetId);
  fn rebuild_if_needed(&mut self);
  /// First terrain point on the segment, if any.
  fn cast_segment(&self, origin: DVec3, target: DVec3) -> Option<DVec3>;
}
