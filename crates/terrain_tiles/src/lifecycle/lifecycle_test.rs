use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;

use glam::{DAffine3, IVec3};
use image::DynamicImage;

use super::backend::EntityHandle;
use super::*;
use crate::collision::CollisionIndex;
use crate::config::MeshSettings;
use crate::density::{ConstantDensity, PlaneDensity};
use crate::mesh::TileMesh;

#[derive(Default)]
struct FakeScene {
  next: u64,
  entities: HashMap<EntityHandle, DAffine3>,
  attached: HashMap<EntityHandle, AssetId>,
  spawned: Vec<DAffine3>,
}

impl SceneBackend for FakeScene {
  fn spawn_entity(&mut self, transform: DAffine3) -> EntityHandle {
    self.next += 1;
    let entity = EntityHandle(self.next);
    self.entities.insert(entity, transform);
    self.spawned.push(transform);
    entity
  }

  fn attach_renderable(&mut self, entity: EntityHandle, render_object: AssetId) {
    assert!(self.entities.contains_key(&entity), "attach to unknown entity");
    assert!(self.attached.insert(entity, render_object).is_none(), "attached twice");
  }

  fn detach_renderable(&mut self, entity: EntityHandle) {
    assert!(self.attached.remove(&entity).is_some(), "detach without attach");
  }

  fn destroy_entity(&mut self, entity: EntityHandle) {
    self.attached.remove(&entity);
    assert!(self.entities.remove(&entity).is_some(), "destroyed twice");
  }
}

#[derive(Default)]
struct FakeGpu {
  live: HashSet<AssetId>,
  render_objects: usize,
}

impl GpuBackend for FakeGpu {
  fn create_texture(&mut self, id: AssetId, image: &DynamicImage, usage: TextureUsage) {
    match usage {
      TextureUsage::Albedo => assert!(image.as_rgb8().is_some()),
      TextureUsage::Special => assert!(image.as_luma_alpha8().is_some()),
    }
    assert!(self.live.insert(id));
  }

  fn create_mesh(&mut self, id: AssetId, mesh: &TileMesh) {
    assert!(!mesh.is_empty());
    assert!(self.live.insert(id));
  }

  fn create_render_object(&mut self, id: AssetId, mesh: AssetId, textures: [AssetId; 2]) {
    assert!(self.live.contains(&mesh));
    assert!(textures.iter().all(|t| self.live.contains(t)));
    assert!(self.live.insert(id));
    self.render_objects += 1;
  }

  fn release(&mut self, id: AssetId) {
    assert!(self.live.remove(&id), "released {id} twice");
  }
}

#[derive(Default)]
struct World {
  scene: FakeScene,
  gpu: FakeGpu,
  collision: CollisionIndex,
}

fn config(slots: usize) -> TerrainConfig {
  TerrainConfig::default()
    .with_seed(11)
    .with_hierarchy(
      HierarchyConfig::default()
        .with_root_tile_size(16)
        .with_root_range(1)
        .with_min_radius(4)
        .with_coarseness_factor(1.0),
    )
    .with_mesh(
      MeshSettings::default()
        .with_cells_per_tile(4)
        .with_texels_per_unit(1.0)
        .with_max_texture_resolution(128),
    )
    .with_manager(
      ManagerConfig::default()
        .with_slot_count(slots)
        .with_worker_threads(2)
        .with_max_uploads_per_dispatch(8),
    )
}

fn plane_manager(slots: usize) -> TileManager<PlaneDensity> {
  TileManager::new(config(slots), PlaneDensity::new(0.5)).expect("valid config")
}

fn tick<D: DensityField + 'static>(manager: &TileManager<D>, player: DVec3, world: &mut World) -> UpdateStats {
  let stats = manager.update(player, &mut world.scene, &mut world.collision);
  manager.dispatch(&mut world.gpu);
  stats
}

/// Tick until several consecutive ticks change nothing.
fn settle<D: DensityField + 'static>(manager: &TileManager<D>, player: DVec3, world: &mut World) {
  let mut idle = 0;
  for _ in 0..20_000 {
    let stats = tick(manager, player, world);
    assert_eq!(stats.dropped, 0);
    if stats.is_idle() && manager.in_flight() == 0 {
      idle += 1;
      if idle == 3 {
        return;
      }
    } else {
      idle = 0;
    }
    thread::sleep(Duration::from_millis(1));
  }
  panic!("lifecycle did not settle");
}

fn drain<D: DensityField + 'static>(manager: &mut TileManager<D>, player: DVec3, world: &mut World) {
  manager.shutdown();
  for _ in 0..1_000 {
    if manager.is_drained() {
      return;
    }
    tick(manager, player, world);
  }
  panic!("lifecycle did not drain");
}

/// Scene, GPU and collision agree with the slots.
fn assert_consistent<D: DensityField + 'static>(manager: &TileManager<D>, world: &World) {
  let mut entities = 0;
  let mut assets = 0;
  let mut colliders = 0;
  for (_, slot) in manager.pool().iter() {
    if slot.state.load() != TileState::Ready {
      continue;
    }
    let data = slot.lock();
    if let Some(entity) = data.entity {
      entities += 1;
      assert_eq!(world.scene.attached.contains_key(&entity), data.tile.visible, "{}", data.tile);
    } else {
      assert!(!data.tile.visible, "empty tile {} marked visible", data.tile);
    }
    if data.assets.is_some() {
      assets += 4;
    }
    if data.collider_registered {
      colliders += 1;
    }
  }
  assert_eq!(world.scene.entities.len(), entities);
  assert_eq!(world.gpu.live.len(), assets);
  assert_eq!(world.collision.len(), colliders);
}

#[test]
fn test_reaches_steady_state_and_drains() {
  let mut manager = plane_manager(1024);
  let mut world = World::default();
  let player = DVec3::new(0.0, 2.0, 0.0);

  settle(&manager, player, &mut world);
  assert_consistent(&manager, &world);

  let ready = manager.ready_tiles();
  let needed = find_needed_tiles(player, &ready, &manager.hierarchy);
  assert_eq!(ready, needed, "every needed tile is ready and nothing else is");
  assert!(world.gpu.render_objects > 0);
  assert!(!world.scene.attached.is_empty());

  // The plane under the player collides.
  world.collision.rebuild_if_needed();
  let hit = world
    .collision
    .cast_segment(DVec3::new(1.0, 6.0, 1.0), DVec3::new(1.0, -6.0, 1.0))
    .expect("plane below the player");
  assert!((hit.y - 0.5).abs() < 0.1, "hit at {hit}");

  drain(&mut manager, player, &mut world);
  assert!(world.scene.entities.is_empty());
  assert!(world.gpu.live.is_empty());
  assert!(world.collision.is_empty());
  assert_eq!(manager.count(TileState::Init), 1024);
}

/// A superseded parent becomes visible again without being regenerated.
#[test]
fn test_parent_promoted_without_regeneration() {
  let mut manager = plane_manager(1024);
  let mut world = World::default();
  let parent = TilePosition::new(IVec3::new(-16, 0, 0), 8);

  settle(&manager, DVec3::new(0.0, 2.0, 0.0), &mut world);
  let find_parent = |manager: &TileManager<PlaneDensity>| {
    manager
      .pool()
      .iter()
      .find(|(_, s)| s.state.load() == TileState::Ready && s.lock().tile == parent)
      .map(|(_, s)| {
        let data = s.lock();
        (data.tile.visible, data.entity)
      })
  };
  let (visible, entity) = find_parent(&manager).expect("parent kept as backing tile");
  assert!(!visible);
  let entity = entity.expect("parent crosses the plane");

  settle(&manager, DVec3::new(6.0, 2.0, 0.0), &mut world);
  let (visible, promoted) = find_parent(&manager).expect("parent still present");
  assert!(visible);
  assert_eq!(promoted, Some(entity), "same entity, no regeneration");
  assert!(world.scene.attached.contains_key(&entity));
  let spawns = world.scene.spawned.iter().filter(|t| **t == parent.transform()).count();
  assert_eq!(spawns, 1);
  assert_consistent(&manager, &world);

  drain(&mut manager, DVec3::ZERO, &mut world);
}

#[test]
fn test_capacity_exhaustion_drops_tiles() {
  let mut manager = plane_manager(4);
  let mut world = World::default();

  let stats = manager.update(DVec3::ZERO, &mut world.scene, &mut world.collision);
  assert_eq!(stats.assigned, 4);
  assert_eq!(stats.dropped, stats.requested - 4);
  assert!(stats.dropped > 0);

  // Full slots stay full; nothing is assigned twice.
  let again = manager.update(DVec3::ZERO, &mut world.scene, &mut world.collision);
  assert!(again.assigned <= 4);

  drain(&mut manager, DVec3::ZERO, &mut world);
  assert!(world.gpu.live.is_empty());
}

#[test]
fn test_empty_tiles_become_ready_without_entities() {
  let mut manager = TileManager::new(config(1024), ConstantDensity(1.0)).expect("valid config");
  let mut world = World::default();

  settle(&manager, DVec3::ZERO, &mut world);
  assert!(manager.count(TileState::Ready) > 0);
  assert!(world.scene.spawned.is_empty());
  assert!(world.gpu.live.is_empty());
  assert!(manager.ready_tiles().iter().all(|t| !t.visible));

  drain(&mut manager, DVec3::ZERO, &mut world);
}

#[test]
fn test_shutdown_reverts_unclaimed() {
  let mut manager = plane_manager(1024);
  let mut world = World::default();
  let stats = manager.update(DVec3::ZERO, &mut world.scene, &mut world.collision);
  assert!(stats.assigned > 0);

  manager.shutdown();
  assert_eq!(manager.count(TileState::Generate), 0);
  assert_eq!(manager.count(TileState::Generating), 0, "workers finished in-flight tiles");
  let after = manager.update(DVec3::ZERO, &mut world.scene, &mut world.collision);
  assert_eq!(after.requested, 0);
  assert_eq!(after.assigned, 0);

  drain(&mut manager, DVec3::ZERO, &mut world);
  assert!(manager.is_drained());
  // A second shutdown is a no-op.
  manager.shutdown();
}

#[test]
fn test_invalid_config_rejected() {
  let bad = config(0);
  assert!(matches!(
    TileManager::new(bad, PlaneDensity::new(0.0)),
    Err(TerrainError::Config(_))
  ));
}
