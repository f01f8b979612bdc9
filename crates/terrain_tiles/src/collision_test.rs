use glam::{IVec3, Vec3};

use super::*;
use crate::tile::TilePosition;

/// Flat square at local y = 0 covering the whole tile.
fn floor_collider() -> Arc<TileCollider> {
  Arc::new(TileCollider::from_triangles(vec![
    [Vec3::new(-1.0, 0.0, -1.0), Vec3::new(-1.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 1.0)],
    [Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 1.0), Vec3::new(1.0, 0.0, -1.0)],
  ]))
}

#[test]
fn test_changes_invisible_until_rebuild() {
  let mut index = CollisionIndex::new();
  let tile = TilePosition::new(IVec3::new(0, 10, 0), 4);
  let id = AssetId::next();

  index.update(id, floor_collider(), tile.transform());
  assert!(index.is_dirty());
  let down = (DVec3::new(1.0, 20.0, 1.0), DVec3::new(1.0, 0.0, 1.0));
  assert!(index.cast_segment(down.0, down.1).is_none(), "not rebuilt yet");

  index.rebuild_if_needed();
  assert!(!index.is_dirty());
  let hit = index.cast_segment(down.0, down.1).expect("floor at y = 10");
  assert!(hit.abs_diff_eq(DVec3::new(1.0, 10.0, 1.0), 1e-5), "hit at {hit}");

  index.remove(id);
  assert!(index.cast_segment(down.0, down.1).is_some(), "removal pending");
  index.rebuild_if_needed();
  assert!(index.cast_segment(down.0, down.1).is_none());
}

#[test]
fn test_rebuild_only_when_dirty() {
  let mut index = CollisionIndex::new();
  index.rebuild_if_needed();
  assert_eq!(index.rebuild_count(), 0);

  index.update(AssetId::next(), floor_collider(), TilePosition::new(IVec3::ZERO, 4).transform());
  index.rebuild_if_needed();
  index.rebuild_if_needed();
  assert_eq!(index.rebuild_count(), 1);

  index.remove(AssetId::next());
  assert!(!index.is_dirty(), "removing an unknown id changes nothing");
}

/// The nearest of several stacked tiles wins.
#[test]
fn test_nearest_tile_wins() {
  let mut index = CollisionIndex::new();
  for y in [0, 8, 16] {
    let tile = TilePosition::new(IVec3::new(0, y, 0), 4);
    index.update(AssetId::next(), floor_collider(), tile.transform());
  }
  index.rebuild_if_needed();

  let hit = index
    .cast_segment(DVec3::new(0.5, 30.0, 0.5), DVec3::new(0.5, -30.0, 0.5))
    .expect("three floors below");
  assert!((hit.y - 16.0).abs() < 1e-5);

  let up = index
    .cast_segment(DVec3::new(0.5, -30.0, 0.5), DVec3::new(0.5, 30.0, 0.5))
    .expect("three floors above");
  assert!(up.y.abs() < 1e-5);
}

#[test]
fn test_empty_collider_not_registered() {
  let mut index = CollisionIndex::new();
  let id = AssetId::next();
  index.update(id, Arc::new(TileCollider::default()), TilePosition::new(IVec3::ZERO, 4).transform());
  assert!(!index.contains(id));
  assert!(index.is_empty());
}

#[test]
fn test_transform_recorded() {
  let mut index = CollisionIndex::new();
  let id = AssetId::next();
  let tile = TilePosition::new(IVec3::new(8, 0, 0), 4);
  index.update(id, floor_collider(), tile.transform());
  assert_eq!(index.transform_of(id), Some(tile.transform()));
  assert_eq!(index.len(), 1);
}
