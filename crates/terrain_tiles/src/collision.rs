//! Reference [`CollisionWorld`]: tile colliders with a deferred broad-phase.
//!
//! Updates and removals mark the index dirty; queries only see the snapshot
//! taken by the last `rebuild_if_needed`, the way a physics engine only sees
//! a new static mesh after its acceleration structure is rebuilt.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{DAffine3, DVec3};

use crate::collider::TileCollider;
use crate::lifecycle::backend::{AssetId, CollisionWorld};
use crate::tile::DAabb3;

#[derive(Clone)]
struct Entry {
  collider: Arc<TileCollider>,
  transform: DAffine3,
  inverse: DAffine3,
  bounds: DAabb3,
}

/// Collision index over tile colliders.
#[derive(Default)]
pub struct CollisionIndex {
  entries: HashMap<AssetId, Entry>,
  /// Broad-phase snapshot, ordered by id.
  snapshot: Vec<(AssetId, Entry)>,
  dirty: bool,
  rebuilds: u64,
}

impl CollisionIndex {
  pub fn new() -> Self {
    Self::default()
  }

  /// Colliders registered, including changes not yet rebuilt.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn contains(&self, id: AssetId) -> bool {
    self.entries.contains_key(&id)
  }

  pub fn is_dirty(&self) -> bool {
    self.dirty
  }

  /// World transform a collider was registered with.
  pub fn transform_of(&self, id: AssetId) -> Option<DAffine3> {
    self.entries.get(&id).map(|e| e.transform)
  }

  /// Number of rebuilds performed so far.
  pub fn rebuild_count(&self) -> u64 {
    self.rebuilds
  }
}

impl CollisionWorld for CollisionIndex {
  fn update(&mut self, id: AssetId, collider: Arc<TileCollider>, transform: DAffine3) {
    let local = collider.bounds();
    let bounds = if local.is_valid() {
      DAabb3::from_points(
        DAabb3::new(local.min.as_dvec3(), local.max.as_dvec3())
          .corners()
          .map(|c| transform.transform_point3(c)),
      )
    } else {
      None
    };
    let Some(bounds) = bounds else {
      // Nothing to collide with.
      self.remove(id);
      return;
    };

    self.entries.insert(
      id,
      Entry {
        collider,
        transform,
        inverse: transform.inverse(),
        bounds,
      },
    );
    self.dirty = true;
  }

  fn remove(&mut self, id: AssetId) {
    if self.entries.remove(&id).is_some() {
      self.dirty = true;
    }
  }

  fn rebuild_if_needed(&mut self) {
    if !self.dirty {
      return;
    }
    self.snapshot = self.entries.iter().map(|(id, e)| (*id, e.clone())).collect();
    self.snapshot.sort_by_key(|(id, _)| *id);
    self.dirty = false;
    self.rebuilds += 1;
  }

  fn cast_segment(&self, origin: DVec3, target: DVec3) -> Option<DVec3> {
    let dir = target - origin;
    let mut best: Option<f64> = None;

    for (_, entry) in &self.snapshot {
      let Some(entry_t) = entry.bounds.segment_entry(origin, dir) else {
        continue;
      };
      if best.is_some_and(|t| entry_t > t) {
        continue;
      }
      let local_origin = entry.inverse.transform_point3(origin).as_vec3();
      let local_target = entry.inverse.transform_point3(target).as_vec3();
      if let Some(hit) = entry.collider.cast_segment(local_origin, local_target) {
        let t = hit.t as f64;
        if best.map_or(true, |b| t < b) {
          best = Some(t);
        }
      }
    }

    best.map(|t| origin + dir * t)
  }
}

#[cfg(test)]
#[path = "collision_test.rs"]
mod collision_test;
