//! Slot arena and the per-slot state machine.
//!
//! ```text
//!   Init ──> Generate ──> Generating ──> Upload ──> Entity ──> Ready ──> Init
//!              │                │                              ▲
//!              └──> Init        └──────────── (empty) ─────────┘
//!            (shutdown)
//! ```
//!
//! Each state has exactly one owner that may move a slot out of it: the
//! control step owns `Init`, `Entity` and `Ready`, workers own `Generate` and
//! `Generating`, the dispatch step owns `Upload`. The per-slot mutex guards
//! the data and is only contended while a worker scans for work.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::{DVec3, IVec3};

use super::backend::{EntityHandle, TileAssets};
use crate::collider::TileCollider;
use crate::generator::TilePayload;
use crate::tile::TilePosition;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TileState {
  /// Free.
  Init = 0,
  /// Assigned a position, waiting for a worker.
  Generate = 1,
  /// Claimed by a worker.
  Generating = 2,
  /// Payload ready for the dispatch step.
  Upload = 3,
  /// GPU assets exist, scene entity pending.
  Entity = 4,
  /// Fully presented, or generated empty.
  Ready = 5,
}

impl TileState {
  pub const ALL: [TileState; 6] = [
    TileState::Init,
    TileState::Generate,
    TileState::Generating,
    TileState::Upload,
    TileState::Entity,
    TileState::Ready,
  ];

  fn from_u8(value: u8) -> Self {
    match value {
      0 => TileState::Init,
      1 => TileState::Generate,
      2 => TileState::Generating,
      3 => TileState::Upload,
      4 => TileState::Entity,
      _ => TileState::Ready,
    }
  }

  pub fn can_transition_to(self, to: TileState) -> bool {
    use TileState::*;
    matches!(
      (self, to),
      (Init, Generate)
        | (Generate, Generating)
        | (Generate, Init)
        | (Generating, Upload)
        | (Generating, Ready)
        | (Upload, Entity)
        | (Entity, Ready)
        | (Ready, Init)
    )
  }

  /// Somewhere between assignment and presentation.
  pub fn is_in_flight(self) -> bool {
    !matches!(self, TileState::Init | TileState::Ready)
  }
}

/// Atomic [`TileState`]. Compare-and-swap is the only way to change it.
#[derive(Debug)]
pub struct SlotState(AtomicU8);

impl Default for SlotState {
  fn default() -> Self {
    Self(AtomicU8::new(TileState::Init as u8))
  }
}

impl SlotState {
  #[inline]
  pub fn load(&self) -> TileState {
    TileState::from_u8(self.0.load(Ordering::Acquire))
  }

  /// Move `from → to`. Returns false if the slot was not in `from`.
  pub fn transition(&self, from: TileState, to: TileState) -> bool {
    debug_assert!(from.can_transition_to(to), "illegal tile transition {from:?} -> {to:?}");
    self
      .0
      .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }
}

/// Index into the [`TilePool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

impl SlotId {
  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// Everything a slot holds besides its state.
pub struct SlotData {
  /// Position; `visible` is what is currently shown.
  pub tile: TilePosition,
  /// Set by the worker, taken by the dispatch step.
  pub payload: Option<TilePayload>,
  pub assets: Option<TileAssets>,
  /// Kept after upload for the collision world.
  pub collider: Option<Arc<TileCollider>>,
  pub collider_registered: bool,
  pub entity: Option<EntityHandle>,
  pub triangles: usize,
  pub mesh_bytes: usize,
}

impl Default for SlotData {
  fn default() -> Self {
    Self {
      tile: TilePosition::new(IVec3::ZERO, 1).with_visible(false),
      payload: None,
      assets: None,
      collider: None,
      collider_registered: false,
      entity: None,
      triangles: 0,
      mesh_bytes: 0,
    }
  }
}

impl SlotData {
  pub fn reset(&mut self) {
    *self = SlotData::default();
  }
}

#[derive(Default)]
pub struct TileSlot {
  pub state: SlotState,
  data: Mutex<SlotData>,
}

impl TileSlot {
  pub fn lock(&self) -> MutexGuard<'_, SlotData> {
    self.data.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Fixed-size slot arena shared by the control step, dispatch step and
/// workers.
pub struct TilePool {
  slots: Box<[TileSlot]>,
  claim_lock: Mutex<()>,
  player: Mutex<DVec3>,
}

impl TilePool {
  pub fn new(count: usize) -> Self {
    Self {
      slots: (0..count).map(|_| TileSlot::default()).collect(),
      claim_lock: Mutex::new(()),
      player: Mutex::new(DVec3::ZERO),
    }
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }

  #[inline]
  pub fn slot(&self, id: SlotId) -> &TileSlot {
    &self.slots[id.index()]
  }

  pub fn iter(&self) -> impl Iterator<Item = (SlotId, &TileSlot)> {
    self.slots.iter().enumerate().map(|(i, s)| (SlotId(i as u32), s))
  }

  pub fn set_player(&self, player: DVec3) {
    *self.player.lock().unwrap_or_else(PoisonError::into_inner) = player;
  }

  pub fn player(&self) -> DVec3 {
    *self.player.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Bind `tile` to a free slot and mark it `Generate`.
  pub fn assign(&self, id: SlotId, tile: TilePosition) -> bool {
    let slot = self.slot(id);
    if slot.state.load() != TileState::Init {
      return false;
    }
    {
      let mut data = slot.lock();
      data.reset();
      data.tile = tile.with_visible(false);
    }
    slot.state.transition(TileState::Init, TileState::Generate)
  }

  /// Claim the most urgent `Generate` slot: largest radius, then closest to
  /// the player.
  #[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "pool::claim_next"))]
  pub fn claim_next(&self) -> Option<(SlotId, TilePosition)> {
    let _guard = self.claim_lock.lock().unwrap_or_else(PoisonError::into_inner);
    let player = self.player();

    let mut best: Option<(SlotId, TilePosition, f64)> = None;
    for (id, slot) in self.iter() {
      if slot.state.load() != TileState::Generate {
        continue;
      }
      let tile = slot.lock().tile;
      let distance = tile.distance_to_player(player);
      let better = match &best {
        None => true,
        Some((_, current, current_distance)) => {
          tile.radius > current.radius
            || (tile.radius == current.radius && distance.total_cmp(current_distance).is_lt())
        }
      };
      if better {
        best = Some((id, tile, distance));
      }
    }

    // Only claimers and `revert_unclaimed` leave `Generate`, both under the claim lock.
    let (id, tile, _) = best?;
    let claimed = self.slot(id).state.transition(TileState::Generate, TileState::Generating);
    debug_assert!(claimed, "slot {id:?} left Generate while the claim lock was held");
    claimed.then_some((id, tile))
  }

  /// Return every unclaimed `Generate` slot to `Init`.
  pub fn revert_unclaimed(&self) -> usize {
    let _guard = self.claim_lock.lock().unwrap_or_else(PoisonError::into_inner);
    let mut reverted = 0;
    for (_, slot) in self.iter() {
      if slot.state.load() == TileState::Generate {
        slot.lock().reset();
        if slot.state.transition(TileState::Generate, TileState::Init) {
          reverted += 1;
        }
      }
    }
    reverted
  }

  pub fn count(&self, state: TileState) -> usize {
    self.slots.iter().filter(|s| s.state.load() == state).count()
  }

  /// Positions bound to slots in `state`.
  pub fn tiles_in(&self, state: TileState) -> Vec<TilePosition> {
    self
      .slots
      .iter()
      .filter(|s| s.state.load() == state)
      .map(|s| s.lock().tile)
      .collect()
  }
}

#[cfg(test)]
#[path = "slot_test.rs"]
mod slot_test;
