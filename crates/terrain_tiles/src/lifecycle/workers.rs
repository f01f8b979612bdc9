//! Background generation threads.
//!
//! Each worker blocks on the wake channel, then scans and claims the most
//! urgent `Generate` slot. The control step sends one token per assignment,
//! so a token always has a slot to go with it unless shutdown reverted it.
//! Dropping the last sender ends the loop once buffered tokens are consumed.

use std::io;
use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use web_time::Instant;

use super::slot::TileState;
use super::Shared;
use crate::density::DensityField;
use crate::generator::generate_tile;

pub(super) fn spawn_workers<D: DensityField + 'static>(
  shared: &Arc<Shared<D>>,
  wake: &Receiver<()>,
  count: usize,
) -> io::Result<Vec<JoinHandle<()>>> {
  (0..count)
    .map(|index| {
      let shared = Arc::clone(shared);
      let wake = wake.clone();
      thread::Builder::new()
        .name(format!("terrain-generator-{index}"))
        .spawn(move || run(index, &shared, &wake))
    })
    .collect()
}

fn run<D: DensityField>(index: usize, shared: &Shared<D>, wake: &Receiver<()>) {
  tracing::info!(worker = index, "terrain worker started");

  while wake.recv().is_ok() {
    if shared.stopping.load(Ordering::Acquire) {
      break;
    }
    let Some((id, tile)) = shared.pool.claim_next() else {
      continue;
    };
    tracing::trace!(worker = index, slot = id.index(), %tile, "claimed tile");

    let slot = shared.pool.slot(id);
    let start = Instant::now();
    match generate_tile(&tile, &shared.world) {
      Some(payload) => {
        let triangles = payload.mesh.triangle_count();
        let mesh_bytes = payload.mesh.memory_bytes();
        tracing::debug!(
          %tile,
          vertices = payload.mesh.vertices.len(),
          indices = payload.mesh.indices.len(),
          resolution = payload.texture_resolution(),
          us = payload.generation_us,
          "generated tile"
        );
        shared
          .metrics
          .lock()
          .unwrap_or_else(PoisonError::into_inner)
          .record_generated(tile.radius, triangles, mesh_bytes, payload.generation_us);

        {
          let mut data = slot.lock();
          data.triangles = triangles;
          data.mesh_bytes = mesh_bytes;
          data.payload = Some(payload);
        }
        slot.state.transition(TileState::Generating, TileState::Upload);
      }
      None => {
        tracing::debug!(%tile, "tile has no surface");
        shared
          .metrics
          .lock()
          .unwrap_or_else(PoisonError::into_inner)
          .record_empty(start.elapsed().as_micros() as u64);

        slot.lock().tile.visible = false;
        slot.state.transition(TileState::Generating, TileState::Ready);
      }
    }
  }

  tracing::info!(worker = index, "terrain worker stopped");
}
