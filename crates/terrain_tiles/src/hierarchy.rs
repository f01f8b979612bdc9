//! Hierarchical tile selection.
//!
//! A fixed cube of root tiles surrounds the player. Each root is refined
//! recursively while it is too coarse for its distance to the player, but
//! only as far as the finer tiles are already generated:
//!
//! ```text
//!   coarse enough or at min radius ──> request tile (visible)
//!   children all ready              ──> recurse into children,
//!                                       keep tile requested (invisible backing)
//!   otherwise                       ──> request children (invisible, generating)
//!                                       keep tile requested (visible placeholder)
//! ```
//!
//! A parent stays on screen until all 8 children exist, so refinement never
//! opens holes. Once its children take over it stays generated but hidden,
//! ready to become visible again when the player walks away.

use std::collections::BTreeSet;

use glam::{DVec3, IVec3};

use crate::config::HierarchyConfig;
use crate::tile::TilePosition;

/// Center of the root tile containing `player`, per axis.
#[inline]
fn root_cell(player: DVec3, root_tile_size: i32) -> IVec3 {
  let size = root_tile_size as f64;
  ((player / size).round() * size).as_ivec3()
}

/// Whether `tile` needs no further refinement for this player position.
#[inline]
pub fn is_coarse_enough(tile: &TilePosition, player: DVec3, config: &HierarchyConfig) -> bool {
  tile.distance_to_player(player) > config.coarseness_factor * tile.radius as f64
}

/// The set of tiles that should exist for this player position.
///
/// `ready` holds tiles that are fully generated and presentable; visibility
/// flags in it are ignored.
#[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "hierarchy::find_needed_tiles"))]
pub fn find_needed_tiles(
  player: DVec3,
  ready: &BTreeSet<TilePosition>,
  config: &HierarchyConfig,
) -> BTreeSet<TilePosition> {
  let mut needed = BTreeSet::new();
  let origin = root_cell(player, config.root_tile_size);
  let range = config.root_range;

  for z in -range..=range {
    for y in -range..=range {
      for x in -range..=range {
        let center = origin + IVec3::new(x, y, z) * config.root_tile_size;
        let root = TilePosition::new(center, config.root_radius());
        traverse(root, player, ready, config, &mut needed);
      }
    }
  }

  needed
}

fn traverse(
  tile: TilePosition,
  player: DVec3,
  ready: &BTreeSet<TilePosition>,
  config: &HierarchyConfig,
  needed: &mut BTreeSet<TilePosition>,
) {
  if tile.radius <= config.min_radius || is_coarse_enough(&tile, player, config) {
    needed.insert(tile.with_visible(true));
    return;
  }

  let children = tile.children();
  let children_ready = children.iter().all(|child| ready.contains(child));
  if children_ready {
    for child in children {
      traverse(child, player, ready, config, needed);
    }
  } else {
    for child in children {
      needed.insert(child.with_visible(false));
    }
  }
  needed.insert(tile.with_visible(!children_ready));
}

#[cfg(test)]
#[path = "hierarchy_test.rs"]
mod hierarchy_test;
