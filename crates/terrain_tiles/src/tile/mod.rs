//! Tile addressing.
//!
//! A tile is an axis-aligned cube in world space, identified by its integer
//! center and its radius (half-width). Tile-local space is the cube `[-1, 1]^3`;
//! the tile transform maps it into the world with a uniform scale of `radius`.
//!
//! ```text
//!        +----------+----------+
//!        |  child 2 |  child 3 |     children: radius / 2,
//!        |  (-x,+y) |  (+x,+y) |     offset +-radius/2 per axis,
//!        +----------+----------+     octant bit 0 = X, bit 1 = Y, bit 2 = Z
//!        |  child 0 |  child 1 |
//!        |  (-x,-y) |  (+x,-y) |
//!        +----------+----------+
//! ```

mod bounds;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use glam::{DAffine3, DQuat, DVec3, IVec3, Vec3};

pub use bounds::DAabb3;

/// Position and size of a tile, plus the visibility the hierarchy requests for it.
///
/// Identity is `(center, radius)`. `visible` is a request attribute and does not
/// participate in equality, ordering or hashing, so a tile can be looked up in a
/// set regardless of the visibility it was requested with.
#[derive(Clone, Copy, Debug)]
pub struct TilePosition {
  /// Integer world-space center.
  pub center: IVec3,
  /// Half-width in world units, a power of two.
  pub radius: i32,
  /// Whether the tile should currently render and collide.
  pub visible: bool,
}

impl TilePosition {
  /// Create a visible tile.
  pub fn new(center: IVec3, radius: i32) -> Self {
    debug_assert!(radius > 0, "tile radius must be positive, got {radius}");
    Self {
      center,
      radius,
      visible: true,
    }
  }

  /// Same tile with a different visibility request.
  #[inline]
  pub fn with_visible(self, visible: bool) -> Self {
    Self { visible, ..self }
  }

  /// Edge length of the tile in world units.
  #[inline]
  pub fn size(&self) -> i32 {
    self.radius * 2
  }

  /// Local-to-world transform: translation to the center, uniform scale by radius.
  pub fn transform(&self) -> DAffine3 {
    DAffine3::from_scale_rotation_translation(
      DVec3::splat(self.radius as f64),
      DQuat::IDENTITY,
      self.center.as_dvec3(),
    )
  }

  /// World-space box: the unit cube `[-1, 1]^3` mapped by [`Self::transform`].
  pub fn bounding_box(&self) -> DAabb3 {
    DAabb3::from_center_half_extents(self.center.as_dvec3(), DVec3::splat(self.radius as f64))
  }

  /// Distance from the player to the tile box, zero when the player is inside.
  #[inline]
  pub fn distance_to_player(&self, player: DVec3) -> f64 {
    self.bounding_box().distance_to_point(player)
  }

  /// Child in the given octant (0-7).
  ///
  /// - bit 0: X side (0 = negative, 1 = positive)
  /// - bit 1: Y side
  /// - bit 2: Z side
  pub fn child(&self, octant: u8) -> TilePosition {
    debug_assert!(octant < 8, "octant out of range: {octant}");
    debug_assert!(self.radius >= 2, "cannot split a tile of radius {}", self.radius);
    let radius = self.radius / 2;
    let side = |bit: u8| if octant & bit == 0 { -radius } else { radius };
    TilePosition {
      center: self.center + IVec3::new(side(1), side(2), side(4)),
      radius,
      visible: self.visible,
    }
  }

  /// All 8 children, indexed by octant.
  pub fn children(&self) -> [TilePosition; 8] {
    std::array::from_fn(|i| self.child(i as u8))
  }

  /// Map a tile-local point into world space.
  #[inline]
  pub fn local_to_world(&self, local: Vec3) -> DVec3 {
    self.center.as_dvec3() + local.as_dvec3() * self.radius as f64
  }

  /// Map a world point into tile-local space.
  #[inline]
  pub fn world_to_local(&self, world: DVec3) -> DVec3 {
    (world - self.center.as_dvec3()) / self.radius as f64
  }

  fn key(&self) -> (i32, i32, i32, i32) {
    (self.center.x, self.center.y, self.center.z, self.radius)
  }
}

impl PartialEq for TilePosition {
  fn eq(&self, other: &Self) -> bool {
    self.key() == other.key()
  }
}

impl Eq for TilePosition {}

impl Hash for TilePosition {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.key().hash(state);
  }
}

impl Ord for TilePosition {
  fn cmp(&self, other: &Self) -> Ordering {
    self.key().cmp(&other.key())
  }
}

impl PartialOrd for TilePosition {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl fmt::Display for TilePosition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}__{}_{}_{}",
      self.radius, self.center.x, self.center.y, self.center.z
    )
  }
}
