//! Signed density fields.
//!
//! Negative = solid, positive = air. The surface is the zero level set. Fields
//! are pure functions of the world position, so every tile (and every re-run of
//! the same tile) sees the same values at the same points.

use glam::DVec3;
use noise::{Fbm, MultiFractal, NoiseFn, Value};

/// A scalar field sampled in world space.
pub trait DensityField: Send + Sync {
  fn density(&self, p: DVec3) -> f64;
}

impl<F> DensityField for F
where
  F: Fn(DVec3) -> f64 + Send + Sync,
{
  #[inline]
  fn density(&self, p: DVec3) -> f64 {
    self(p)
  }
}

/// Frequency of the primary layer.
const PRIMARY_SCALE: f64 = 0.2;
/// Frequency of the secondary layer, sampled on permuted axes.
const SECONDARY_SCALE: f64 = 0.13;
const OCTAVES: usize = 3;

/// Terrain density: difference of two fractal value-noise layers.
///
/// `density(p) = a(p * 0.2) - b((p.y, -p.z, p.x) * 0.13)`
///
/// The axis permutation of the second layer breaks the alignment of the two
/// lattices so their zero crossing forms organic, overhanging shapes.
#[derive(Clone, Debug)]
pub struct NoiseDensity {
  primary: Fbm<Value>,
  secondary: Fbm<Value>,
}

impl NoiseDensity {
  /// Build from the two layer seeds.
  pub fn new(primary_seed: u32, secondary_seed: u32) -> Self {
    Self {
      primary: Fbm::<Value>::new(primary_seed).set_octaves(OCTAVES),
      secondary: Fbm::<Value>::new(secondary_seed).set_octaves(OCTAVES),
    }
  }
}

impl DensityField for NoiseDensity {
  #[inline]
  fn density(&self, p: DVec3) -> f64 {
    let a = p * PRIMARY_SCALE;
    let b = DVec3::new(p.y, -p.z, p.x) * SECONDARY_SCALE;
    self.primary.get(a.to_array()) - self.secondary.get(b.to_array())
  }
}

/// Same value everywhere. A negative value is all solid, positive all air.
#[derive(Clone, Copy, Debug)]
pub struct ConstantDensity(pub f64);

impl DensityField for ConstantDensity {
  #[inline]
  fn density(&self, _p: DVec3) -> f64 {
    self.0
  }
}

/// Horizontal ground plane, solid below `height`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaneDensity {
  pub height: f64,
}

impl PlaneDensity {
  pub fn new(height: f64) -> Self {
    Self { height }
  }
}

impl DensityField for PlaneDensity {
  #[inline]
  fn density(&self, p: DVec3) -> f64 {
    p.y - self.height
  }
}

/// Solid ball.
#[derive(Clone, Copy, Debug)]
pub struct SphereDensity {
  pub center: DVec3,
  pub radius: f64,
}

impl Default for SphereDensity {
  fn default() -> Self {
    Self {
      center: DVec3::ZERO,
      radius: 10.0,
    }
  }
}

impl SphereDensity {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_center(mut self, center: DVec3) -> Self {
    self.center = center;
    self
  }

  pub fn with_radius(mut self, radius: f64) -> Self {
    self.radius = radius;
    self
  }
}

impl DensityField for SphereDensity {
  #[inline]
  fn density(&self, p: DVec3) -> f64 {
    p.distance(self.center) - self.radius
  }
}
