//! Procedural rock material.
//!
//! Five base rocks compete through their own low-frequency ranking fields. The
//! two best-ranked bases at a point are cross-faded, weighted by how clearly the
//! winner leads, so borders between rock types blend instead of cutting hard.
//! On top of the blend:
//!
//! - HSV jitter from fine noise on every base,
//! - dust on upward-facing surfaces,
//! - thin dark cracks along the curves where two Worley distance fields meet,
//! - rare glistering specks (bright, smooth, metallic) at Worley cell centers.

use glam::{DVec3, Vec3};
use noise::core::worley::ReturnType;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin, Value, Worley};

use super::color::{hsv_to_rgb, sharp_edge, smoothstep};
use crate::context::MATERIAL_SEED_COUNT;

/// Frequency of the rock-type ranking fields.
const RANK_SCALE: f64 = 0.018;
/// Score lead at which the winner fully takes over.
const BLEND_GAP: f32 = 0.12;
/// Strength of the HSV jitter.
const DEVIATION: Vec3 = Vec3::new(0.015, 0.1, 0.1);
/// Frequency of the crack cells.
const CRACK_FREQUENCY: f64 = 0.35;
/// Crack half-width, in units of the Worley distance difference.
const CRACK_WIDTH: f32 = 0.035;
const GLISTER_FREQUENCY: f64 = 1.6;
const GLISTER_THRESHOLD: f32 = 0.93;

/// Shading inputs for one surface point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialSample {
  /// Linear albedo in `[0, 1]`.
  pub albedo: Vec3,
  pub roughness: f32,
  pub metallic: f32,
}

impl MaterialSample {
  fn lerp(self, other: MaterialSample, t: f32) -> MaterialSample {
    MaterialSample {
      albedo: self.albedo.lerp(other.albedo, t),
      roughness: self.roughness + (other.roughness - self.roughness) * t,
      metallic: self.metallic + (other.metallic - self.metallic) * t,
    }
  }
}

/// Base rock types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaseMaterial {
  /// Pale, layered, paper-like rock.
  Paper,
  /// Sandy rock with warm stripes.
  Sphinx,
  /// Nearly white rock.
  Pale,
  /// Dark blue-grey rock.
  Basalt,
  /// Dark rock with a slightly lighter mottling.
  Slate,
}

impl BaseMaterial {
  pub const ALL: [BaseMaterial; 5] = [
    BaseMaterial::Paper,
    BaseMaterial::Sphinx,
    BaseMaterial::Pale,
    BaseMaterial::Basalt,
    BaseMaterial::Slate,
  ];

  /// `(roughness, metallic)`
  pub fn surface(self) -> (f32, f32) {
    match self {
      BaseMaterial::Paper => (0.92, 0.0),
      BaseMaterial::Sphinx => (0.8, 0.002),
      BaseMaterial::Pale => (0.75, 0.0),
      BaseMaterial::Basalt => (0.55, 0.04),
      BaseMaterial::Slate => (0.62, 0.02),
    }
  }
}

/// Weight of the leading base given its score lead over the runner-up.
#[inline]
pub fn blend_weight(gap: f32) -> f32 {
  0.5 + 0.5 * smoothstep(0.0, BLEND_GAP, gap)
}

/// Indices of the best and second best scores.
fn top_two(scores: &[f32; 5]) -> (usize, usize) {
  let mut best = 0;
  let mut second = 1;
  if scores[second] > scores[best] {
    std::mem::swap(&mut best, &mut second);
  }
  for i in 2..scores.len() {
    if scores[i] > scores[best] {
      second = best;
      best = i;
    } else if scores[i] > scores[second] {
      second = i;
    }
  }
  (best, second)
}

/// Material noise layers for one world seed.
///
/// Built per tile on the generating thread.
pub struct MaterialField {
  rank: [Fbm<Perlin>; 5],
  hue: Fbm<Value>,
  saturation: Fbm<Value>,
  value: Fbm<Value>,
  warp: Fbm<Perlin>,
  cracks: [Worley; 2],
  glister: Worley,
  speckle: Value,
}

impl MaterialField {
  pub fn new(seeds: &[u32; MATERIAL_SEED_COUNT]) -> Self {
    let fbm_perlin = |seed: u32, octaves: usize| Fbm::<Perlin>::new(seed).set_octaves(octaves);
    let fbm_value = |seed: u32| Fbm::<Value>::new(seed).set_octaves(3);
    Self {
      rank: std::array::from_fn(|i| fbm_perlin(seeds[i], 3)),
      hue: fbm_value(seeds[5]),
      saturation: fbm_value(seeds[6]),
      value: fbm_value(seeds[7]),
      warp: fbm_perlin(seeds[8], 2),
      cracks: [seeds[9], seeds[12]].map(|seed| {
        Worley::new(seed)
          .set_frequency(CRACK_FREQUENCY)
          .set_return_type(ReturnType::Distance)
      }),
      glister: Worley::new(seeds[10])
        .set_frequency(GLISTER_FREQUENCY)
        .set_return_type(ReturnType::Distance),
      speckle: Value::new(seeds[11]),
    }
  }

  #[inline]
  fn noise<N: NoiseFn<f64, 3>>(field: &N, p: DVec3) -> f32 {
    field.get(p.to_array()) as f32
  }

  /// Material at a world position with a world-space unit normal.
  pub fn sample(&self, world: DVec3, normal: Vec3) -> MaterialSample {
    let scores: [f32; 5] = std::array::from_fn(|i| Self::noise(&self.rank[i], world * RANK_SCALE));
    let (best, second) = top_two(&scores);
    let weight = blend_weight(scores[best] - scores[second]);

    let jitter = Vec3::new(
      Self::noise(&self.hue, world * 3.0),
      Self::noise(&self.saturation, world * 4.0),
      Self::noise(&self.value, world * 4.0),
    );
    let a = self.base(BaseMaterial::ALL[best], world, jitter);
    let b = self.base(BaseMaterial::ALL[second], world, jitter);
    let mut sample = b.lerp(a, weight);

    // Dust settles on upward-facing surfaces.
    let up = smoothstep(0.55, 0.95, normal.y);
    sample.albedo *= 1.0 + 0.12 * up;
    sample.roughness += 0.05 * up;

    if let Some(depth) = self.crack_depth(world) {
      sample.albedo *= 0.35 + 0.65 * depth;
      sample.roughness = sample.roughness.max(0.9);
    }

    // Worley distance is smallest at cell centers.
    let closeness = -Self::noise(&self.glister, world);
    if closeness > GLISTER_THRESHOLD {
      let s = smoothstep(GLISTER_THRESHOLD, 1.0, closeness);
      sample = sample.lerp(
        MaterialSample {
          albedo: Vec3::splat(0.95),
          roughness: 0.15,
          metallic: 0.85,
        },
        s,
      );
    }

    MaterialSample {
      albedo: sample.albedo.clamp(Vec3::ZERO, Vec3::ONE),
      roughness: sample.roughness.clamp(0.0, 1.0),
      metallic: sample.metallic.clamp(0.0, 1.0),
    }
  }

  /// Position across a crack, 0 on its center line, `None` outside cracks.
  ///
  /// Two independent Worley distance fields are equal along curved sheets
  /// that cut the surface in a network of thin lines.
  pub fn crack_depth(&self, world: DVec3) -> Option<f32> {
    let [a, b] = &self.cracks;
    let gap = (Self::noise(a, world) - Self::noise(b, world)).abs();
    (gap < CRACK_WIDTH).then(|| gap / CRACK_WIDTH)
  }

  fn base(&self, base: BaseMaterial, world: DVec3, jitter: Vec3) -> MaterialSample {
    let warp = Self::noise(&self.warp, world * 0.08);
    let hsv = match base {
      BaseMaterial::Paper => {
        let layers = (world.y as f32 * 2.3 + warp * 3.0).sin() * 0.5 + 0.5;
        Vec3::new(0.105, 0.16, 0.82 + 0.06 * layers)
      }
      BaseMaterial::Sphinx => {
        let stripe = (world.y as f32 * 1.4 + warp * 6.0).sin() * 0.5 + 0.5;
        let t = sharp_edge(stripe, 0.5, 0.08);
        Vec3::new(0.086, 0.34, 0.93).lerp(Vec3::new(0.072, 0.56, 0.80), t)
      }
      BaseMaterial::Pale => Vec3::new(0.11, 0.06, 0.78),
      BaseMaterial::Basalt => {
        let grain = Self::noise(&self.speckle, world * 9.0) * 0.5 + 0.5;
        Vec3::new(0.64, 0.27, 0.19 + 0.05 * grain)
      }
      BaseMaterial::Slate => {
        let mottle = smoothstep(-0.2, 0.4, warp);
        Vec3::new(0.66, 0.11, 0.28).lerp(Vec3::new(0.64, 0.06, 0.35), mottle)
      }
    };

    let (roughness, metallic) = base.surface();
    MaterialSample {
      albedo: hsv_to_rgb(hsv + jitter * DEVIATION),
      roughness,
      metallic,
    }
  }
}
