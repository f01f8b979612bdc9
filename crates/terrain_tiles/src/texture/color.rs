//! Small color helpers. HSV components are all in `[0, 1]`, hue wraps.

use glam::Vec3;

/// Convert RGB to HSV.
pub fn rgb_to_hsv(rgb: Vec3) -> Vec3 {
  let max = rgb.max_element();
  let min = rgb.min_element();
  let delta = max - min;

  let hue = if delta <= f32::EPSILON {
    0.0
  } else if max == rgb.x {
    ((rgb.y - rgb.z) / delta).rem_euclid(6.0) / 6.0
  } else if max == rgb.y {
    ((rgb.z - rgb.x) / delta + 2.0) / 6.0
  } else {
    ((rgb.x - rgb.y) / delta + 4.0) / 6.0
  };
  let saturation = if max <= f32::EPSILON { 0.0 } else { delta / max };
  Vec3::new(hue, saturation, max)
}

/// Convert HSV to RGB. Hue wraps, saturation and value are clamped.
pub fn hsv_to_rgb(hsv: Vec3) -> Vec3 {
  let h = hsv.x.rem_euclid(1.0) * 6.0;
  let s = hsv.y.clamp(0.0, 1.0);
  let v = hsv.z.clamp(0.0, 1.0);

  let c = v * s;
  let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
  let m = v - c;
  let (r, g, b) = match h as u32 {
    0 => (c, x, 0.0),
    1 => (x, c, 0.0),
    2 => (0.0, c, x),
    3 => (0.0, x, c),
    4 => (x, 0.0, c),
    _ => (c, 0.0, x),
  };
  Vec3::new(r + m, g + m, b + m)
}

/// Hermite step between two edges.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
  let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
  t * t * (3.0 - 2.0 * t)
}

/// Steep step centered on `edge` with half-width `softness`.
#[inline]
pub fn sharp_edge(x: f32, edge: f32, softness: f32) -> f32 {
  smoothstep(edge - softness, edge + softness, x)
}

/// Quantize a unit value to a non-zero byte; zero is reserved for blank texels.
#[inline]
pub fn to_texel(value: f32) -> u8 {
  (value.clamp(0.0, 1.0) * 255.0).round().max(1.0) as u8
}
