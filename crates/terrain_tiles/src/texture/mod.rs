//! Texture synthesis for unwrapped tile meshes.
//!
//! Every texel whose center lies on (or within a fraction of a texel of) a
//! chart triangle is mapped back to a tile-local position and normal through
//! barycentric interpolation, converted to world space and shaded by the
//! [`MaterialField`]. Two images come out:
//!
//! - albedo: RGB8,
//! - special: two channels, roughness and metallic.
//!
//! Covered texels never encode as all zero, so the inpainter can tell them from
//! blank texels and grow the charts into their padding.

pub mod color;
pub mod inpaint;
pub mod material;

use glam::{Vec2, Vec3};
use image::{DynamicImage, GrayAlphaImage, LumaA, Rgb, RgbImage};

use crate::config::TextureSettings;
use crate::context::MATERIAL_SEED_COUNT;
use crate::mesh::{Atlas, TileMesh};
use crate::tile::TilePosition;

pub use inpaint::{inpaint, inpaint_dynamic};
pub use material::{BaseMaterial, MaterialField, MaterialSample};

/// Texel centers farther than this from a triangle (in texels) are not shaded.
const COVERAGE_DISTANCE: f32 = 0.75;

/// The two textures of a tile, same resolution.
#[derive(Clone, Debug)]
pub struct TileTextures {
  pub albedo: DynamicImage,
  /// R = roughness, A = metallic.
  pub special: DynamicImage,
}

impl TileTextures {
  pub fn resolution(&self) -> u32 {
    self.albedo.width()
  }

  pub fn memory_bytes(&self) -> usize {
    self.albedo.as_bytes().len() + self.special.as_bytes().len()
  }
}

/// Barycentric coordinates of the point of triangle `t` closest to `p`, and
/// the distance to it. Works for degenerate triangles.
fn closest_barycentric(p: Vec2, t: [Vec2; 3]) -> (Vec3, f32) {
  let v0 = t[1] - t[0];
  let v1 = t[2] - t[0];
  let v2 = p - t[0];
  let d00 = v0.dot(v0);
  let d01 = v0.dot(v1);
  let d11 = v1.dot(v1);
  let denom = d00 * d11 - d01 * d01;
  if denom.abs() > 1e-12 {
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let u = 1.0 - v - w;
    if u >= 0.0 && v >= 0.0 && w >= 0.0 {
      return (Vec3::new(u, v, w), 0.0);
    }
  }

  // Outside or degenerate: nearest point on the three edges.
  let mut best = (Vec3::new(1.0, 0.0, 0.0), p.distance(t[0]));
  for e in 0..3 {
    let (a, b) = (t[e], t[(e + 1) % 3]);
    let ab = b - a;
    let len2 = ab.length_squared();
    let s = if len2 > 0.0 {
      ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
    } else {
      0.0
    };
    let distance = p.distance(a + ab * s);
    if distance < best.1 {
      let mut bary = Vec3::ZERO;
      bary[e] = 1.0 - s;
      bary[(e + 1) % 3] = s;
      best = (bary, distance);
    }
  }
  best
}

/// Shade every covered texel, then inpaint both images.
#[cfg_attr(feature = "tracing-spans", tracing::instrument(skip_all, name = "texture::synthesize"))]
pub fn synthesize(
  tile: &TilePosition,
  mesh: &TileMesh,
  atlas: &Atlas,
  seeds: &[u32; MATERIAL_SEED_COUNT],
  settings: &TextureSettings,
) -> TileTextures {
  let resolution = atlas.resolution;
  let mut albedo = RgbImage::new(resolution, resolution);
  let mut special = GrayAlphaImage::new(resolution, resolution);
  let material = MaterialField::new(seeds);
  let max_texel = resolution as f32 - 1.0;

  for tri in mesh.indices.chunks_exact(3) {
    let vertices = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize]);
    let corners = vertices.map(|v| Vec2::from_array(v.uv) * resolution as f32);
    let min = (corners[0].min(corners[1]).min(corners[2]) - Vec2::ONE).floor().max(Vec2::ZERO);
    let max = (corners[0].max(corners[1]).max(corners[2]) + Vec2::ONE)
      .floor()
      .min(Vec2::splat(max_texel));

    for y in min.y as u32..=max.y as u32 {
      for x in min.x as u32..=max.x as u32 {
        let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
        let (bary, distance) = closest_barycentric(center, corners);
        if distance > COVERAGE_DISTANCE {
          continue;
        }

        let local = vertices[0].pos() * bary.x + vertices[1].pos() * bary.y + vertices[2].pos() * bary.z;
        let normal = (vertices[0].norm() * bary.x + vertices[1].norm() * bary.y + vertices[2].norm() * bary.z)
          .try_normalize()
          .unwrap_or(Vec3::Y);
        let sample = material.sample(tile.local_to_world(local), normal);

        albedo.put_pixel(x, y, Rgb(sample.albedo.to_array().map(color::to_texel)));
        special.put_pixel(
          x,
          y,
          LumaA([color::to_texel(sample.roughness), color::to_texel(sample.metallic)]),
        );
      }
    }
  }

  let mut textures = TileTextures {
    albedo: DynamicImage::ImageRgb8(albedo),
    special: DynamicImage::ImageLumaA8(special),
  };
  inpaint_dynamic(&mut textures.albedo, settings.inpaint_iterations);
  inpaint_dynamic(&mut textures.special, settings.inpaint_iterations);
  textures
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
