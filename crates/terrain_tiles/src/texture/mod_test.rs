use glam::{DVec3, IVec3};

use super::*;
use crate::config::MeshSettings;
use crate::context::{derive_seeds, SeedStream};
use crate::density::{PlaneDensity, SphereDensity};
use crate::mesh::generate_mesh;

fn seeds() -> [u32; MATERIAL_SEED_COUNT] {
  derive_seeds(21, SeedStream::Material)
}

fn low_density() -> MeshSettings {
  MeshSettings::default()
    .with_cells_per_tile(6)
    .with_texels_per_unit(2.0)
}

#[test]
fn test_closest_barycentric_inside_and_outside() {
  let t = [Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0), Vec2::new(0.0, 4.0)];

  let (bary, distance) = closest_barycentric(Vec2::new(1.0, 1.0), t);
  assert_eq!(distance, 0.0);
  assert!((bary - Vec3::new(0.5, 0.25, 0.25)).abs().max_element() < 1e-6);

  let (bary, distance) = closest_barycentric(Vec2::new(2.0, -1.0), t);
  assert!((distance - 1.0).abs() < 1e-6);
  assert!((bary - Vec3::new(0.5, 0.5, 0.0)).abs().max_element() < 1e-6);

  // Degenerate triangle still resolves to its segment.
  let line = [Vec2::ZERO, Vec2::new(2.0, 0.0), Vec2::new(1.0, 0.0)];
  let (_, distance) = closest_barycentric(Vec2::new(1.0, 0.5), line);
  assert!((distance - 0.5).abs() < 1e-6);
}

/// Every triangle gets shaded texels at its centroid.
#[test]
fn test_every_triangle_is_covered() {
  let tile = TilePosition::new(IVec3::ZERO, 8);
  let (mesh, atlas) = generate_mesh(&tile, &PlaneDensity::new(1.1), &low_density()).expect("plane crosses tile");
  let textures = synthesize(&tile, &mesh, &atlas, &seeds(), &TextureSettings::default());

  assert_eq!(textures.resolution(), atlas.resolution);
  assert_eq!(textures.special.width(), atlas.resolution);
  let albedo = textures.albedo.as_rgb8().expect("albedo is RGB8");
  let special = textures.special.as_luma_alpha8().expect("special is LA8");

  for tri in mesh.indices.chunks_exact(3) {
    let centroid = tri
      .iter()
      .map(|&i| Vec2::from_array(mesh.vertices[i as usize].uv))
      .sum::<Vec2>()
      / 3.0
      * atlas.resolution as f32;
    let (x, y) = (centroid.x as u32, centroid.y as u32);
    assert!(albedo.get_pixel(x, y).0.iter().all(|&c| c != 0), "blank albedo at ({x}, {y})");
    assert!(special.get_pixel(x, y).0.iter().all(|&c| c != 0), "blank special at ({x}, {y})");
  }
}

/// Inpainting grows charts into their padding.
#[test]
fn test_inpainting_fills_padding() {
  let tile = TilePosition::new(IVec3::ZERO, 8);
  let (mesh, atlas) = generate_mesh(&tile, &PlaneDensity::new(1.1), &low_density()).expect("plane crosses tile");

  let raw = synthesize(
    &tile,
    &mesh,
    &atlas,
    &seeds(),
    &TextureSettings::default().with_inpaint_iterations(0),
  );
  let filled = synthesize(&tile, &mesh, &atlas, &seeds(), &TextureSettings::default());

  let count = |image: &DynamicImage| {
    image
      .as_rgb8()
      .map(|img| img.pixels().filter(|p| p.0 != [0, 0, 0]).count())
      .unwrap_or(0)
  };
  assert!(count(&filled.albedo) > count(&raw.albedo));
}

#[test]
fn test_synthesis_is_deterministic() {
  let tile = TilePosition::new(IVec3::new(8, 0, 8), 4);
  let field = SphereDensity::new()
    .with_center(DVec3::new(7.0, 0.5, 6.0))
    .with_radius(3.3);
  let (mesh, atlas) = generate_mesh(&tile, &field, &low_density()).expect("sphere crosses tile");

  let a = synthesize(&tile, &mesh, &atlas, &seeds(), &TextureSettings::default());
  let b = synthesize(&tile, &mesh, &atlas, &seeds(), &TextureSettings::default());
  assert_eq!(a.albedo.as_bytes(), b.albedo.as_bytes());
  assert_eq!(a.special.as_bytes(), b.special.as_bytes());
  assert!(a.memory_bytes() > 0);
}
