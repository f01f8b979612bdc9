use glam::{DVec3, IVec3};

use super::*;
use crate::density::{ConstantDensity, NoiseDensity, PlaneDensity, SphereDensity};

#[test]
fn test_constant_density_yields_no_mesh() {
  let tile = TilePosition::new(IVec3::new(32, 0, -32), 16);
  let settings = MeshSettings::default();
  assert!(generate_mesh(&tile, &ConstantDensity(-3.0), &settings).is_none());
  assert!(generate_mesh(&tile, &ConstantDensity(3.0), &settings).is_none());
}

/// Surface only inside the apron gets clipped away entirely.
#[test]
fn test_surface_in_apron_only_is_empty() {
  let tile = TilePosition::new(IVec3::ZERO, 8);
  let settings = MeshSettings::default().with_cells_per_tile(8);
  // Cells are 2 units; the plane sits one cell above the tile top.
  let field = PlaneDensity::new(9.0);
  assert!(generate_mesh(&tile, &field, &settings).is_none());
}

#[test]
fn test_plane_tile_is_complete() {
  let tile = TilePosition::new(IVec3::ZERO, 8);
  let settings = MeshSettings::default().with_cells_per_tile(8);
  let (mesh, atlas) = generate_mesh(&tile, &PlaneDensity::new(0.7), &settings).expect("plane crosses the tile");

  assert!(atlas.resolution >= 16);
  assert!(mesh.bounds.min.x <= -1.0 + 1e-6 && mesh.bounds.max.x >= 1.0 - 1e-6);
  assert!(mesh.bounds.min.z <= -1.0 + 1e-6 && mesh.bounds.max.z >= 1.0 - 1e-6);

  // Area of the flat square [-1, 1]^2 is 4.
  let area: f32 = (0..mesh.triangle_count())
    .map(|t| {
      let [a, b, c] = mesh.triangle(t);
      (b - a).cross(c - a).length() * 0.5
    })
    .sum();
  assert!((area - 4.0).abs() < 1e-3, "plane area {area}");
}

/// World positions of the vertices lying on the local face `x`.
fn face_vertices(mesh: &TileMesh, tile: &TilePosition, x: f32) -> Vec<DVec3> {
  mesh
    .vertices
    .iter()
    .filter(|v| v.position[0] == x)
    .map(|v| tile.local_to_world(v.pos()))
    .collect()
}

/// Checks that the +X face of `left` and the -X face of `right` carry the same
/// vertices, in both directions. Returns the number of face vertices.
fn assert_shared_face(left: (&TilePosition, &TileMesh), right: (&TilePosition, &TileMesh)) -> usize {
  let tolerance = 2.5e-5 * left.0.radius as f64;
  let left_face = face_vertices(left.1, left.0, 1.0);
  let right_face = face_vertices(right.1, right.0, -1.0);

  for (from, to) in [(&left_face, &right_face), (&right_face, &left_face)] {
    for p in from {
      let nearest = to.iter().map(|q| q.distance(*p)).fold(f64::INFINITY, f64::min);
      assert!(nearest < tolerance, "face vertex {p} has no partner (nearest {nearest})");
    }
  }
  left_face.len()
}

/// Neighbors of equal radius agree on their shared face.
#[test]
fn test_adjacent_tiles_share_face_vertices() {
  let settings = MeshSettings::default();
  let field = SphereDensity::new()
    .with_center(DVec3::new(8.3, 1.7, -0.6))
    .with_radius(5.9);
  let left = TilePosition::new(IVec3::new(4, 0, 0), 4);
  let right = TilePosition::new(IVec3::new(12, 0, 0), 4);

  let (left_mesh, _) = generate_mesh(&left, &field, &settings).expect("sphere crosses left tile");
  let (right_mesh, _) = generate_mesh(&right, &field, &settings).expect("sphere crosses right tile");

  let shared = assert_shared_face((&left, &left_mesh), (&right, &right_mesh));
  assert!(shared > 0, "fixture must cross the shared face");
}

#[test]
fn test_noise_neighbors_share_face_vertices() {
  let settings = MeshSettings::default();
  let field = NoiseDensity::new(21, 22);

  let mut shared = 0;
  for y in -4..4 {
    for z in -2..2 {
      let left = TilePosition::new(IVec3::new(0, y * 16, z * 16), 8);
      let right = TilePosition::new(IVec3::new(16, y * 16, z * 16), 8);
      let (Some((left_mesh, _)), Some((right_mesh, _))) = (
        generate_mesh(&left, &field, &settings),
        generate_mesh(&right, &field, &settings),
      ) else {
        continue;
      };
      shared += assert_shared_face((&left, &left_mesh), (&right, &right_mesh));
    }
  }
  assert!(shared > 0, "noise terrain never crossed a shared face");
}

#[test]
fn test_noise_tiles_satisfy_mesh_invariants() {
  let settings = MeshSettings::default();
  let field = NoiseDensity::new(7, 8);
  let mut meshed = 0;
  for x in -2..=2 {
    for y in -1..=1 {
      let tile = TilePosition::new(IVec3::new(x * 8, y * 8, 0), 4);
      let Some((mesh, atlas)) = generate_mesh(&tile, &field, &settings) else {
        continue;
      };
      meshed += 1;
      assert!(atlas.resolution <= settings.max_texture_resolution);
      assert_eq!(mesh.indices.len() % 3, 0);
      for v in &mesh.vertices {
        assert!(v.position.iter().all(|c| (-1.0..=1.0).contains(c)));
        assert!(v.uv.iter().all(|c| (0.0..=1.0).contains(c)));
        assert!((v.norm().length() - 1.0).abs() < 1e-4);
      }
    }
  }
  assert!(meshed > 0, "noise field should cross at least one tile");
}
