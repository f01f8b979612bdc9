use super::*;

#[test]
fn test_defaults_are_valid() {
  let config = TerrainConfig::default();
  assert!(config.validate().is_ok());
  assert_eq!(config.hierarchy.root_radius(), 16);
  assert_eq!(config.mesh.samples_per_axis(), 12 + 1 + 4);
  assert_eq!(config.manager.slot_count, 4096);
}

#[test]
fn test_empty_toml_gives_defaults() {
  let config: TerrainConfig = toml::from_str("").expect("empty document parses");
  assert_eq!(config, TerrainConfig::default());
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
  let config: TerrainConfig = toml::from_str(
    r#"
seed = 77

[hierarchy]
root_range = 1

[manager]
worker_threads = 3
"#,
  )
  .expect("partial document parses");

  assert_eq!(config.seed, 77);
  assert_eq!(config.hierarchy.root_range, 1);
  assert_eq!(config.hierarchy.root_tile_size, 32);
  assert_eq!(config.manager.worker_count(), 3);
  assert_eq!(config.mesh, MeshSettings::default());
}

#[test]
fn test_toml_round_trip() {
  let config = TerrainConfig::default()
    .with_seed(9)
    .with_mesh(MeshSettings::default().with_cells_per_tile(8));
  let text = toml::to_string(&config).expect("serializes");
  let back: TerrainConfig = toml::from_str(&text).expect("parses back");
  assert_eq!(back, config);
}

#[test]
fn test_rejects_non_power_of_two_root() {
  let config = TerrainConfig::default()
    .with_hierarchy(HierarchyConfig::default().with_root_tile_size(24));
  assert_eq!(
    config.validate(),
    Err(ConfigError::NotPowerOfTwo {
      field: "hierarchy.root_tile_size",
      value: 24
    })
  );
}

#[test]
fn test_rejects_min_radius_above_root() {
  let hierarchy = HierarchyConfig::default()
    .with_root_tile_size(16)
    .with_min_radius(16);
  assert!(matches!(
    hierarchy.validate(),
    Err(ConfigError::MinRadiusTooLarge { .. })
  ));
}

#[test]
fn test_rejects_zero_counts() {
  let manager = ManagerConfig::default().with_slot_count(0);
  assert!(manager.validate().is_err());

  let manager = ManagerConfig::default().with_max_uploads_per_dispatch(0);
  assert!(manager.validate().is_err());

  let mesh = MeshSettings::default().with_cells_per_tile(1);
  assert!(mesh.validate().is_err());
}

#[test]
fn test_rejects_bad_texel_density() {
  let mesh = MeshSettings::default().with_texels_per_unit(0.0);
  assert!(matches!(mesh.validate(), Err(ConfigError::NotPositive { .. })));

  let mesh = MeshSettings::default().with_texels_per_unit(f32::NAN);
  assert!(mesh.validate().is_err());
}

#[test]
fn test_atlas_cap_must_fit_one_chart() {
  let mesh = MeshSettings::default()
    .with_chart_padding(8)
    .with_max_texture_resolution(16);
  assert_eq!(
    mesh.validate(),
    Err(ConfigError::TooSmall {
      field: "mesh.max_texture_resolution",
      min: 20,
      value: 16,
    })
  );
}

#[test]
fn test_worker_count_never_zero() {
  assert!(ManagerConfig::default().worker_count() >= 1);
}
