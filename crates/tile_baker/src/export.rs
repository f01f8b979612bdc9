//! Writing generated tiles to disk.
//!
//! Each tile becomes a directory holding:
//! - albedo.png: RGB8 color atlas
//! - special.png: LA8, L=roughness, A=metallic
//! - mesh.obj + tile.mtl: world-space positions, normals and atlas UVs
//! - tile.json: summary

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use terrain_tiles::{TileMesh, TilePayload, TilePosition};

/// Contents of tile.json.
#[derive(Debug, Serialize)]
pub struct TileSummary {
	pub name: String,
	pub center: [i32; 3],
	pub radius: i32,
	pub seed: u64,
	pub vertices: usize,
	pub triangles: usize,
	pub texture_resolution: u32,
	pub generation_us: u64,
}

impl TileSummary {
	pub fn new(tile: &TilePosition, seed: u64, payload: &TilePayload) -> Self {
		Self {
			name: tile.to_string(),
			center: tile.center.to_array(),
			radius: tile.radius,
			seed,
			vertices: payload.mesh.vertices.len(),
			triangles: payload.mesh.triangle_count(),
			texture_resolution: payload.texture_resolution(),
			generation_us: payload.generation_us,
		}
	}
}

/// Write all files for one tile into `dir`, creating it if needed.
pub fn write_tile(dir: &Path, tile: &TilePosition, seed: u64, payload: &TilePayload) -> Result<()> {
	std::fs::create_dir_all(dir)
		.with_context(|| format!("Failed to create output dir: {}", dir.display()))?;

	let albedo = dir.join("albedo.png");
	payload
		.textures
		.albedo
		.save(&albedo)
		.with_context(|| format!("Failed to write: {}", albedo.display()))?;
	let special = dir.join("special.png");
	payload
		.textures
		.special
		.save(&special)
		.with_context(|| format!("Failed to write: {}", special.display()))?;

	let obj = dir.join("mesh.obj");
	let file = File::create(&obj).with_context(|| format!("Failed to create: {}", obj.display()))?;
	let mut writer = BufWriter::new(file);
	write_obj(&mut writer, tile, &payload.mesh)?;
	writer
		.flush()
		.with_context(|| format!("Failed to write: {}", obj.display()))?;

	let mtl = dir.join("tile.mtl");
	std::fs::write(&mtl, "newmtl terrain\nmap_Kd albedo.png\n")
		.with_context(|| format!("Failed to write: {}", mtl.display()))?;

	let json = dir.join("tile.json");
	let summary = serde_json::to_string_pretty(&TileSummary::new(tile, seed, payload))?;
	std::fs::write(&json, summary).with_context(|| format!("Failed to write: {}", json.display()))?;

	Ok(())
}

/// Wavefront OBJ with positions transformed into world space.
pub fn write_obj(out: &mut impl Write, tile: &TilePosition, mesh: &TileMesh) -> Result<()> {
	writeln!(out, "# tile {tile}")?;
	writeln!(out, "mtllib tile.mtl")?;
	writeln!(out, "usemtl terrain")?;
	for v in &mesh.vertices {
		let p = tile.local_to_world(v.pos());
		writeln!(out, "v {:.6} {:.6} {:.6}", p.x, p.y, p.z)?;
	}
	for v in &mesh.vertices {
		let [x, y, z] = v.normal;
		writeln!(out, "vn {x:.6} {y:.6} {z:.6}")?;
	}
	for v in &mesh.vertices {
		// OBJ texture space has its origin at the bottom left.
		writeln!(out, "vt {:.6} {:.6}", v.uv[0], 1.0 - v.uv[1])?;
	}
	for tri in mesh.indices.chunks_exact(3) {
		let [a, b, c] = [tri[0] + 1, tri[1] + 1, tri[2] + 1];
		writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
	}
	Ok(())
}
