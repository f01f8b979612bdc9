//! Terrain tile baker.
//!
//! Subcommands:
//! - bake: generate one tile and write its textures, mesh and summary
//! - plan: print the tiles needed around a player position, optionally baking
//!   every visible one in parallel
//! - simulate: drive the tile lifecycle with headless backends while the
//!   player moves, then shut down and drain

mod config;
mod export;
mod headless;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glam::{DVec3, IVec3};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use terrain_tiles::{
	find_needed_tiles, generate_tile, CollisionIndex, CollisionWorld, GenerationStage, TerrainConfig, TileManager,
	TilePosition, WorldGen,
};

use config::Config;
use headless::{HeadlessGpu, HeadlessScene};

/// Procedural terrain tile baker.
#[derive(Parser, Debug)]
#[command(name = "tile_baker")]
#[command(about = "Bakes procedural terrain tiles and simulates the tile lifecycle")]
struct Args {
	/// Path to configuration TOML file.
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// World seed (overrides the config file).
	#[arg(short, long, global = true)]
	seed: Option<u64>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Generate a single tile.
	Bake {
		/// Tile center as x,y,z.
		#[arg(long, value_parser = parse_ivec3, default_value = "0,0,0")]
		center: IVec3,

		/// Tile radius (power of two).
		#[arg(long, default_value_t = 4)]
		radius: i32,

		/// Output directory.
		#[arg(short, long, default_value = "baked")]
		output: PathBuf,
	},

	/// Print the tiles needed around a player.
	Plan {
		/// Player position as x,y,z.
		#[arg(long, value_parser = parse_dvec3, default_value = "0,0,0")]
		player: DVec3,

		/// Bake every visible tile into this directory.
		#[arg(long)]
		bake: Option<PathBuf>,
	},

	/// Run the tile lifecycle with headless backends.
	Simulate {
		/// Starting player position as x,y,z.
		#[arg(long, value_parser = parse_dvec3, default_value = "0,0,0")]
		start: DVec3,

		/// Player velocity in world units per tick, as x,y,z.
		#[arg(long, value_parser = parse_dvec3, default_value = "0.5,0,0")]
		velocity: DVec3,

		/// Number of ticks to run before shutting down.
		#[arg(long, default_value_t = 600)]
		ticks: u32,

		/// Wall time per tick in milliseconds.
		#[arg(long, default_value_t = 16)]
		tick_ms: u64,
	},
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	let config = Config::load(args.config.as_deref())?.into_terrain(args.seed)?;
	log::info!("World seed: {}", config.seed);

	match args.command {
		Command::Bake { center, radius, output } => bake(&config, TilePosition::new(center, radius), &output),
		Command::Plan { player, bake } => plan(&config, player, bake.as_deref()),
		Command::Simulate {
			start,
			velocity,
			ticks,
			tick_ms,
		} => simulate(config, start, velocity, ticks, Duration::from_millis(tick_ms)),
	}
}

fn bake(config: &TerrainConfig, tile: TilePosition, output: &Path) -> Result<()> {
	if tile.radius <= 0 || !(tile.radius as u32).is_power_of_two() {
		bail!("radius must be a positive power of two, got {}", tile.radius);
	}

	let world = WorldGen::from_config(config);
	let Some(payload) = generate_tile(&tile, &world) else {
		println!("Tile {tile} holds no surface, nothing to write");
		return Ok(());
	};

	let dir = output.join(tile.to_string());
	export::write_tile(&dir, &tile, config.seed, &payload).with_context(|| format!("Baking tile {tile}"))?;
	println!(
		"Tile {tile}: {} triangles, {}x{} atlas, {} us",
		payload.mesh.triangle_count(),
		payload.texture_resolution(),
		payload.texture_resolution(),
		payload.generation_us
	);
	println!("Output written to: {}", dir.display());
	Ok(())
}

fn plan(config: &TerrainConfig, player: DVec3, bake_dir: Option<&Path>) -> Result<()> {
	let needed = find_needed_tiles(player, &BTreeSet::new(), &config.hierarchy);
	let visible: Vec<TilePosition> = needed.iter().filter(|t| t.visible).copied().collect();

	for tile in &needed {
		let marker = if tile.visible { "visible" } else { "pending" };
		println!("{:>20}  {marker}", tile.to_string());
	}
	println!("{} tiles needed, {} visible", needed.len(), visible.len());

	let Some(dir) = bake_dir else {
		return Ok(());
	};

	let mut stage = GenerationStage::new(Arc::new(WorldGen::from_config(config)));
	for tile in &visible {
		stage.enqueue(*tile);
	}
	println!("\nGenerating {} tiles...", stage.pending_count());
	stage.tick();

	let mut written = 0;
	let mut empty = 0;
	for completion in stage.drain_completions() {
		let Some(payload) = completion.payload else {
			empty += 1;
			continue;
		};
		let tile = completion.tile;
		export::write_tile(&dir.join(tile.to_string()), &tile, config.seed, &payload)
			.with_context(|| format!("Baking tile {tile}"))?;
		written += 1;
	}

	println!("Done! {written} tiles written, {empty} empty, output in: {}", dir.display());
	Ok(())
}

fn simulate(config: TerrainConfig, start: DVec3, velocity: DVec3, ticks: u32, tick: Duration) -> Result<()> {
	let mut manager = TileManager::from_config(config).context("Starting tile manager")?;
	let mut scene = HeadlessScene::default();
	let mut gpu = HeadlessGpu::default();
	let mut collision = CollisionIndex::new();

	let mut player = start;
	let mut dropped = 0;
	for i in 0..ticks {
		player = start + velocity * i as f64;
		let stats = manager.update(player, &mut scene, &mut collision);
		manager.dispatch(&mut gpu);
		dropped += stats.dropped;

		if i % 60 == 0 {
			log::info!(
				"tick {i}: player {player:.1}, {} requested, {} in flight, {} entities ({} visible)",
				stats.requested,
				manager.in_flight(),
				scene.live(),
				scene.visible()
			);
		}
		std::thread::sleep(tick);
	}

	let ground = collision.cast_segment(player + DVec3::Y * 256.0, player - DVec3::Y * 256.0);
	#[cfg(feature = "metrics")]
	let metrics = manager.metrics();

	manager.shutdown();
	let mut drain_ticks = 0;
	while !manager.is_drained() {
		manager.update(player, &mut scene, &mut collision);
		manager.dispatch(&mut gpu);
		drain_ticks += 1;
	}

	println!("Simulated {ticks} ticks, drained in {drain_ticks}");
	println!("  entities spawned: {} (peak {})", scene.spawned, scene.peak_entities);
	println!("  render objects:   {}", gpu.render_objects);
	println!(
		"  GPU upload:       {:.1} MiB total, {:.1} MiB peak",
		gpu.uploaded_bytes as f64 / 1_048_576.0,
		gpu.peak_bytes as f64 / 1_048_576.0
	);
	println!("  dropped requests: {dropped}");
	match ground {
		Some(point) => println!("  ground under player at y = {:.2}", point.y),
		None => println!("  no ground under player"),
	}
	if scene.live() != 0 || gpu.live_assets() != 0 {
		bail!(
			"drain left {} entities and {} assets behind",
			scene.live(),
			gpu.live_assets()
		);
	}

	#[cfg(feature = "metrics")]
	{
		println!(
			"  generation:       {:.0} us avg over {} tiles, {} empty",
			metrics.avg_generation_us(),
			metrics.total_generated,
			metrics.total_empty
		);
		if let Some((min, max)) = metrics.generation_timings.min_max() {
			println!("  recent tiles:     {min} us fastest, {max} us slowest");
		}
		println!("  upload:           {:.0} us avg", metrics.avg_upload_us());
		println!(
			"  before shutdown:  {} tiles, {} triangles, {:.2} MiB mesh data",
			metrics.live_tiles(),
			metrics.live_triangles(),
			metrics.mesh_memory_mb()
		);
	}

	Ok(())
}

fn parse_components<T: std::str::FromStr>(value: &str) -> Result<[T; 3], String> {
	let parts: Vec<T> = value
		.split(',')
		.map(|part| part.trim().parse::<T>().map_err(|_| format!("invalid component '{part}'")))
		.collect::<Result<_, _>>()?;
	parts
		.try_into()
		.map_err(|_| format!("expected three comma-separated values, got '{value}'"))
}

fn parse_dvec3(value: &str) -> Result<DVec3, String> {
	parse_components::<f64>(value).map(DVec3::from_array)
}

fn parse_ivec3(value: &str) -> Result<IVec3, String> {
	parse_components::<i32>(value).map(IVec3::from_array)
}
