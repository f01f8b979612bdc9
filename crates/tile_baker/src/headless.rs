//! Backends that only keep books, for running the lifecycle without an engine.

use std::collections::HashMap;

use glam::DAffine3;
use image::DynamicImage;
use terrain_tiles::{AssetId, EntityHandle, GpuBackend, SceneBackend, TextureUsage, TileMesh};

#[derive(Debug, Default)]
pub struct HeadlessScene {
	next: u64,
	/// Live entities and whether a renderable is attached.
	entities: HashMap<EntityHandle, bool>,
	pub spawned: u64,
	pub peak_entities: usize,
}

impl HeadlessScene {
	pub fn live(&self) -> usize {
		self.entities.len()
	}

	pub fn visible(&self) -> usize {
		self.entities.values().filter(|attached| **attached).count()
	}
}

impl SceneBackend for HeadlessScene {
	fn spawn_entity(&mut self, _transform: DAffine3) -> EntityHandle {
		self.next += 1;
		let entity = EntityHandle(self.next);
		self.entities.insert(entity, false);
		self.spawned += 1;
		self.peak_entities = self.peak_entities.max(self.entities.len());
		entity
	}

	fn attach_renderable(&mut self, entity: EntityHandle, _render_object: AssetId) {
		if let Some(attached) = self.entities.get_mut(&entity) {
			*attached = true;
		}
	}

	fn detach_renderable(&mut self, entity: EntityHandle) {
		if let Some(attached) = self.entities.get_mut(&entity) {
			*attached = false;
		}
	}

	fn destroy_entity(&mut self, entity: EntityHandle) {
		if self.entities.remove(&entity).is_none() {
			log::warn!("Destroyed unknown entity {entity:?}");
		}
	}
}

#[derive(Debug, Default)]
pub struct HeadlessGpu {
	/// Live assets and their size in bytes.
	live: HashMap<AssetId, usize>,
	live_bytes: usize,
	pub uploaded_bytes: u64,
	pub peak_bytes: usize,
	pub render_objects: u64,
}

impl HeadlessGpu {
	pub fn live_assets(&self) -> usize {
		self.live.len()
	}

	fn insert(&mut self, id: AssetId, bytes: usize) {
		self.live.insert(id, bytes);
		self.live_bytes += bytes;
		self.uploaded_bytes += bytes as u64;
		self.peak_bytes = self.peak_bytes.max(self.live_bytes);
	}
}

impl GpuBackend for HeadlessGpu {
	fn create_texture(&mut self, id: AssetId, image: &DynamicImage, _usage: TextureUsage) {
		self.insert(id, image.as_bytes().len());
	}

	fn create_mesh(&mut self, id: AssetId, mesh: &TileMesh) {
		self.insert(id, mesh.memory_bytes());
	}

	fn create_render_object(&mut self, id: AssetId, _mesh: AssetId, _textures: [AssetId; 2]) {
		self.insert(id, 0);
		self.render_objects += 1;
	}

	fn release(&mut self, id: AssetId) {
		match self.live.remove(&id) {
			Some(bytes) => self.live_bytes -= bytes,
			None => log::warn!("Released unknown asset {id}"),
		}
	}
}
