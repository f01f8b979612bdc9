//! Axis-aligned bounding box with double precision for unbounded worlds.

use glam::DVec3;

/// Double-precision axis-aligned bounding box in world space.
///
/// Tile boxes, collision broad-phase entries and distance queries all use it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DAabb3 {
	/// Minimum corner (inclusive).
	pub min: DVec3,
	/// Maximum corner (inclusive).
	pub max: DVec3,
}

impl DAabb3 {
	/// Create a new AABB from min and max corners.
	///
	/// # Panics
	/// Debug-asserts that min <= max on all axes.
	pub fn new(min: DVec3, max: DVec3) -> Self {
		debug_assert!(
			min.x <= max.x && min.y <= max.y && min.z <= max.z,
			"AABB min must be <= max on all axes"
		);
		Self { min, max }
	}

	/// Create a new AABB from center and half-extents.
	pub fn from_center_half_extents(center: DVec3, half_extents: DVec3) -> Self {
		Self {
			min: center - half_extents,
			max: center + half_extents,
		}
	}

	/// Smallest box containing all points. `None` for an empty iterator.
	pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Option<Self> {
		let mut iter = points.into_iter();
		let first = iter.next()?;
		let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
		Some(Self { min, max })
	}

	/// Check if this AABB contains a point.
	#[inline]
	pub fn contains_point(&self, point: DVec3) -> bool {
		point.x >= self.min.x
			&& point.x <= self.max.x
			&& point.y >= self.min.y
			&& point.y <= self.max.y
			&& point.z >= self.min.z
			&& point.z <= self.max.z
	}

	/// Euclidean distance from a point to the box; zero inside.
	#[inline]
	pub fn distance_to_point(&self, point: DVec3) -> f64 {
		let nearest = point.clamp(self.min, self.max);
		point.distance(nearest)
	}

	/// Get the size of the AABB (max - min).
	#[inline]
	pub fn size(&self) -> DVec3 {
		self.max - self.min
	}

	/// The 8 corners, ordered with bit 0 = X, bit 1 = Y, bit 2 = Z.
	pub fn corners(&self) -> [DVec3; 8] {
		std::array::from_fn(|i| {
			DVec3::new(
				if i & 1 == 0 { self.min.x } else { self.max.x },
				if i & 2 == 0 { self.min.y } else { self.max.y },
				if i & 4 == 0 { self.min.z } else { self.max.z },
			)
		})
	}

	/// Slab test for the segment `origin + t * dir`, `t` in `[0, 1]`.
	///
	/// Returns the entry parameter (0 when the origin is inside).
	pub fn segment_entry(&self, origin: DVec3, dir: DVec3) -> Option<f64> {
		let mut t_min = 0.0f64;
		let mut t_max = 1.0f64;
		for axis in 0..3 {
			let o = origin[axis];
			let d = dir[axis];
			if d.abs() < f64::EPSILON {
				if o < self.min[axis] || o > self.max[axis] {
					return None;
				}
				continue;
			}
			let inv = 1.0 / d;
			let mut t0 = (self.min[axis] - o) * inv;
			let mut t1 = (self.max[axis] - o) * inv;
			if t0 > t1 {
				std::mem::swap(&mut t0, &mut t1);
			}
			t_min = t_min.max(t0);
			t_max = t_max.min(t1);
			if t_min > t_max {
				return None;
			}
		}
		Some(t_min)
	}
}
