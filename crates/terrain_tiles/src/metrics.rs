//! Terrain statistics: generation and upload timings, tiles per radius level.
//!
//! Feature-gated and runtime-toggled; with the `metrics` feature off every
//! `record_*` call returns immediately.
//!
//! ```ignore
//! use terrain_tiles::metrics::COLLECT_METRICS;
//!
//! // Compile with --features metrics, then toggle at runtime:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! let snapshot = manager.metrics();
//! println!("{:.1} us per tile", snapshot.avg_generation_us());
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Radius levels tracked individually; larger radii share the last bucket.
pub const RADIUS_LEVELS: usize = 16;

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Bucket for a tile radius: `log2(radius)`, clamped.
#[inline]
pub fn radius_level(radius: i32) -> usize {
    (radius.max(1).ilog2() as usize).min(RADIUS_LEVELS - 1)
}

/// Fixed-capacity window over the most recent values.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a value, evicting the oldest when full.
    pub fn push(&mut self, value: T) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Most recent value.
    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl RollingWindow<u64> {
    pub fn sum(&self) -> u64 {
        self.buffer.iter().sum()
    }

    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = self.buffer.iter().min()?;
        let max = self.buffer.iter().max()?;
        Some((*min, *max))
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(128)
    }
}

/// Statistics collected by the tile manager.
#[derive(Debug, Clone)]
pub struct TerrainMetrics {
    /// Live tiles with geometry per radius level (index = log2 radius).
    pub tiles_per_level: [u32; RADIUS_LEVELS],
    /// Triangles per radius level.
    pub triangles_per_level: [u64; RADIUS_LEVELS],
    /// Approximate CPU-side mesh memory of live tiles.
    pub mesh_memory_bytes: u64,

    /// Worker generation times in microseconds.
    pub generation_timings: RollingWindow<u64>,
    /// Dispatch upload times in microseconds.
    pub upload_timings: RollingWindow<u64>,
    pub last_generation_us: u64,
    pub last_upload_us: u64,

    /// Tiles generated with geometry this session.
    pub total_generated: u64,
    /// Tiles whose generation found no surface.
    pub total_empty: u64,
    /// Tiles released back to `Init`.
    pub total_removed: u64,
}

impl Default for TerrainMetrics {
    fn default() -> Self {
        Self {
            tiles_per_level: [0; RADIUS_LEVELS],
            triangles_per_level: [0; RADIUS_LEVELS],
            mesh_memory_bytes: 0,
            generation_timings: RollingWindow::new(128),
            upload_timings: RollingWindow::new(128),
            last_generation_us: 0,
            last_upload_us: 0,
            total_generated: 0,
            total_empty: 0,
            total_removed: 0,
        }
    }
}

impl TerrainMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset gauges and timings. Session totals are kept.
    pub fn reset(&mut self) {
        self.tiles_per_level.fill(0);
        self.triangles_per_level.fill(0);
        self.mesh_memory_bytes = 0;
        self.generation_timings.clear();
        self.upload_timings.clear();
        self.last_generation_us = 0;
        self.last_upload_us = 0;
    }

    /// A worker finished a tile with geometry.
    pub fn record_generated(&mut self, radius: i32, triangles: usize, mesh_bytes: usize, timing_us: u64) {
        if !is_enabled() {
            return;
        }
        let level = radius_level(radius);
        self.tiles_per_level[level] += 1;
        self.triangles_per_level[level] += triangles as u64;
        self.mesh_memory_bytes += mesh_bytes as u64;
        self.generation_timings.push(timing_us);
        self.last_generation_us = timing_us;
        self.total_generated += 1;
    }

    /// A worker found no surface in a tile.
    pub fn record_empty(&mut self, timing_us: u64) {
        if !is_enabled() {
            return;
        }
        self.generation_timings.push(timing_us);
        self.last_generation_us = timing_us;
        self.total_empty += 1;
    }

    pub fn record_upload(&mut self, timing_us: u64) {
        if !is_enabled() {
            return;
        }
        self.upload_timings.push(timing_us);
        self.last_upload_us = timing_us;
    }

    /// A tile left the world. `triangles` and `mesh_bytes` are zero for
    /// empty tiles.
    pub fn record_removed(&mut self, radius: i32, triangles: usize, mesh_bytes: usize) {
        if !is_enabled() {
            return;
        }
        if triangles > 0 {
            let level = radius_level(radius);
            self.tiles_per_level[level] = self.tiles_per_level[level].saturating_sub(1);
            self.triangles_per_level[level] = self.triangles_per_level[level].saturating_sub(triangles as u64);
            self.mesh_memory_bytes = self.mesh_memory_bytes.saturating_sub(mesh_bytes as u64);
        }
        self.total_removed += 1;
    }

    pub fn live_tiles(&self) -> u32 {
        self.tiles_per_level.iter().sum()
    }

    pub fn live_triangles(&self) -> u64 {
        self.triangles_per_level.iter().sum()
    }

    pub fn avg_generation_us(&self) -> f64 {
        self.generation_timings.average()
    }

    pub fn avg_upload_us(&self) -> f64 {
        self.upload_timings.average()
    }

    pub fn mesh_memory_mb(&self) -> f64 {
        self.mesh_memory_bytes as f64 / 1_048_576.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_window() {
        let mut window = RollingWindow::new(3);
        assert!(window.is_empty());

        window.push(10u64);
        window.push(20);
        window.push(30);
        assert_eq!(window.sum(), 60);
        assert_eq!(window.average(), 20.0);

        window.push(40);
        assert_eq!(window.len(), 3);
        assert_eq!(window.average(), 30.0);
        assert_eq!(window.min_max(), Some((20, 40)));
        assert_eq!(window.last(), Some(&40));
    }

    #[test]
    fn test_radius_levels() {
        assert_eq!(radius_level(1), 0);
        assert_eq!(radius_level(4), 2);
        assert_eq!(radius_level(16), 4);
        assert_eq!(radius_level(1 << 30), RADIUS_LEVELS - 1);
    }

    #[test]
    #[cfg(feature = "metrics")]
    fn test_tile_accounting() {
        let mut metrics = TerrainMetrics::new();
        metrics.record_generated(4, 100, 4000, 900);
        metrics.record_generated(4, 50, 2000, 1100);
        metrics.record_generated(16, 10, 400, 500);
        metrics.record_empty(200);

        assert_eq!(metrics.tiles_per_level[2], 2);
        assert_eq!(metrics.tiles_per_level[4], 1);
        assert_eq!(metrics.live_triangles(), 160);
        assert_eq!(metrics.total_generated, 3);
        assert_eq!(metrics.total_empty, 1);
        assert_eq!(metrics.generation_timings.len(), 4);

        metrics.record_removed(4, 100, 4000);
        metrics.record_removed(8, 0, 0);
        assert_eq!(metrics.live_tiles(), 2);
        assert_eq!(metrics.mesh_memory_bytes, 2400);
        assert_eq!(metrics.total_removed, 2);

        metrics.reset();
        assert_eq!(metrics.live_tiles(), 0);
        assert_eq!(metrics.total_generated, 3, "totals survive a reset");
    }
}
