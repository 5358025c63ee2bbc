//! Simulation tuning knobs

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Camera rectangle used for off-screen culling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraBounds {
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl CameraBounds {
    /// Whether a circle of `radius` at `position` lies entirely off-screen.
    pub fn is_outside(&self, position: Vec2, radius: f32) -> bool {
        let d = (position - self.center).abs();
        d.x > self.half_extents.x + radius || d.y > self.half_extents.y + radius
    }
}

impl Default for CameraBounds {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            half_extents: Vec2::new(7.0, 4.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Maximum spawns accepted per tick before the frame is aborted.
    pub spawn_cap: u32,
    /// Pools with at least this many slots integrate in parallel when they
    /// carry no general hooks.
    pub parallel_threshold: usize,
    /// Upper bound on tombstones tolerated before compaction.
    pub compact_ceiling: usize,
    /// Compact once tombstones exceed `live / compact_divisor`.
    pub compact_divisor: usize,
    pub camera: CameraBounds,
    pub seed: u64,
}

impl SimulationConfig {
    /// Tombstone count above which a store with `live` bullets gets compacted.
    pub fn compaction_threshold(&self, live: usize) -> usize {
        self.compact_ceiling.min(live / self.compact_divisor.max(1))
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            spawn_cap: 10_000,
            parallel_threshold: 16_384,
            compact_ceiling: 2_000,
            compact_divisor: 10,
            camera: CameraBounds::default(),
            seed: 0x5eed,
        }
    }
}
