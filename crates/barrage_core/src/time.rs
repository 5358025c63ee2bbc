//! Deterministic time system
//!
//! Fixed 120Hz tick rate. Every bullet advances by [`FRAME_TIME`] per tick
//! unless a time-control hook rescales it.

use std::time::Duration;

/// Fixed simulation tick rate (120 Hz = 8.333ms per tick)
pub const TICK_RATE_HZ: u32 = 120;
pub const TICK_DURATION: Duration = Duration::from_nanos(8_333_333);

/// Seconds of simulated time per tick.
pub const FRAME_TIME: f32 = 1.0 / TICK_RATE_HZ as f32;

/// Simulation time tracker
#[derive(Debug, Clone)]
pub struct SimulationTime {
    tick_count: u64,
    accumulated_time: Duration,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
        self.accumulated_time += TICK_DURATION;
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates_fixed_steps() {
        let mut time = SimulationTime::new();
        for _ in 0..TICK_RATE_HZ {
            time.advance_tick();
        }
        assert_eq!(time.tick_count(), 120);
        let secs = time.total_time().as_secs_f64();
        assert!((secs - 1.0).abs() < 1e-3);
    }
}
