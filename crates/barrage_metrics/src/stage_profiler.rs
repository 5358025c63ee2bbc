//! Rolling per-stage timings

use super::ring_buffer::RingBuffer;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub struct StageProfiler {
    window: usize,
    stages: BTreeMap<&'static str, RingBuffer<Duration>>,
}

impl StageProfiler {
    pub fn new() -> Self {
        Self::with_window(120)
    }

    /// Keep the last `window` samples per stage.
    pub fn with_window(window: usize) -> Self {
        Self {
            window,
            stages: BTreeMap::new(),
        }
    }

    pub fn time_stage<F, R>(&mut self, name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        let window = self.window;
        self.stages
            .entry(name)
            .or_insert_with(|| RingBuffer::new(window))
            .push(elapsed);
        result
    }

    /// Average over the window, zero for unknown stages.
    pub fn average(&self, name: &str) -> Duration {
        self.stages
            .get(name)
            .map(|samples| samples.average())
            .unwrap_or(Duration::ZERO)
    }

    pub fn last(&self, name: &str) -> Duration {
        self.stages
            .get(name)
            .and_then(RingBuffer::last)
            .unwrap_or(Duration::ZERO)
    }

    pub fn reset(&mut self) {
        self.stages.clear();
    }

    /// Stage averages in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Duration)> + '_ {
        self.stages.iter().map(|(name, samples)| (*name, samples.average()))
    }
}

impl Default for StageProfiler {
    fn default() -> Self {
        Self::new()
    }
}
