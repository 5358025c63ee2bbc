//! Barrage Metrics - tick timing and counters for the simulation core
//!
//! Everything here compiles to no-op stubs unless the `metrics` feature is
//! enabled, so instrumented call sites cost nothing in release builds.
//!
//! # Usage
//!
//! ```ignore
//! use barrage_metrics::{time_scope, StageProfiler};
//!
//! let mut profiler = StageProfiler::new();
//! let moved = time_scope!(profiler, "velocity", { step_all() });
//! println!("velocity: {:?}", profiler.average("velocity"));
//! ```

#[cfg(feature = "metrics")]
mod counters;
#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod stage_profiler;
#[cfg(feature = "metrics")]
mod tick_timer;

#[cfg(feature = "metrics")]
pub use counters::TickCounters;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;
#[cfg(feature = "metrics")]
pub use stage_profiler::StageProfiler;
#[cfg(feature = "metrics")]
pub use tick_timer::TickTimer;

// ============================================================================
// Macros
// ============================================================================

/// Time a block under a stage name and evaluate to the block's value.
#[macro_export]
macro_rules! time_scope {
    ($profiler:expr, $name:expr, $body:block) => {{
        #[cfg(feature = "metrics")]
        let __result = $profiler.time_stage($name, || $body);
        #[cfg(not(feature = "metrics"))]
        let __result = $body;
        __result
    }};
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
pub struct TickTimer;

#[cfg(not(feature = "metrics"))]
impl TickTimer {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) {}
    pub fn tick_time_ms(&self) -> f64 { 0.0 }
    pub fn tick_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
    pub fn headroom_tps(&self) -> f64 { 0.0 }
}

#[cfg(not(feature = "metrics"))]
pub struct RingBuffer<T>(std::marker::PhantomData<T>);

#[cfg(not(feature = "metrics"))]
impl<T> RingBuffer<T> {
    pub fn new(_capacity: usize) -> Self { Self(std::marker::PhantomData) }
    pub fn push(&mut self, _value: T) {}
}

#[cfg(not(feature = "metrics"))]
pub struct TickCounters;

#[cfg(not(feature = "metrics"))]
impl TickCounters {
    pub fn new(_window: usize) -> Self { Self }
    pub fn increment(&mut self, _name: &'static str, _value: u64) {}
    pub fn set(&mut self, _name: &'static str, _value: u64) {}
    pub fn get(&self, _name: &str) -> u64 { 0 }
    pub fn average(&self, _name: &str) -> f64 { 0.0 }
    pub fn end_tick(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
impl Default for TickCounters {
    fn default() -> Self { Self }
}

#[cfg(not(feature = "metrics"))]
pub struct StageProfiler;

#[cfg(not(feature = "metrics"))]
impl StageProfiler {
    pub fn new() -> Self { Self }
    pub fn with_window(_window: usize) -> Self { Self }
    pub fn time_stage<F, R>(&mut self, _name: &'static str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn average(&self, _name: &str) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn last(&self, _name: &str) -> std::time::Duration { std::time::Duration::ZERO }
}

#[cfg(not(feature = "metrics"))]
impl Default for StageProfiler {
    fn default() -> Self { Self }
}

#[cfg(test)]
mod tests {
    #[test]
    fn time_scope_yields_block_value() {
        let mut profiler = super::StageProfiler::new();
        let doubled = time_scope!(profiler, "double", { 21 * 2 });
        assert_eq!(doubled, 42);
        let mut _timer = super::TickTimer::new(60);
        let mut _counters = super::TickCounters::new(10);
    }
}
