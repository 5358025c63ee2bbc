//! Deterministic math utilities
//!
//! Re-exports glam with the vector helpers bullets need, plus the seeded
//! session RNG.

pub use glam::*;

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Squared magnitude below which a delta is too small to take a direction from.
pub const MAG_ERR: f32 = 1e-8;

/// Rotate `v` counter-clockwise by `degrees`.
#[inline]
pub fn rotate_deg(v: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(v)
}

/// Unit vector along `delta`, or `fallback` when `delta` is near zero.
#[inline]
pub fn direction_or(delta: Vec2, fallback: Vec2) -> Vec2 {
    let mag2 = delta.length_squared();
    if mag2 > MAG_ERR {
        delta / mag2.sqrt()
    } else {
        fallback
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RngError {
    #[error("random draws are disallowed while bullets are updated in parallel")]
    Disallowed,
}

/// Open/closed flag shared by every randomness source of a session.
///
/// Motion functions that draw from their own source capture a clone and
/// must not draw while it is closed.
#[derive(Debug, Clone)]
pub struct RngGate(Arc<AtomicBool>);

impl RngGate {
    fn open() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn check(&self) -> Result<(), RngError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(RngError::Disallowed)
        }
    }

    fn set(&self, open: bool) -> bool {
        self.0.swap(open, Ordering::AcqRel)
    }
}

/// Seeded PCG generator owned by a session.
///
/// Draws fail while the gate is closed so a parallel region can never
/// consume randomness in a thread-dependent order. Clones share the gate.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    seed: u64,
    inner: Pcg32,
    gate: RngGate,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: Pcg32::seed_from_u64(seed),
            gate: RngGate::open(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn gate(&self) -> RngGate {
        self.gate.clone()
    }

    pub fn is_allowed(&self) -> bool {
        self.gate.is_open()
    }

    /// Open or close the gate, returning the previous state.
    pub fn set_allowed(&mut self, allowed: bool) -> bool {
        self.gate.set(allowed)
    }

    pub fn next_u32(&mut self) -> Result<u32, RngError> {
        self.gate.check()?;
        Ok(self.inner.next_u32())
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> Result<f32, RngError> {
        self.gate.check()?;
        Ok(self.inner.random::<f32>())
    }

    /// Uniform in `[lo, hi)`; returns `lo` for an empty range.
    pub fn range(&mut self, lo: f32, hi: f32) -> Result<f32, RngError> {
        Ok(lo + (hi - lo) * self.next_f32()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = DeterministicRng::new(7);
        let mut b = DeterministicRng::new(7);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn closed_gate_rejects_draws() {
        let mut rng = DeterministicRng::new(1);
        assert!(rng.set_allowed(false));
        assert_eq!(rng.next_f32(), Err(RngError::Disallowed));
        assert_eq!(rng.gate().check(), Err(RngError::Disallowed));
        rng.set_allowed(true);
        assert!(rng.gate().is_open());
        let x = rng.range(2.0, 3.0).unwrap();
        assert!((2.0..3.0).contains(&x));
    }

    #[test]
    fn direction_falls_back_on_tiny_delta() {
        let prev = Vec2::Y;
        assert_eq!(direction_or(Vec2::splat(1e-6), prev), prev);
        let d = direction_or(Vec2::new(3.0, 4.0), prev);
        assert!((d - Vec2::new(0.6, 0.8)).length() < 1e-6);
    }

    #[test]
    fn rotate_quarter_turn() {
        let v = rotate_deg(Vec2::X, 90.0);
        assert!((v - Vec2::Y).length() < 1e-6);
    }
}
