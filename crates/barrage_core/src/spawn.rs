//! Per-tick spawn accounting

use crate::math::RngError;
use crate::registry::LookupError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("more than {cap} bullets spawned in one tick; aborting the frame")]
    Overflow { cap: u32 },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("pool '{name}' only accepts bullets handed over by other pools")]
    AuxiliaryPool { name: String },

    #[error("pool '{name}' is not a softcull pool")]
    NotSoftcull { name: String },

    #[error(transparent)]
    Rng(#[from] RngError),
}

/// Guards against runaway scripts by capping spawns per tick. Also hands
/// out bullet uids.
#[derive(Debug, Clone)]
pub struct SpawnSentry {
    cap: u32,
    spawned: u32,
    next_uid: u32,
    tripped: bool,
}

impl SpawnSentry {
    pub fn new(cap: u32) -> Self {
        Self {
            cap,
            spawned: 0,
            next_uid: 1,
            tripped: false,
        }
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    pub fn spawned_this_tick(&self) -> u32 {
        self.spawned
    }

    /// Whether the cap was exceeded since the last reset.
    pub fn tripped(&self) -> bool {
        self.tripped
    }

    pub fn reset_tick(&mut self) {
        self.spawned = 0;
        self.tripped = false;
    }

    /// Count one spawn and issue its uid.
    pub fn admit(&mut self) -> Result<u32, SpawnError> {
        self.spawned += 1;
        if self.spawned > self.cap {
            self.tripped = true;
            return Err(SpawnError::Overflow { cap: self.cap });
        }
        Ok(self.issue_uid())
    }

    /// Issue a uid without counting against the cap. Used for copies that
    /// replace an existing bullet.
    pub fn issue_uid(&mut self) -> u32 {
        let uid = self.next_uid;
        self.next_uid = self.next_uid.wrapping_add(1).max(1);
        uid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_admits_exactly_cap_spawns() {
        let mut sentry = SpawnSentry::new(3);
        for _ in 0..3 {
            assert!(sentry.admit().is_ok());
        }
        assert_eq!(sentry.admit(), Err(SpawnError::Overflow { cap: 3 }));
        assert!(sentry.tripped());

        sentry.reset_tick();
        assert!(!sentry.tripped());
        assert!(sentry.admit().is_ok());
    }

    #[test]
    fn uids_are_unique_and_nonzero() {
        let mut sentry = SpawnSentry::new(10);
        let a = sentry.admit().unwrap();
        let b = sentry.issue_uid();
        assert_ne!(a, b);
        assert_ne!(a, 0);
    }
}
