//! Collision resolution
//!
//! Cheap per-shape overlap tests against circular query hitboxes, the
//! receiver registry those hitboxes come from, and per-receiver tallies.

mod receiver;
mod shape;

pub use receiver::{CollisionReceiver, ReceiverId, ReceiverProbe, ReceiverRegistry, ResolvedReceiver};
pub use shape::{circle_on_circle, circle_on_rect, circle_on_segment, ColliderShape};

/// Outcome of one overlap test. `graze` is implied by `hit`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionResult {
    pub hit: bool,
    pub graze: bool,
}

impl CollisionResult {
    pub const NONE: Self = Self {
        hit: false,
        graze: false,
    };

    #[inline]
    pub fn new(hit: bool, graze: bool) -> Self {
        Self { hit, graze }
    }
}

/// What a receiver accumulated over one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionReport {
    /// Largest damage of any bullet that hit.
    pub damage: i32,
    pub graze: u32,
    pub hits: u32,
}

impl CollisionReport {
    pub fn record_hit(&mut self, damage: i32) {
        self.damage = if self.hits == 0 {
            damage
        } else {
            self.damage.max(damage)
        };
        self.hits += 1;
    }

    pub fn record_graze(&mut self) {
        self.graze += 1;
    }

    pub fn merge(&mut self, other: &CollisionReport) {
        if other.hits > 0 {
            self.damage = if self.hits == 0 {
                other.damage
            } else {
                self.damage.max(other.damage)
            };
        }
        self.hits += other.hits;
        self.graze += other.graze;
    }

    pub fn is_empty(&self) -> bool {
        self.hits == 0 && self.graze == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_keeps_max_damage_and_sums_graze() {
        let mut a = CollisionReport::default();
        a.record_hit(2);
        a.record_hit(5);
        a.record_graze();

        let mut b = CollisionReport::default();
        b.record_hit(3);
        b.record_graze();
        b.record_graze();

        a.merge(&b);
        assert_eq!(
            a,
            CollisionReport {
                damage: 5,
                graze: 3,
                hits: 3
            }
        );
    }

    #[test]
    fn merging_graze_only_keeps_damage() {
        let mut a = CollisionReport::default();
        a.record_hit(-1);
        let mut b = CollisionReport::default();
        b.record_graze();
        a.merge(&b);
        assert_eq!(a.damage, -1);
        assert!(!a.is_empty());
    }
}
