use crate::pool::Owner;
use glam::Vec2;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Query hitbox exposed by a receiver each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceiverProbe {
    pub position: Vec2,
    pub radius: f32,
    pub graze_radius: f32,
    pub active: bool,
}

/// Anything that can be hit by bullets: the player, an enemy, a shield.
pub trait CollisionReceiver: Send + Sync {
    fn probe(&self) -> ReceiverProbe;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(u32);

impl ReceiverId {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "receiver#{}", self.0)
    }
}

/// A receiver that was alive and active when probed.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedReceiver {
    pub id: ReceiverId,
    pub probe: ReceiverProbe,
}

struct Entry {
    hit_by: Owner,
    receiver: Weak<dyn CollisionReceiver>,
}

/// Weakly held receivers, keyed by id. Owners tear receivers down on their
/// own schedule; dropped ones are skipped and pruned.
#[derive(Default)]
pub struct ReceiverRegistry {
    next_id: u32,
    entries: BTreeMap<ReceiverId, Entry>,
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `receiver` as a target for bullets fired by `hit_by`.
    pub fn register<R>(&mut self, hit_by: Owner, receiver: &Arc<R>) -> ReceiverId
    where
        R: CollisionReceiver + 'static,
    {
        let id = ReceiverId(self.next_id);
        self.next_id += 1;
        let weak: Weak<R> = Arc::downgrade(receiver);
        let weak: Weak<dyn CollisionReceiver> = weak;
        self.entries.insert(
            id,
            Entry {
                hit_by,
                receiver: weak,
            },
        );
        tracing::debug!(%id, ?hit_by, "registered collision receiver");
        id
    }

    pub fn unregister(&mut self, id: ReceiverId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries whose receiver no longer exists.
    pub fn cleanup_destroyed(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, entry| {
            let alive = entry.receiver.strong_count() > 0;
            if !alive {
                tracing::debug!(%id, "pruned destroyed collision receiver");
            }
            alive
        });
        before - self.entries.len()
    }

    /// Probe every live, active receiver hit by `owner`, in id order.
    /// Receivers dropped since registration are skipped.
    pub fn resolve(&self, owner: Owner) -> Vec<ResolvedReceiver> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.hit_by == owner)
            .filter_map(|(id, entry)| {
                let Some(receiver) = entry.receiver.upgrade() else {
                    tracing::warn!(%id, "collision receiver disappeared before use");
                    return None;
                };
                let probe = receiver.probe();
                probe.active.then_some(ResolvedReceiver { id: *id, probe })
            })
            .collect()
    }
}

impl fmt::Debug for ReceiverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiverRegistry")
            .field("receivers", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(ReceiverProbe);

    impl CollisionReceiver for Dummy {
        fn probe(&self) -> ReceiverProbe {
            self.0
        }
    }

    fn dummy(active: bool) -> Arc<Dummy> {
        Arc::new(Dummy(ReceiverProbe {
            position: Vec2::ZERO,
            radius: 0.5,
            graze_radius: 1.0,
            active,
        }))
    }

    #[test]
    fn resolve_filters_by_owner_and_activity() {
        let mut registry = ReceiverRegistry::new();
        let player = dummy(true);
        let boss = dummy(true);
        let ghost = dummy(false);
        let pid = registry.register(Owner::Enemy, &player);
        registry.register(Owner::Player, &boss);
        registry.register(Owner::Enemy, &ghost);

        let hits: Vec<ReceiverId> = registry.resolve(Owner::Enemy).iter().map(|r| r.id).collect();
        assert_eq!(hits, vec![pid]);
    }

    #[test]
    fn dropped_receivers_are_skipped_then_pruned() {
        let mut registry = ReceiverRegistry::new();
        let player = dummy(true);
        registry.register(Owner::Enemy, &player);
        drop(player);

        assert!(registry.resolve(Owner::Enemy).is_empty());
        assert_eq!(registry.cleanup_destroyed(), 1);
        assert!(registry.is_empty());
    }
}
