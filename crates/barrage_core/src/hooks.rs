//! Controls: priority-ordered hooks attached to a pool
//!
//! Hooks run once per live bullet per tick, split into three bands around
//! velocity integration and direction resolution. Lists are kept sorted at
//! insertion; equal priorities run in insertion order.

use crate::bullet::ParamSnapshot;
use crate::pool::HookContext;
use crate::store::SlotStore;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Well-known priority bands.
pub mod priority {
    pub const SETTINGS: i32 = -20;
    pub const TIME_CONTROL: i32 = -10;
    /// Hooks below this run before velocity integration.
    pub const POST_VELOCITY: i32 = 0;
    pub const DEFAULT: i32 = 20;
    pub const MOVE_1: i32 = 40;
    pub const MOVE_2: i32 = 44;
    pub const MOVE_3: i32 = 46;
    /// Hooks at or above this run after direction resolution.
    pub const POST_DIRECTION: i32 = 100;
    pub const SAVE: i32 = 110;
    pub const RUN: i32 = 130;
    pub const CULL: i32 = 140;
    /// Routed to the on-collision list instead of the general one.
    pub const ON_COLLIDE: i32 = 300;
}

/// Cooperative cancellation flag shared between a hook and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Cancel, returning whether the token was live before this call.
    fn try_cancel(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub type HookAction = Arc<dyn Fn(&mut HookContext<'_>, &CancelToken) + Send + Sync>;
pub type PersistFn = Arc<dyn Fn(&ParamSnapshot) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Hook {
    priority: i32,
    action: HookAction,
    persist: Option<PersistFn>,
    once: bool,
    cancel: CancelToken,
}

impl Hook {
    pub fn new<F>(priority: i32, action: F) -> Self
    where
        F: Fn(&mut HookContext<'_>, &CancelToken) + Send + Sync + 'static,
    {
        Self {
            priority,
            action: Arc::new(action),
            persist: None,
            once: false,
            cancel: CancelToken::new(),
        }
    }

    /// Keep the hook only while `persist` holds for the zeroed snapshot.
    pub fn persist_while<F>(mut self, persist: F) -> Self
    where
        F: Fn(&ParamSnapshot) -> bool + Send + Sync + 'static,
    {
        self.persist = Some(Arc::new(persist));
        self
    }

    /// Run for a single dispatch pass, then drop.
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn is_once(&self) -> bool {
        self.once
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Owning handle that cancels this hook when disposed.
    pub fn handle(&self) -> ControlHandle {
        ControlHandle(self.cancel.clone())
    }

    /// Identity: same action at the same priority.
    pub fn same_as(&self, other: &Hook) -> bool {
        self.priority == other.priority && Arc::ptr_eq(&self.action, &other.action)
    }

    pub(crate) fn invoke(&self, ctx: &mut HookContext<'_>) {
        (self.action)(ctx, &self.cancel);
    }

    fn expired(&self) -> bool {
        self.cancel.is_cancelled()
            || self
                .persist
                .as_ref()
                .is_some_and(|persist| !persist(&ParamSnapshot::default()))
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("priority", &self.priority)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Cancels its hook on disposal. Several handles may share one hook; only
/// the first disposal succeeds.
#[derive(Debug)]
pub struct ControlHandle(CancelToken);

impl ControlHandle {
    pub fn dispose(self) -> Result<(), HookError> {
        if self.0.try_cancel() {
            Ok(())
        } else {
            Err(HookError::AlreadyDisposed)
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.0.is_cancelled()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("malformed control assertion on '{pool}': {present} of {total} controls already present")]
    MalformedAssertion {
        pool: String,
        present: usize,
        total: usize,
    },
    #[error("control already disposed")]
    AlreadyDisposed,
}

/// Sorted hook collection backed by a [`SlotStore`].
#[derive(Debug, Clone, Default)]
pub struct HookList {
    hooks: SlotStore<Hook>,
}

impl HookList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, including hooks pruned since the last compaction.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.live_count() == 0
    }

    /// Insert after every hook with priority `<= hook.priority()`.
    pub fn add(&mut self, hook: Hook) {
        let at = self.partition(|p| p <= hook.priority);
        // `at <= len` always holds, so insertion cannot fail.
        let _ = self.hooks.insert(at, hook);
    }

    /// Index of the first hook with priority `>= priority`.
    pub fn first_at_or_above(&self, priority: i32) -> usize {
        self.partition(|p| p < priority)
    }

    fn partition(&self, below: impl Fn(i32) -> bool) -> usize {
        let (mut lo, mut hi) = (0, self.hooks.len());
        while lo < hi {
            let mid = (lo + hi) / 2;
            match self.hooks.get(mid) {
                Ok(hook) if below(hook.priority) => lo = mid + 1,
                _ => hi = mid,
            }
        }
        lo
    }

    pub fn get(&self, idx: usize) -> Option<&Hook> {
        self.hooks.try_get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hook> + '_ {
        self.hooks.iter_live().map(|(_, hook)| hook)
    }

    pub fn contains(&self, hook: &Hook) -> bool {
        self.iter().any(|h| h.same_as(hook))
    }

    /// Drop cancelled hooks and hooks whose persistence predicate fails.
    /// Returns the number removed.
    pub fn prune(&mut self) -> usize {
        self.remove_where(Hook::expired)
    }

    /// Post-dispatch prune: also retires one-shot hooks.
    pub fn end_pass(&mut self) -> usize {
        self.remove_where(|hook| hook.once || hook.expired())
    }

    fn remove_where(&mut self, doomed: impl Fn(&Hook) -> bool) -> usize {
        let expired: Vec<usize> = self
            .hooks
            .iter_live()
            .filter(|(_, hook)| doomed(hook))
            .map(|(idx, _)| idx)
            .collect();
        for &idx in &expired {
            // Indices come from the live iterator above.
            let _ = self.hooks.delete(idx);
        }
        self.hooks.compact();
        expired.len()
    }

    pub fn clear(&mut self) {
        self.hooks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(priority: i32) -> Hook {
        Hook::new(priority, |_, _| {})
    }

    fn priorities(list: &HookList) -> Vec<i32> {
        list.iter().map(Hook::priority).collect()
    }

    #[test]
    fn equal_priorities_keep_insertion_order() {
        let mut list = HookList::new();
        let a = noop(1);
        let b = noop(1);
        list.add(noop(5));
        list.add(a.clone());
        list.add(b.clone());
        list.add(noop(9));

        assert_eq!(priorities(&list), vec![1, 1, 5, 9]);
        assert!(list.get(0).unwrap().same_as(&a));
        assert!(list.get(1).unwrap().same_as(&b));
    }

    #[test]
    fn band_boundaries() {
        let mut list = HookList::new();
        for p in [priority::TIME_CONTROL, priority::DEFAULT, priority::MOVE_1, priority::RUN] {
            list.add(noop(p));
        }
        assert_eq!(list.first_at_or_above(priority::POST_VELOCITY), 1);
        assert_eq!(list.first_at_or_above(priority::POST_DIRECTION), 3);
        assert_eq!(list.first_at_or_above(priority::ON_COLLIDE), 4);
    }

    #[test]
    fn prune_removes_cancelled_and_non_persisting() {
        let mut list = HookList::new();
        let cancelled = noop(1);
        cancelled.cancel_token().cancel();
        list.add(cancelled);
        list.add(noop(2).persist_while(|_| false));
        list.add(noop(3));

        assert_eq!(list.prune(), 2);
        assert_eq!(priorities(&list), vec![3]);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn one_shot_survives_until_end_of_pass() {
        let mut list = HookList::new();
        list.add(noop(2).once());
        list.add(noop(3));

        assert_eq!(list.prune(), 0);
        assert_eq!(list.end_pass(), 1);
        assert_eq!(priorities(&list), vec![3]);
    }

    #[test]
    fn persist_sees_zeroed_snapshot() {
        let mut list = HookList::new();
        list.add(noop(1).persist_while(|s| s.age == 0.0 && s.id.uid == 0));
        assert_eq!(list.prune(), 0);
    }

    #[test]
    fn disposed_handle_cancels_hook() {
        let hook = noop(4);
        let handle = hook.handle();
        assert!(!handle.is_disposed());
        assert_eq!(handle.dispose(), Ok(()));
        assert!(hook.cancel_token().is_cancelled());
    }

    #[test]
    fn second_dispose_is_reported() {
        let hook = noop(4);
        let first = hook.handle();
        let second = hook.handle();
        assert_eq!(first.dispose(), Ok(()));
        assert_eq!(second.dispose(), Err(HookError::AlreadyDisposed));

        // a hook cancelled from its own token counts as disposed
        let cancelled = noop(5);
        cancelled.cancel_token().cancel();
        assert_eq!(cancelled.handle().dispose(), Err(HookError::AlreadyDisposed));
    }
}
