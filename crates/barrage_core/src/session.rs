//! Simulation session
//!
//! Owns everything one running world needs: the pool registry, collision
//! receivers, spawn sentry, RNG and clock. Construct one per stage or
//! replay and drop it (or call [`Session::end`]) when done; nothing
//! survives into the next session.

use crate::bullet::{Bullet, Motion, SpawnParams};
use crate::collision::{CollisionReceiver, ReceiverId, ReceiverRegistry};
use crate::config::SimulationConfig;
use crate::hooks::{Hook, HookError};
use crate::math::{DeterministicRng, RngGate};
use crate::pipeline::{self, StageEnv, TickError, TickReport};
use crate::pool::{BulletPool, Owner, PoolHandle, PoolKind};
use crate::registry::{LookupError, PoolRegistry};
use crate::selector::StyleSelector;
use crate::spawn::{SpawnError, SpawnSentry};
use crate::style::{StyleDescriptor, StyleError, StyleSheet};
use crate::time::SimulationTime;
use barrage_metrics::{time_scope, StageProfiler, TickCounters, TickTimer};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Hook(#[from] HookError),
}

/// Where a spawn request landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawned {
    pub pool: PoolHandle,
    pub index: usize,
    pub uid: u32,
}

pub struct Session {
    config: SimulationConfig,
    registry: PoolRegistry,
    receivers: ReceiverRegistry,
    sentry: SpawnSentry,
    rng: DeterministicRng,
    time: SimulationTime,
    /// Pool whose direct spawn tripped the sentry since the last tick.
    pending_overflow: Option<String>,
    profiler: StageProfiler,
    counters: TickCounters,
    timer: TickTimer,
}

impl Session {
    pub fn new(config: SimulationConfig) -> Self {
        tracing::debug!(seed = config.seed, spawn_cap = config.spawn_cap, "starting session");
        Self {
            registry: PoolRegistry::new(),
            receivers: ReceiverRegistry::new(),
            sentry: SpawnSentry::new(config.spawn_cap),
            rng: DeterministicRng::new(config.seed),
            time: SimulationTime::new(),
            pending_overflow: None,
            profiler: StageProfiler::new(),
            counters: TickCounters::default(),
            timer: TickTimer::new(120),
            config,
        }
    }

    /// New session with every style in `sheet` registered.
    pub fn with_styles(config: SimulationConfig, sheet: &StyleSheet) -> Result<Self, StyleError> {
        let mut session = Self::new(config);
        for style in sheet.expand()? {
            session.register_style(style)?;
        }
        Ok(session)
    }

    pub fn register_style(&mut self, style: StyleDescriptor) -> Result<PoolHandle, StyleError> {
        self.registry.register(style)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    pub fn pool(&self, handle: PoolHandle) -> Option<&BulletPool> {
        self.registry.pool(handle)
    }

    pub fn pool_mut(&mut self, handle: PoolHandle) -> Option<&mut BulletPool> {
        self.registry.pool_mut(handle)
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }

    /// Gate for randomness drawn inside motion functions. Closed while
    /// bullets are integrated in parallel.
    pub fn rng_gate(&self) -> RngGate {
        self.rng.gate()
    }

    pub fn rng_mut(&mut self) -> &mut DeterministicRng {
        &mut self.rng
    }

    pub fn profiler(&self) -> &StageProfiler {
        &self.profiler
    }

    pub fn counters(&self) -> &TickCounters {
        &self.counters
    }

    pub fn timer(&self) -> &TickTimer {
        &self.timer
    }

    // ------------------------------------------------------------------
    // Command surface
    // ------------------------------------------------------------------

    /// Spawn one bullet into `style`, deriving the pool if needed.
    pub fn spawn(&mut self, style: &str, motion: Motion, params: SpawnParams) -> Result<Spawned, SpawnError> {
        let handle = self.registry.get_or_copy(style)?;
        let pool = self
            .registry
            .pool_mut(handle)
            .ok_or(LookupError::Destroyed { handle })?;
        if !pool.kind().accepts_spawns() {
            return Err(SpawnError::AuxiliaryPool {
                name: pool.name().to_string(),
            });
        }
        let uid = match self.sentry.admit() {
            Ok(uid) => uid,
            Err(err) => {
                tracing::error!(pool = pool.name(), cap = self.sentry.cap(), "spawn overflow");
                self.pending_overflow.get_or_insert_with(|| pool.name().to_string());
                return Err(err);
            }
        };
        let index = pool.accept(Bullet::new(params, motion, uid))?;
        Ok(Spawned {
            pool: handle,
            index,
            uid,
        })
    }

    /// Strict lookup: derives the pool if needed and activates it.
    pub fn get_or_copy_pool(&mut self, name: &str) -> Result<PoolHandle, LookupError> {
        self.registry.get_or_copy(name).inspect_err(|err| {
            tracing::warn!(name, %err, "pool lookup failed");
        })
    }

    /// Nullable lookup: placeholder names yield `None`.
    pub fn find_pool(&mut self, name: &str) -> Result<Option<PoolHandle>, LookupError> {
        self.registry.try_get_or_copy(name)
    }

    /// Copy `base` under `new_name` with an empty store.
    pub fn copy_pool(&mut self, base: &str, new_name: &str) -> Result<PoolHandle, LookupError> {
        self.registry.copy(base, new_name)
    }

    /// Attach `hook` to every pool `selector` addresses and activate them.
    pub fn add_control(&mut self, selector: &StyleSelector, hook: Hook) -> Result<Vec<PoolHandle>, LookupError> {
        let handles = self.registry.select(selector)?;
        for &handle in &handles {
            self.registry.activate(handle)?;
            if let Some(pool) = self.registry.pool_mut(handle) {
                pool.add_control(hook.clone());
            }
        }
        Ok(handles)
    }

    /// Ensure `hooks` are attached exactly once to every selected pool.
    /// Returns how many pools received them.
    pub fn assert_controls(&mut self, selector: &StyleSelector, hooks: &[Hook]) -> Result<usize, ControlError> {
        let mut added = 0;
        for handle in self.registry.select(selector)? {
            self.registry.activate(handle)?;
            if let Some(pool) = self.registry.pool_mut(handle) {
                if pool.assert_controls(hooks)? {
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    /// Drop every bullet in every pool. Controls stay attached.
    pub fn clear_all(&mut self) {
        self.registry.clear_all();
    }

    pub fn clear_controls(&mut self) {
        self.registry.clear_controls();
    }

    /// Tear down derived pools and reset the rest. See
    /// [`PoolRegistry::orphan_copies`].
    pub fn orphan_copies(&mut self) -> usize {
        self.registry.orphan_copies()
    }

    /// Replace every live bullet of the selected pools with a jittered copy
    /// in `softcull_style`. Returns the number of bullets converted.
    pub fn soft_cull(&mut self, selector: &StyleSelector, softcull_style: &str) -> Result<usize, SpawnError> {
        let target = self.registry.get_or_copy(softcull_style)?;
        let target_pool = self
            .registry
            .pool(target)
            .ok_or(LookupError::Destroyed { handle: target })?;
        if !matches!(target_pool.kind(), PoolKind::Softcull { .. }) {
            return Err(SpawnError::NotSoftcull {
                name: target_pool.name().to_string(),
            });
        }

        let mut taken = Vec::new();
        for handle in self.registry.select(selector)? {
            let Some(pool) = self.registry.pool_mut(handle) else {
                continue;
            };
            if pool.kind().is_auxiliary() {
                continue;
            }
            let live: Vec<usize> = pool.bullets().iter_live().map(|(idx, _)| idx).collect();
            for idx in live {
                if let Some(bullet) = pool.bullets().try_get(idx).cloned() {
                    taken.push(bullet);
                    // `idx` came from the live iterator above.
                    let _ = pool.delete(idx);
                }
            }
        }

        let count = taken.len();
        let Session {
            registry,
            sentry,
            rng,
            ..
        } = self;
        let pool = registry
            .pool_mut(target)
            .ok_or(LookupError::Destroyed { handle: target })?;
        for mut bullet in taken {
            bullet.id.uid = sentry.issue_uid();
            pool.add_softcull(bullet, rng)?;
        }
        tracing::debug!(target = %target, count, "soft-culled bullets");
        Ok(count)
    }

    /// Register `receiver` as a target for bullets fired by `hit_by`. The
    /// session only holds it weakly.
    pub fn register_receiver<R>(&mut self, hit_by: Owner, receiver: &Arc<R>) -> ReceiverId
    where
        R: CollisionReceiver + 'static,
    {
        self.receivers.register(hit_by, receiver)
    }

    pub fn unregister_receiver(&mut self, id: ReceiverId) -> bool {
        self.receivers.unregister(id)
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Run one fixed step. A spawn overflow aborts the frame: the error is
    /// returned and the remaining stages are skipped, but the clock still
    /// advances and the sentry is reset for the next tick.
    pub fn tick(&mut self) -> Result<TickReport, TickError> {
        self.timer.begin();
        let result = self.run_stages();
        if let Err(err) = &result {
            tracing::error!(tick = self.time.tick_count(), %err, "tick aborted");
        }
        self.sentry.reset_tick();
        self.time.advance_tick();
        self.timer.end();
        self.counters.end_tick();
        result
    }

    fn run_stages(&mut self) -> Result<TickReport, TickError> {
        let mut report = TickReport {
            tick: self.time.tick_count(),
            ..TickReport::default()
        };
        if let Some(pool) = self.pending_overflow.take() {
            return Err(TickError::SpawnOverflow {
                pool,
                cap: self.sentry.cap(),
            });
        }
        self.receivers.cleanup_destroyed();
        report.spawned = self.sentry.spawned_this_tick();

        let order = self.registry.active_in_order();
        report.pools = order.len();
        let Session {
            config,
            registry,
            receivers,
            sentry,
            rng,
            profiler,
            counters,
            ..
        } = self;

        time_scope!(profiler, "prune", {
            pipeline::prune_stage(registry, &order, &mut report)
        });
        let mut env = StageEnv { config, sentry, rng };
        time_scope!(profiler, "velocity", {
            pipeline::velocity_stage(registry, &order, &mut env, &mut report)
        })?;
        time_scope!(profiler, "collision", {
            pipeline::collision_stage(registry, receivers, &order, &mut env, &mut report)
        })?;
        time_scope!(profiler, "compaction", {
            pipeline::compaction_stage(registry, &order, config, &mut report)
        });
        report.spawned = env.sentry.spawned_this_tick();

        counters.increment("spawned", u64::from(report.spawned));
        counters.increment("updated", report.updated as u64);
        counters.increment("destroyed", report.destroyed as u64);
        counters.increment("grazes", report.grazes as u64);
        tracing::trace!(
            tick = report.tick,
            pools = report.pools,
            updated = report.updated,
            hits = report.hits,
            grazes = report.grazes,
            "tick complete"
        );
        Ok(report)
    }

    /// Close the session, returning the final tick count.
    pub fn end(self) -> u64 {
        let ticks = self.time.tick_count();
        tracing::debug!(ticks, pools = self.registry.len(), "session ended");
        ticks
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::ReceiverProbe;
    use crate::hooks::priority;
    use crate::style::{Collider, StyleKind};
    use glam::Vec2;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Target(Mutex<ReceiverProbe>);

    impl Target {
        fn at(position: Vec2, radius: f32, graze_radius: f32) -> Arc<Self> {
            Arc::new(Self(Mutex::new(ReceiverProbe {
                position,
                radius,
                graze_radius,
                active: true,
            })))
        }
    }

    impl CollisionReceiver for Target {
        fn probe(&self) -> ReceiverProbe {
            *self.0.lock().unwrap()
        }
    }

    fn red_session() -> Session {
        let mut session = Session::default();
        session
            .register_style(
                StyleDescriptor::new("red")
                    .collider(Collider::Circle { radius: 1.0 })
                    .fade_out(0.5),
            )
            .unwrap();
        session
    }

    fn spawn_at(session: &mut Session, style: &str, x: f32, y: f32) -> Spawned {
        session
            .spawn(style, Motion::zero(), SpawnParams::at(Vec2::new(x, y)))
            .unwrap()
    }

    fn culled_count(session: &Session, style: &str) -> usize {
        let culled = session.registry().get(style).unwrap().culled_pool().unwrap();
        session.pool(culled).unwrap().live_count()
    }

    #[test]
    fn end_to_end_red_scenario() {
        let mut session = red_session();
        let target = Target::at(Vec2::ZERO, 0.5, 0.5);
        let id = session.register_receiver(Owner::Enemy, &target);

        for i in 0..100 {
            let angle = i as f32 * std::f32::consts::TAU / 100.0;
            let pos = Vec2::from_angle(angle) * 3.0;
            spawn_at(&mut session, "red", pos.x, pos.y);
        }
        let report = session.tick().unwrap();
        assert_eq!(report.hits, 0);
        assert!(report.collisions.is_empty());

        spawn_at(&mut session, "red", 0.0, 0.0);
        let report = session.tick().unwrap();
        assert_eq!(report.hits, 1);
        assert_eq!(report.collisions[&id].hits, 1);
        assert_eq!(report.handed_to_culled, 1);
        assert_eq!(culled_count(&session, "red"), 1);
        assert_eq!(session.registry().get("red").unwrap().live_count(), 100);
    }

    #[test]
    fn spawn_cap_is_exact() {
        let mut session = Session::new(SimulationConfig {
            spawn_cap: 5,
            ..SimulationConfig::default()
        });
        session.register_style(StyleDescriptor::new("red")).unwrap();

        for i in 0..5 {
            spawn_at(&mut session, "red", i as f32, 0.0);
        }
        assert_eq!(
            session.spawn("red", Motion::zero(), SpawnParams::default()),
            Err(SpawnError::Overflow { cap: 5 })
        );
        assert!(matches!(
            session.tick(),
            Err(TickError::SpawnOverflow { cap: 5, .. })
        ));
        // the next tick starts with a fresh budget
        spawn_at(&mut session, "red", 0.0, 1.0);
        assert!(session.tick().is_ok());
    }

    #[test]
    fn hook_spawns_count_toward_the_cap() {
        let mut session = Session::new(SimulationConfig {
            spawn_cap: 3,
            ..SimulationConfig::default()
        });
        session.register_style(StyleDescriptor::new("red")).unwrap();
        for i in 0..2 {
            spawn_at(&mut session, "red", i as f32, 0.0);
        }
        session.tick().unwrap();

        let hook = Hook::new(priority::DEFAULT, |ctx, _| {
            for _ in 0..2 {
                let _ = ctx.spawn(SpawnParams::default(), Motion::zero());
            }
        });
        session.add_control(&"red".into(), hook).unwrap();
        assert!(matches!(
            session.tick(),
            Err(TickError::SpawnOverflow { cap: 3, .. })
        ));
    }

    #[test]
    fn graze_counts_once_every_interval() {
        let mut session = Session::default();
        session
            .register_style(
                StyleDescriptor::new("dot")
                    .collider(Collider::Circle { radius: 0.1 })
                    .graze_every(3),
            )
            .unwrap();
        let target = Target::at(Vec2::ZERO, 0.1, 1.0);
        let id = session.register_receiver(Owner::Enemy, &target);
        spawn_at(&mut session, "dot", 0.5, 0.0);

        let mut grazes = Vec::new();
        for _ in 0..9 {
            let report = session.tick().unwrap();
            grazes.push(report.collisions.get(&id).map_or(0, |r| r.graze));
        }
        assert_eq!(grazes, vec![1, 0, 0, 1, 0, 0, 1, 0, 0]);
    }

    #[test]
    fn destructive_hit_moves_bullet_to_culled_once() {
        let mut session = red_session();
        let target = Target::at(Vec2::ZERO, 0.5, 0.5);
        session.register_receiver(Owner::Enemy, &target);
        let spawned = spawn_at(&mut session, "red", 0.0, 0.0);
        session.pool_mut(spawned.pool).unwrap().bullet_mut(spawned.index).unwrap().age = 3.0;

        let report = session.tick().unwrap();
        assert_eq!(report.destroyed, 1);
        assert_eq!(session.pool(spawned.pool).unwrap().live_count(), 0);

        let culled = session.pool(spawned.pool).unwrap().culled_pool().unwrap();
        let culled_pool = session.pool(culled).unwrap();
        assert_eq!(culled_pool.live_count(), 1);
        let (_, ghost) = culled_pool.bullets().iter_live().next().unwrap();
        assert_eq!(ghost.age, 0.5);

        let report = session.tick().unwrap();
        assert_eq!(report.destroyed, 0);
        assert_eq!(culled_count(&session, "red"), 1);
    }

    #[test]
    fn culled_bullets_fade_out_and_expire() {
        let mut session = red_session();
        let target = Target::at(Vec2::ZERO, 0.5, 0.5);
        session.register_receiver(Owner::Enemy, &target);
        let spawned = spawn_at(&mut session, "red", 0.0, 0.0);
        session.pool_mut(spawned.pool).unwrap().bullet_mut(spawned.index).unwrap().age = 10.0;
        session.tick().unwrap();
        assert_eq!(culled_count(&session, "red"), 1);

        // 0.5s of fade at 120Hz
        for _ in 0..59 {
            session.tick().unwrap();
        }
        assert_eq!(culled_count(&session, "red"), 1);
        session.tick().unwrap();
        session.tick().unwrap();
        assert_eq!(culled_count(&session, "red"), 0);
    }

    #[test]
    fn non_destructible_hit_keeps_bullet() {
        let mut session = Session::default();
        session
            .register_style(
                StyleDescriptor::new("laser")
                    .collider(Collider::Circle { radius: 1.0 })
                    .destructible(false)
                    .damage(3),
            )
            .unwrap();
        let target = Target::at(Vec2::ZERO, 0.5, 0.5);
        let id = session.register_receiver(Owner::Enemy, &target);
        spawn_at(&mut session, "laser", 0.0, 0.0);

        let report = session.tick().unwrap();
        assert_eq!(report.collisions[&id].damage, 3);
        assert_eq!(session.registry().get("laser").unwrap().live_count(), 1);
    }

    #[test]
    fn player_bullets_only_hit_player_targets() {
        let mut session = red_session();
        let boss = Target::at(Vec2::ZERO, 0.5, 0.5);
        let boss_id = session.register_receiver(Owner::Player, &boss);
        let player = Target::at(Vec2::new(2.0, 0.0), 0.5, 0.5);
        session.register_receiver(Owner::Enemy, &player);
        spawn_at(&mut session, "p-red", 0.0, 0.0);

        let report = session.tick().unwrap();
        assert_eq!(report.hits, 1);
        assert!(report.collisions.contains_key(&boss_id));
        assert_eq!(culled_count(&session, "p-red"), 1);
        assert_eq!(culled_count(&session, "red"), 0);
    }

    #[test]
    fn dropped_receivers_are_skipped() {
        let mut session = red_session();
        let target = Target::at(Vec2::ZERO, 0.5, 0.5);
        session.register_receiver(Owner::Enemy, &target);
        drop(target);
        spawn_at(&mut session, "red", 0.0, 0.0);

        let report = session.tick().unwrap();
        assert_eq!(report.hits, 0);
    }

    #[test]
    fn hooks_run_in_priority_order_each_tick() {
        let mut session = red_session();
        spawn_at(&mut session, "red", 0.0, 0.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        for (p, tag) in [(5, "5"), (1, "1a"), (1, "1b"), (9, "9")] {
            let log = Arc::clone(&log);
            let hook = Hook::new(p, move |_, _| log.lock().unwrap().push(tag));
            session.add_control(&"red".into(), hook).unwrap();
        }

        session.tick().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["1a", "1b", "5", "9"]);
    }

    #[test]
    fn deletion_stops_the_bullet_chain() {
        let mut session = red_session();
        spawn_at(&mut session, "red", 0.0, 0.0);
        let late = Arc::new(AtomicUsize::new(0));
        session
            .add_control(&"red".into(), Hook::new(priority::TIME_CONTROL, |ctx, _| {
                let _ = ctx.delete();
            }))
            .unwrap();
        let seen = Arc::clone(&late);
        session
            .add_control(&"red".into(), Hook::new(priority::RUN, move |_, _| {
                seen.fetch_add(1, Ordering::Relaxed);
            }))
            .unwrap();

        let report = session.tick().unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(late.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn time_control_rescales_the_step() {
        let mut session = red_session();
        let spawned = session
            .spawn("red", Motion::linear(Vec2::new(120.0, 0.0)), SpawnParams::default())
            .unwrap();
        session
            .add_control(&"red".into(), Hook::new(priority::TIME_CONTROL, |ctx, _| {
                ctx.set_dt(ctx.dt() * 0.5);
            }))
            .unwrap();

        session.tick().unwrap();
        let bullet = session.pool(spawned.pool).unwrap().bullets().try_get(spawned.index).unwrap();
        assert!((bullet.position.x - 0.5).abs() < 1e-5);
        assert_eq!(bullet.direction, Vec2::X);
    }

    #[test]
    fn mid_tick_spawns_wait_for_next_tick() {
        let mut session = red_session();
        let spawned = session
            .spawn("red", Motion::linear(Vec2::new(120.0, 0.0)), SpawnParams::default())
            .unwrap();
        let hook = Hook::new(priority::DEFAULT, |ctx, _| {
            let _ = ctx.spawn(SpawnParams::default(), Motion::linear(Vec2::new(120.0, 0.0)));
        })
        .once();
        session.add_control(&"red".into(), hook).unwrap();

        let report = session.tick().unwrap();
        assert_eq!(report.updated, 1);
        let pool = session.pool(spawned.pool).unwrap();
        assert_eq!(pool.live_count(), 2);
        assert_eq!(pool.bullets().try_get(1).unwrap().position, Vec2::ZERO);
        assert!(pool.controls().is_empty());
    }

    #[test]
    fn large_hookless_pools_integrate_in_parallel() {
        let mut session = Session::new(SimulationConfig {
            parallel_threshold: 2048,
            ..SimulationConfig::default()
        });
        session.register_style(StyleDescriptor::new("rain")).unwrap();
        for i in 0..2048 {
            session
                .spawn(
                    "rain",
                    Motion::linear(Vec2::new(0.0, -120.0)),
                    SpawnParams::at(Vec2::new(i as f32 * 0.001, 0.0)),
                )
                .unwrap();
        }

        let report = session.tick().unwrap();
        assert_eq!(report.parallel_pools, 1);
        assert_eq!(report.updated, 2048);
        assert!(session.rng_mut().is_allowed());
        let pool = session.registry().get("rain").unwrap();
        for (_, bullet) in pool.bullets().iter_live() {
            assert!((bullet.position.y + 1.0).abs() < 1e-5);
            assert!((bullet.direction - Vec2::NEG_Y).length() < 1e-5);
        }
    }

    #[test]
    fn motion_sees_closed_gate_only_in_parallel() {
        let mut session = Session::new(SimulationConfig {
            parallel_threshold: 2048,
            ..SimulationConfig::default()
        });
        session.register_style(StyleDescriptor::new("rain")).unwrap();
        session.register_style(StyleDescriptor::new("drizzle")).unwrap();
        let closed = Arc::new(AtomicUsize::new(0));
        let motion = {
            let gate = session.rng_gate();
            let closed = Arc::clone(&closed);
            Motion::new(move |_, _| {
                if gate.check().is_err() {
                    closed.fetch_add(1, Ordering::Relaxed);
                }
                Vec2::ZERO
            })
        };
        for _ in 0..2048 {
            session.spawn("rain", motion.clone(), SpawnParams::at(Vec2::ZERO)).unwrap();
        }
        session.spawn("drizzle", motion, SpawnParams::at(Vec2::ZERO)).unwrap();

        let report = session.tick().unwrap();
        assert_eq!(report.parallel_pools, 1);
        assert_eq!(closed.load(Ordering::Relaxed), 2048);
        assert!(session.rng_gate().is_open());
    }

    #[test]
    fn offscreen_bullets_are_culled_on_the_throttle() {
        let mut session = red_session();
        spawn_at(&mut session, "red", 100.0, 0.0);
        spawn_at(&mut session, "red", 0.0, 0.0);

        for _ in 0..127 {
            assert_eq!(session.tick().unwrap().culled_offscreen, 0);
        }
        let report = session.tick().unwrap();
        assert_eq!(report.culled_offscreen, 1);
        assert_eq!(session.registry().get("red").unwrap().live_count(), 1);
        assert_eq!(culled_count(&session, "red"), 0);
    }

    #[test]
    fn soft_cull_replaces_bullets_with_jittered_copies() {
        let mut session = red_session();
        session
            .register_style(StyleDescriptor::new("poof").kind(StyleKind::Softcull {
                ttl: 0.25,
                time_jitter: 0.1,
                rotation_jitter: 30.0,
            }))
            .unwrap();
        for i in 0..4 {
            spawn_at(&mut session, "red", i as f32, 0.0);
        }

        assert_eq!(session.soft_cull(&"red".into(), "poof").unwrap(), 4);
        assert_eq!(session.registry().get("red").unwrap().live_count(), 0);
        let poof = session.registry().get("poof").unwrap();
        assert_eq!(poof.live_count(), 4);
        for (_, bullet) in poof.bullets().iter_live() {
            assert!((0.0..=0.1).contains(&bullet.age));
            let tilt = bullet.direction.y.atan2(bullet.direction.x);
            assert!(tilt.abs() <= 15f32.to_radians() + 1e-4);
        }

        for _ in 0..31 {
            session.tick().unwrap();
        }
        assert_eq!(session.registry().get("poof").unwrap().live_count(), 0);

        assert!(matches!(
            session.soft_cull(&"red".into(), "red"),
            Err(SpawnError::NotSoftcull { .. })
        ));
    }

    #[test]
    fn auxiliary_pools_refuse_direct_spawns() {
        let mut session = red_session();
        assert_eq!(
            session.spawn("$culled_red", Motion::zero(), SpawnParams::default()),
            Err(SpawnError::AuxiliaryPool {
                name: "$culled_red".to_string()
            })
        );
        assert!(matches!(
            session.spawn("blue", Motion::zero(), SpawnParams::default()),
            Err(SpawnError::Lookup(LookupError::UnknownStyle { .. }))
        ));
    }

    #[test]
    fn assert_controls_through_selector() {
        let mut session = red_session();
        session.register_style(StyleDescriptor::new("blue")).unwrap();
        let hooks = [Hook::new(1, |_, _| {}), Hook::new(2, |_, _| {})];
        let sel = StyleSelector::new([["red", "blue"]], false);

        assert_eq!(session.assert_controls(&sel, &hooks), Ok(2));
        assert_eq!(session.assert_controls(&sel, &hooks), Ok(0));
        assert!(matches!(
            session.assert_controls(&sel, &hooks[..1]),
            Ok(0)
        ));
        assert!(matches!(
            session.assert_controls(&sel, &[hooks[0].clone(), Hook::new(3, |_, _| {})]),
            Err(ControlError::Hook(HookError::MalformedAssertion { .. }))
        ));
    }

    #[test]
    fn disposed_controls_stop_running() {
        let mut session = red_session();
        spawn_at(&mut session, "red", 0.0, 0.0);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let hook = Hook::new(priority::DEFAULT, move |_, _| {
            seen.fetch_add(1, Ordering::Relaxed);
        });
        let handle = hook.handle();
        session.add_control(&"red".into(), hook).unwrap();

        session.tick().unwrap();
        handle.dispose().unwrap();
        let report = session.tick().unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(report.pruned_controls, 1);
    }

    #[test]
    fn clear_all_and_orphan_reset_the_world() {
        let mut session = red_session();
        spawn_at(&mut session, "red", 0.0, 0.0);
        spawn_at(&mut session, "red.big", 0.0, 0.0);
        session.add_control(&"red".into(), Hook::new(1, |_, _| {})).unwrap();

        session.clear_all();
        let red = session.registry().get("red").unwrap();
        assert_eq!(red.live_count(), 0);
        assert_eq!(red.controls().len(), 1);

        assert_eq!(session.orphan_copies(), 1);
        assert!(session.registry().get("red.big").is_none());
        assert!(session.registry().get("red").unwrap().controls().is_empty());
        assert_eq!(session.tick().unwrap().pools, 0);
        assert_eq!(session.end(), 1);
    }
}
