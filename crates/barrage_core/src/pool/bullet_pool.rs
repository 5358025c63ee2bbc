use super::{HookContext, Owner, PoolHandle, PoolKind, RenderBatches};
use crate::bullet::Bullet;
use crate::collision::{ColliderShape, CollisionReport, ResolvedReceiver};
use crate::config::SimulationConfig;
use crate::hooks::{priority, Hook, HookError, HookList};
use crate::math::{rotate_deg, DeterministicRng, RngError, Vec4};
use crate::pipeline::{StageEnv, TickError};
use crate::spawn::SpawnError;
use crate::store::{SlotStore, StoreError};
use crate::style::{Recolor, StyleDescriptor, StyleOverrides};
use crate::time::FRAME_TIME;
use rayon::prelude::*;
use std::ops::Range;

/// Bullets per rayon task during parallel integration.
const PAR_CHUNK: usize = 1024;

/// Camera culling runs when the per-bullet counter hits a multiple of 128.
const CULL_EVERY_MASK: u16 = 127;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct UpdateStats {
    pub updated: usize,
    pub deleted: usize,
    pub parallel: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CollideStats {
    pub hits: usize,
    pub grazes: usize,
    pub destroyed: usize,
    pub culled: usize,
}

/// One style's bullets, controls and metadata.
#[derive(Debug)]
pub struct BulletPool {
    name: String,
    style: StyleDescriptor,
    kind: PoolKind,
    owner: Owner,
    shape: ColliderShape,
    bullets: SlotStore<Bullet>,
    controls: HookList,
    collide_controls: HookList,
    origin: Option<PoolHandle>,
    culled: Option<PoolHandle>,
    culled_outbox: Vec<Bullet>,
    active: bool,
    temp_last: usize,
}

impl BulletPool {
    pub(crate) fn new(style: StyleDescriptor, owner: Owner) -> Self {
        let kind = PoolKind::from(style.kind);
        Self::with_kind(style, kind, owner, None)
    }

    /// Fade-out collection for `base`, named `name`.
    pub(crate) fn new_culled(name: String, base: &StyleDescriptor, owner: Owner) -> Self {
        let style = base.clone_with(StyleOverrides::new().name(name));
        let kind = PoolKind::Culled {
            fade_out: base.fade_out_time,
        };
        Self::with_kind(style, kind, owner, None)
    }

    /// Copy metadata under `name` with a fresh, empty store. The copy shares
    /// this pool's fade-out collection until told otherwise.
    pub(crate) fn derive(&self, name: String, owner: Owner, origin: PoolHandle) -> Self {
        let style = self.style.clone_with(StyleOverrides::new().name(name));
        let mut copy = Self::with_kind(style, self.kind, owner, Some(origin));
        copy.culled = self.culled;
        copy
    }

    fn with_kind(style: StyleDescriptor, kind: PoolKind, owner: Owner, origin: Option<PoolHandle>) -> Self {
        Self {
            name: style.name.clone(),
            shape: ColliderShape::from(style.collider),
            style,
            kind,
            owner,
            bullets: SlotStore::new(),
            controls: HookList::new(),
            collide_controls: HookList::new(),
            origin,
            culled: None,
            culled_outbox: Vec::new(),
            active: false,
            temp_last: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn style(&self) -> &StyleDescriptor {
        &self.style
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn is_copy(&self) -> bool {
        self.origin.is_some()
    }

    /// Pool this one was copied from. May refer to a destroyed pool.
    pub fn origin(&self) -> Option<PoolHandle> {
        self.origin
    }

    pub fn culled_pool(&self) -> Option<PoolHandle> {
        self.culled
    }

    pub(crate) fn set_culled_pool(&mut self, culled: Option<PoolHandle>) {
        self.culled = culled;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn bullets(&self) -> &SlotStore<Bullet> {
        &self.bullets
    }

    pub fn live_count(&self) -> usize {
        self.bullets.live_count()
    }

    pub fn controls(&self) -> &HookList {
        &self.controls
    }

    pub fn collide_controls(&self) -> &HookList {
        &self.collide_controls
    }

    /// Append a freshly spawned bullet.
    pub(crate) fn accept(&mut self, bullet: Bullet) -> Result<usize, SpawnError> {
        if !self.kind.accepts_spawns() {
            return Err(SpawnError::AuxiliaryPool {
                name: self.name.clone(),
            });
        }
        Ok(self.bullets.append(bullet))
    }

    pub fn delete(&mut self, idx: usize) -> Result<(), StoreError> {
        self.bullets.delete(idx)
    }

    pub fn bullet_mut(&mut self, idx: usize) -> Option<&mut Bullet> {
        self.bullets.try_get_mut(idx)
    }

    /// Attach a hook. Hooks at exactly the on-collide priority go to the
    /// on-collision list.
    pub fn add_control(&mut self, hook: Hook) {
        if hook.priority() == priority::ON_COLLIDE {
            self.collide_controls.add(hook);
        } else {
            self.controls.add(hook);
        }
    }

    /// Ensure `hooks` are attached exactly once. Returns whether they were
    /// added by this call. A partial match across either list is an error
    /// and leaves the pool untouched.
    pub fn assert_controls(&mut self, hooks: &[Hook]) -> Result<bool, HookError> {
        let present = hooks
            .iter()
            .filter(|h| {
                if h.priority() == priority::ON_COLLIDE {
                    self.collide_controls.contains(h)
                } else {
                    self.controls.contains(h)
                }
            })
            .count();
        if present == hooks.len() {
            return Ok(false);
        }
        if present > 0 {
            return Err(HookError::MalformedAssertion {
                pool: self.name.clone(),
                present,
                total: hooks.len(),
            });
        }
        for hook in hooks {
            self.add_control(hook.clone());
        }
        Ok(true)
    }

    pub fn clear_controls(&mut self) {
        self.controls.clear();
        self.collide_controls.clear();
    }

    /// Drop every bullet. Controls are kept.
    pub fn reset(&mut self) {
        self.bullets.clear();
        self.culled_outbox.clear();
        self.temp_last = 0;
    }

    pub fn set_tint(&mut self, tint: Vec4) {
        self.style.tint.tint = tint;
    }

    pub fn recolor(&mut self, recolor: Option<Recolor>) {
        self.style.tint.recolor = recolor;
    }

    pub fn render_batches(&self) -> RenderBatches<'_> {
        if self.kind == PoolKind::Empty {
            return RenderBatches::empty(&self.bullets);
        }
        let tint = &self.style.tint;
        RenderBatches::new(&self.bullets, tint.tint.to_array(), tint.is_tinted())
    }

    /// Take over a destroyed bullet for fade-out. Its age becomes the
    /// remaining fade time, clamped to the fade-out duration.
    pub(crate) fn add_culled(&mut self, mut bullet: Bullet) -> bool {
        let PoolKind::Culled { fade_out } = self.kind else {
            return false;
        };
        if fade_out <= 0.0 {
            return false;
        }
        bullet.age = bullet.age.min(fade_out);
        self.bullets.append(bullet);
        true
    }

    /// Take over a bullet for the removal overlay with jittered start time
    /// and facing.
    pub(crate) fn add_softcull(&mut self, mut bullet: Bullet, rng: &mut DeterministicRng) -> Result<usize, RngError> {
        let PoolKind::Softcull {
            time_jitter,
            rotation_jitter,
            ..
        } = self.kind
        else {
            return Ok(self.bullets.append(bullet));
        };
        bullet.age = rng.range(0.0, time_jitter)?;
        let half = rotation_jitter / 2.0;
        bullet.direction = rotate_deg(bullet.direction, rng.range(-half, half)?);
        bullet.graze_counter = 0;
        bullet.cull_counter = 0;
        Ok(self.bullets.append(bullet))
    }

    pub(crate) fn take_culled_outbox(&mut self) -> Option<(PoolHandle, Vec<Bullet>)> {
        if self.culled_outbox.is_empty() {
            return None;
        }
        let outbox = std::mem::take(&mut self.culled_outbox);
        self.culled.map(|handle| (handle, outbox))
    }

    // ------------------------------------------------------------------
    // Pipeline stages
    // ------------------------------------------------------------------

    /// Freeze the update window and prune controls before dispatch.
    pub(crate) fn begin_tick(&mut self) -> usize {
        self.temp_last = self.bullets.len();
        self.controls.prune() + self.collide_controls.prune()
    }

    /// Indices below this were present when the tick started.
    pub fn tick_window(&self) -> usize {
        self.temp_last
    }

    pub(crate) fn update(&mut self, env: &mut StageEnv<'_>) -> Result<UpdateStats, TickError> {
        match self.kind {
            PoolKind::Normal | PoolKind::Empty => {
                if self.controls.is_empty() && self.temp_last >= env.config.parallel_threshold {
                    Ok(self.update_parallel(env.rng))
                } else {
                    self.update_staged(env)
                }
            }
            PoolKind::Culled { .. } => Ok(self.expire(|b| {
                b.age -= FRAME_TIME;
                b.age < 0.0
            })),
            PoolKind::Softcull { ttl, .. } => Ok(self.expire(|b| {
                b.age += FRAME_TIME;
                b.age > ttl
            })),
        }
    }

    /// Prune after the update pass. One-shot general hooks are retired.
    pub(crate) fn end_update(&mut self) -> usize {
        self.controls.end_pass() + self.collide_controls.prune()
    }

    /// Prune after the collision pass. One-shot collision hooks are retired.
    pub(crate) fn end_collide(&mut self) -> usize {
        self.controls.prune() + self.collide_controls.end_pass()
    }

    fn update_staged(&mut self, env: &mut StageEnv<'_>) -> Result<UpdateStats, TickError> {
        let Self {
            name,
            bullets,
            controls,
            culled,
            culled_outbox,
            temp_last,
            ..
        } = self;
        let post_velocity = controls.first_at_or_above(priority::POST_VELOCITY);
        let post_direction = controls.first_at_or_above(priority::POST_DIRECTION);
        let bands = [0..post_velocity, post_velocity..post_direction, post_direction..controls.len()];
        let has_culled = culled.is_some();
        let mut stats = UpdateStats::default();

        for idx in 0..*temp_last {
            let Some(bullet) = bullets.try_get_mut(idx) else {
                continue;
            };
            bullet.begin_tick();
            stats.updated += 1;

            let mut dt = FRAME_TIME;
            for (stage, band) in bands.iter().enumerate() {
                let outbox = has_culled.then_some(&mut *culled_outbox);
                let mut ctx = HookContext::new(name, bullets, idx, dt, outbox, env.sentry);
                let survived = dispatch(controls, band.clone(), &mut ctx)?;
                dt = ctx.dt();
                if !survived {
                    stats.deleted += 1;
                    break;
                }
                let Some(bullet) = bullets.try_get_mut(idx) else {
                    break;
                };
                match stage {
                    0 => bullet.integrate(dt),
                    1 => bullet.resolve_direction(),
                    _ => {}
                }
            }
        }
        Ok(stats)
    }

    fn update_parallel(&mut self, rng: &mut DeterministicRng) -> UpdateStats {
        let (records, live) = self.bullets.window_mut(self.temp_last);
        let updated = (0..records.len()).filter(|&i| live.get(i)).count();
        let was_allowed = rng.set_allowed(false);
        records
            .par_chunks_mut(PAR_CHUNK)
            .enumerate()
            .for_each(|(chunk, slice)| {
                let base = chunk * PAR_CHUNK;
                for (offset, bullet) in slice.iter_mut().enumerate() {
                    if live.get(base + offset) {
                        bullet.begin_tick();
                        bullet.integrate(FRAME_TIME);
                        bullet.resolve_direction();
                    }
                }
            });
        rng.set_allowed(was_allowed);
        UpdateStats {
            updated,
            deleted: 0,
            parallel: true,
        }
    }

    /// Advance auxiliary bullets and delete those `step` reports expired.
    fn expire(&mut self, step: impl Fn(&mut Bullet) -> bool) -> UpdateStats {
        let mut stats = UpdateStats::default();
        for idx in 0..self.temp_last {
            let Some(bullet) = self.bullets.try_get_mut(idx) else {
                continue;
            };
            stats.updated += 1;
            if step(bullet) && self.bullets.delete(idx).is_ok() {
                stats.deleted += 1;
            }
        }
        stats
    }

    /// Test live bullets against `targets`, then run the throttled camera
    /// cull on bullets that were not hit. `reports` is parallel to
    /// `targets`.
    pub(crate) fn collide(
        &mut self,
        targets: &[ResolvedReceiver],
        env: &mut StageEnv<'_>,
        reports: &mut [CollisionReport],
    ) -> Result<CollideStats, TickError> {
        let mut stats = CollideStats::default();
        if self.kind.is_auxiliary() {
            return Ok(stats);
        }
        let collides = self.kind == PoolKind::Normal && !self.shape.is_none();
        let Self {
            name,
            style,
            shape,
            bullets,
            collide_controls,
            culled,
            culled_outbox,
            temp_last,
            ..
        } = self;
        let graze_reset = style.graze_every_frames.saturating_sub(1);

        for idx in 0..*temp_last {
            let Some(bullet) = bullets.try_get_mut(idx) else {
                continue;
            };
            let mut graze_allowed = if bullet.graze_counter == 0 {
                true
            } else {
                bullet.graze_counter -= 1;
                false
            };

            let mut hit = None;
            if collides {
                for (slot, target) in targets.iter().enumerate() {
                    let result = shape.test(&target.probe, bullet.position, bullet.scale, bullet.direction);
                    if result.hit {
                        hit = Some(slot);
                        break;
                    }
                    if result.graze && graze_allowed {
                        graze_allowed = false;
                        bullet.graze_counter = graze_reset;
                        reports[slot].record_graze();
                        stats.grazes += 1;
                    }
                }
            }

            if let Some(slot) = hit {
                reports[slot].record_hit(style.damage);
                stats.hits += 1;
                let band = 0..collide_controls.len();
                let outbox = culled.is_some().then_some(&mut *culled_outbox);
                let mut ctx = HookContext::new(name, bullets, idx, FRAME_TIME, outbox, env.sentry);
                dispatch(collide_controls, band, &mut ctx)?;
                if style.destructible {
                    if let Some(bullet) = bullets.try_get(idx) {
                        if culled.is_some() {
                            culled_outbox.push(bullet.clone());
                        }
                        bullets.delete(idx)?;
                        stats.destroyed += 1;
                    }
                }
                continue;
            }

            bullet.cull_counter = bullet.cull_counter.wrapping_add(1);
            if style.allow_camera_cull
                && bullet.cull_counter & CULL_EVERY_MASK == 0
                && env.config.camera.is_outside(bullet.position, style.cull_radius)
            {
                bullets.delete(idx)?;
                stats.culled += 1;
            }
        }
        Ok(stats)
    }

    /// Compact when tombstones exceed the configured threshold. Returns the
    /// number of tombstones removed.
    pub(crate) fn maybe_compact(&mut self, config: &SimulationConfig) -> Option<usize> {
        let tombstones = self.bullets.tombstones();
        if tombstones == 0 || tombstones <= config.compaction_threshold(self.bullets.live_count()) {
            return None;
        }
        let live = self.bullets.compact();
        tracing::trace!(pool = %self.name, removed = tombstones, live, "compacted pool");
        Some(tombstones)
    }
}

/// Run the live, uncancelled hooks in `band` against the context bullet.
/// Returns `Ok(false)` as soon as the bullet is deleted.
fn dispatch(hooks: &HookList, band: Range<usize>, ctx: &mut HookContext<'_>) -> Result<bool, TickError> {
    for idx in band {
        let Some(hook) = hooks.get(idx) else {
            continue;
        };
        if hook.cancel_token().is_cancelled() {
            continue;
        }
        hook.invoke(ctx);
        if let Some(cap) = ctx.overflowed() {
            return Err(TickError::SpawnOverflow {
                pool: ctx.pool_name().to_string(),
                cap,
            });
        }
        if !ctx.is_live() {
            return Ok(false);
        }
    }
    Ok(true)
}
