use crate::bullet::{Bullet, Motion, ParamSnapshot, SpawnParams};
use crate::spawn::{SpawnError, SpawnSentry};
use crate::store::{SlotStore, StoreError};

/// What a hook sees while it runs against one bullet.
///
/// The bullet at [`HookContext::index`] may be read, mutated, deleted or
/// culled. New bullets spawned here land past the tick's snapshot and are
/// first updated next tick.
pub struct HookContext<'a> {
    pool: &'a str,
    bullets: &'a mut SlotStore<Bullet>,
    index: usize,
    dt: f32,
    culled: Option<&'a mut Vec<Bullet>>,
    sentry: &'a mut SpawnSentry,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(
        pool: &'a str,
        bullets: &'a mut SlotStore<Bullet>,
        index: usize,
        dt: f32,
        culled: Option<&'a mut Vec<Bullet>>,
        sentry: &'a mut SpawnSentry,
    ) -> Self {
        Self {
            pool,
            bullets,
            index,
            dt,
            culled,
            sentry,
        }
    }

    pub fn pool_name(&self) -> &str {
        self.pool
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_live(&self) -> bool {
        self.bullets.is_live(self.index)
    }

    pub fn bullet(&self) -> Option<&Bullet> {
        self.bullets.try_get(self.index)
    }

    pub fn bullet_mut(&mut self) -> Option<&mut Bullet> {
        self.bullets.try_get_mut(self.index)
    }

    /// Current state, or the zeroed snapshot once deleted.
    pub fn snapshot(&self) -> ParamSnapshot {
        self.bullet().map(Bullet::snapshot).unwrap_or_default()
    }

    /// Step length this bullet will integrate with.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Rescale this bullet's step for the current tick. Only effective
    /// before velocity integration.
    pub fn set_dt(&mut self, dt: f32) {
        self.dt = dt.max(0.0);
    }

    pub fn delete(&mut self) -> Result<(), StoreError> {
        self.bullets.delete(self.index)
    }

    /// Delete the bullet, handing a copy to the pool's fade-out collection
    /// when it has one.
    pub fn cull(&mut self) -> Result<(), StoreError> {
        if let (Some(outbox), Some(bullet)) = (self.culled.as_deref_mut(), self.bullets.try_get(self.index)) {
            outbox.push(bullet.clone());
        }
        self.bullets.delete(self.index)
    }

    /// Spawn a new bullet into this pool. Counts toward the tick's cap.
    pub fn spawn(&mut self, params: SpawnParams, motion: Motion) -> Result<usize, SpawnError> {
        let uid = self.sentry.admit()?;
        Ok(self.bullets.append(Bullet::new(params, motion, uid)))
    }

    pub(crate) fn overflowed(&self) -> Option<u32> {
        self.sentry.tripped().then(|| self.sentry.cap())
    }
}
