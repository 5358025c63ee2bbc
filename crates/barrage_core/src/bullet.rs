//! Bullet records and the motion functions that drive them.

use crate::math::{direction_or, Vec2};
use std::fmt;
use std::sync::Arc;

/// Positional delta for one step, given the bullet state and step length.
pub type VelocityFn = Arc<dyn Fn(&ParamSnapshot, f32) -> Vec2 + Send + Sync>;
/// Facing direction, given the bullet state and this tick's accumulated delta.
pub type DirectionFn = Arc<dyn Fn(&ParamSnapshot, Vec2) -> Vec2 + Send + Sync>;
pub type ScaleFn = Arc<dyn Fn(&ParamSnapshot) -> f32 + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BulletId {
    /// Index of the spawner that fired this bullet within its pattern.
    pub owner_index: u32,
    pub uid: u32,
}

/// Read-only view of a bullet handed to motion functions and persistence
/// predicates. The default value is the zeroed snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParamSnapshot {
    pub position: Vec2,
    pub age: f32,
    pub id: BulletId,
}

/// The externally compiled functions a bullet follows.
#[derive(Clone)]
pub struct Motion {
    velocity: VelocityFn,
    direction: Option<DirectionFn>,
    scale: Option<ScaleFn>,
}

impl Motion {
    pub fn new<F>(velocity: F) -> Self
    where
        F: Fn(&ParamSnapshot, f32) -> Vec2 + Send + Sync + 'static,
    {
        Self {
            velocity: Arc::new(velocity),
            direction: None,
            scale: None,
        }
    }

    /// Stationary bullet.
    pub fn zero() -> Self {
        Self::new(|_, _| Vec2::ZERO)
    }

    /// Constant velocity in units per second.
    pub fn linear(velocity: Vec2) -> Self {
        Self::new(move |_, dt| velocity * dt)
    }

    pub fn with_direction<F>(mut self, direction: F) -> Self
    where
        F: Fn(&ParamSnapshot, Vec2) -> Vec2 + Send + Sync + 'static,
    {
        self.direction = Some(Arc::new(direction));
        self
    }

    pub fn with_scale<F>(mut self, scale: F) -> Self
    where
        F: Fn(&ParamSnapshot) -> f32 + Send + Sync + 'static,
    {
        self.scale = Some(Arc::new(scale));
        self
    }
}

impl fmt::Debug for Motion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Motion")
            .field("direction", &self.direction.is_some())
            .field("scale", &self.scale.is_some())
            .finish_non_exhaustive()
    }
}

/// Where and how a new bullet starts.
#[derive(Debug, Clone, Copy)]
pub struct SpawnParams {
    pub position: Vec2,
    pub direction: Vec2,
    pub scale: f32,
    pub owner_index: u32,
}

impl SpawnParams {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn facing(mut self, direction: Vec2) -> Self {
        self.direction = direction;
        self
    }

    pub fn scaled(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn owner_index(mut self, index: u32) -> Self {
        self.owner_index = index;
        self
    }
}

impl Default for SpawnParams {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            direction: Vec2::X,
            scale: 1.0,
            owner_index: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bullet {
    pub position: Vec2,
    /// Movement accumulated during the current tick.
    pub accumulated_delta: Vec2,
    pub direction: Vec2,
    pub scale: f32,
    pub age: f32,
    pub id: BulletId,
    pub graze_counter: u16,
    pub cull_counter: u16,
    pub motion: Motion,
}

impl Bullet {
    pub fn new(params: SpawnParams, motion: Motion, uid: u32) -> Self {
        Self {
            position: params.position,
            accumulated_delta: Vec2::ZERO,
            direction: params.direction,
            scale: params.scale,
            age: 0.0,
            id: BulletId {
                owner_index: params.owner_index,
                uid,
            },
            graze_counter: 0,
            cull_counter: 0,
            motion,
        }
    }

    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            position: self.position,
            age: self.age,
            id: self.id,
        }
    }

    /// Start-of-tick reset of per-tick state.
    #[inline]
    pub(crate) fn begin_tick(&mut self) {
        self.accumulated_delta = Vec2::ZERO;
    }

    /// Displace the bullet, counting toward this tick's delta.
    #[inline]
    pub fn nudge(&mut self, offset: Vec2) {
        self.position += offset;
        self.accumulated_delta += offset;
    }

    /// Advance age by `dt` and apply the velocity and scale functions.
    pub fn integrate(&mut self, dt: f32) {
        self.age += dt;
        let delta = (self.motion.velocity)(&self.snapshot(), dt);
        self.nudge(delta);
        if let Some(scale) = &self.motion.scale {
            self.scale = scale(&self.snapshot());
        }
    }

    pub fn resolve_direction(&mut self) {
        self.direction = match &self.motion.direction {
            Some(direction) => direction(&self.snapshot(), self.accumulated_delta),
            None => direction_or(self.accumulated_delta, self.direction),
        };
    }
}
