//! Bullet pools
//!
//! A pool owns the bullets of one style, its controls, and the pipeline
//! stages that run over them each tick.

mod bullet_pool;
mod context;
mod handle;
mod render;

pub use bullet_pool::BulletPool;
pub use context::HookContext;
pub use handle::PoolHandle;
pub use render::{RenderBatch, RenderBatches, RenderInstance, BATCH_SIZE};

use crate::style::StyleKind;

/// Which side fired a pool's bullets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    Enemy,
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoolKind {
    Normal,
    /// Marker bullets: updated and culled, never collide or render.
    Empty,
    /// Fade-out playback of destroyed bullets. Time runs backward.
    Culled { fade_out: f32 },
    /// Removal overlay with a fixed lifetime.
    Softcull {
        ttl: f32,
        time_jitter: f32,
        rotation_jitter: f32,
    },
}

impl PoolKind {
    /// Whether callers may spawn into the pool directly.
    pub fn accepts_spawns(&self) -> bool {
        matches!(self, PoolKind::Normal | PoolKind::Empty)
    }

    pub fn is_auxiliary(&self) -> bool {
        !self.accepts_spawns()
    }
}

impl From<StyleKind> for PoolKind {
    fn from(kind: StyleKind) -> Self {
        match kind {
            StyleKind::Normal => PoolKind::Normal,
            StyleKind::Empty => PoolKind::Empty,
            StyleKind::Softcull {
                ttl,
                time_jitter,
                rotation_jitter,
            } => PoolKind::Softcull {
                ttl,
                time_jitter,
                rotation_jitter,
            },
        }
    }
}
