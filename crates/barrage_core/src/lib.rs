//! Barrage Core
//!
//! Simulation core for bullet-hell style projectile engines:
//! - Compacting slot storage and priority-ordered control hooks
//! - Bullet pools with lazily derived copies, fade-out and softcull pools
//! - The fixed-step tick pipeline and throttled collision resolution
//! - Deterministic time and math

pub mod bullet;
pub mod collision;
pub mod config;
pub mod hooks;
pub mod math;
pub mod pipeline;
pub mod pool;
pub mod registry;
pub mod selector;
pub mod session;
pub mod spawn;
pub mod store;
pub mod style;
pub mod time;

pub use glam;

pub use bullet::{Bullet, Motion, SpawnParams};
pub use config::SimulationConfig;
pub use hooks::{priority, Hook};
pub use pipeline::{TickError, TickReport};
pub use pool::{BulletPool, Owner, PoolHandle};
pub use registry::{LookupError, PoolRegistry};
pub use selector::StyleSelector;
pub use session::Session;
pub use spawn::SpawnError;
pub use style::{StyleDescriptor, StyleSheet};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
