//! Per-tick simulation pipeline
//!
//! Stages run across every active pool in a fixed order: control pruning,
//! staged velocity update, collision, compaction. Pools are visited in the
//! registry's deterministic activation order. Each pool only processes
//! the slots present when the tick started (`tick_window`).

use crate::collision::{CollisionReport, ReceiverId, ReceiverRegistry};
use crate::config::SimulationConfig;
use crate::math::DeterministicRng;
use crate::pool::{Owner, PoolHandle};
use crate::registry::PoolRegistry;
use crate::spawn::SpawnSentry;
use crate::store::StoreError;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickError {
    #[error("spawn overflow in pool '{pool}': more than {cap} spawns this tick")]
    SpawnOverflow { pool: String, cap: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Shared state a pool stage may touch.
pub(crate) struct StageEnv<'a> {
    pub config: &'a SimulationConfig,
    pub sentry: &'a mut SpawnSentry,
    pub rng: &'a mut DeterministicRng,
}

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub pools: usize,
    pub updated: usize,
    /// Bullets deleted by controls or by expiring in auxiliary pools.
    pub deleted: usize,
    pub parallel_pools: usize,
    pub pruned_controls: usize,
    pub hits: usize,
    pub grazes: usize,
    pub destroyed: usize,
    pub culled_offscreen: usize,
    pub handed_to_culled: usize,
    pub compacted_pools: usize,
    pub spawned: u32,
    pub collisions: BTreeMap<ReceiverId, CollisionReport>,
}

/// Freeze every pool's update window and prune controls before dispatch.
pub(crate) fn prune_stage(registry: &mut PoolRegistry, order: &[PoolHandle], report: &mut TickReport) {
    for &handle in order {
        if let Some(pool) = registry.pool_mut(handle) {
            report.pruned_controls += pool.begin_tick();
        }
    }
}

pub(crate) fn velocity_stage(
    registry: &mut PoolRegistry,
    order: &[PoolHandle],
    env: &mut StageEnv<'_>,
    report: &mut TickReport,
) -> Result<(), TickError> {
    for &handle in order {
        let Some(pool) = registry.pool_mut(handle) else {
            continue;
        };
        let stats = pool.update(env)?;
        report.pruned_controls += pool.end_update();
        report.updated += stats.updated;
        report.deleted += stats.deleted;
        report.parallel_pools += usize::from(stats.parallel);
        report.handed_to_culled += flush_culled(registry, handle);
    }
    Ok(())
}

pub(crate) fn collision_stage(
    registry: &mut PoolRegistry,
    receivers: &ReceiverRegistry,
    order: &[PoolHandle],
    env: &mut StageEnv<'_>,
    report: &mut TickReport,
) -> Result<(), TickError> {
    let enemy_targets = receivers.resolve(Owner::Enemy);
    let player_targets = receivers.resolve(Owner::Player);
    let mut enemy_reports = vec![CollisionReport::default(); enemy_targets.len()];
    let mut player_reports = vec![CollisionReport::default(); player_targets.len()];

    for &handle in order {
        let Some(pool) = registry.pool_mut(handle) else {
            continue;
        };
        let stats = match pool.owner() {
            Owner::Enemy => pool.collide(&enemy_targets, env, &mut enemy_reports)?,
            Owner::Player => pool.collide(&player_targets, env, &mut player_reports)?,
        };
        report.pruned_controls += pool.end_collide();
        report.hits += stats.hits;
        report.grazes += stats.grazes;
        report.destroyed += stats.destroyed;
        report.culled_offscreen += stats.culled;
        report.handed_to_culled += flush_culled(registry, handle);
    }

    let tallies = enemy_targets
        .iter()
        .zip(&enemy_reports)
        .chain(player_targets.iter().zip(&player_reports));
    for (target, tally) in tallies {
        if !tally.is_empty() {
            report.collisions.entry(target.id).or_default().merge(tally);
        }
    }
    Ok(())
}

pub(crate) fn compaction_stage(
    registry: &mut PoolRegistry,
    order: &[PoolHandle],
    config: &SimulationConfig,
    report: &mut TickReport,
) {
    for &handle in order {
        if let Some(pool) = registry.pool_mut(handle) {
            if pool.maybe_compact(config).is_some() {
                report.compacted_pools += 1;
            }
        }
    }
}

/// Move bullets a pool destroyed this stage into its fade-out collection.
fn flush_culled(registry: &mut PoolRegistry, handle: PoolHandle) -> usize {
    let Some((target, bullets)) = registry.pool_mut(handle).and_then(|p| p.take_culled_outbox()) else {
        return 0;
    };
    let Some(culled) = registry.pool_mut(target) else {
        tracing::warn!(%handle, %target, "fade-out pool is gone; dropping culled bullets");
        return 0;
    };
    let mut added = 0;
    for bullet in bullets {
        if culled.add_culled(bullet) {
            added += 1;
        }
    }
    if added > 0 {
        // `target` was just looked up, so activation cannot fail.
        let _ = registry.activate(target);
    }
    added
}
