//! Session-scoped pool registry
//!
//! Maps style names to pools and derives copies on first use:
//! `p-{style}` is the player-owned copy of `{style}`, and `{style}.{tag}`
//! is a sub-variant sharing the base's owner and fade-out collection.

use crate::pool::{BulletPool, Owner, PoolHandle, PoolKind};
use crate::selector::{glob_matches, StyleSelector, PLACEHOLDER, WILDCARD};
use crate::style::{StyleDescriptor, StyleError, StyleKind};
use std::collections::HashMap;
use thiserror::Error;

pub const PLAYER_PREFIX: &str = "p-";
pub const CULLED_PREFIX: &str = "$culled_";
pub const VARIANT_SEPARATOR: char = '.';

/// Name of the fade-out collection for `style`.
pub fn culled_name(style: &str) -> String {
    format!("{CULLED_PREFIX}{style}")
}

/// Name of the player-owned copy of `style`.
pub fn player_copy_name(style: &str) -> String {
    format!("{PLAYER_PREFIX}{style}")
}

/// Whether `name` is a placeholder meaning "no style".
pub fn is_sentinel(name: &str) -> bool {
    name.trim().is_empty() || name == PLACEHOLDER
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("could not find bullet style \"{name}\"")]
    UnknownStyle { name: String },

    #[error("cannot derive \"{name}\": base style \"{base}\" does not exist")]
    MissingBase { name: String, base: String },

    #[error("a pool named \"{name}\" already exists")]
    NameTaken { name: String },

    #[error("{handle} was destroyed")]
    Destroyed { handle: PoolHandle },
}

/// Processing order across pools. Variants are listed in tick order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PoolClass {
    Empty,
    Enemy,
    EnemyCopy,
    Player,
    Softcull,
    Culled,
}

impl PoolClass {
    const COUNT: usize = 6;

    fn of(pool: &BulletPool) -> Self {
        match (pool.kind(), pool.owner()) {
            (PoolKind::Empty, _) => PoolClass::Empty,
            (PoolKind::Culled { .. }, _) => PoolClass::Culled,
            (PoolKind::Softcull { .. }, _) => PoolClass::Softcull,
            (PoolKind::Normal, Owner::Player) => PoolClass::Player,
            (PoolKind::Normal, Owner::Enemy) if pool.is_copy() => PoolClass::EnemyCopy,
            (PoolKind::Normal, Owner::Enemy) => PoolClass::Enemy,
        }
    }
}

#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: Vec<Option<BulletPool>>,
    name_lookup: HashMap<String, PoolHandle>,
    active: [Vec<PoolHandle>; PoolClass::COUNT],
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the pool for a loaded style, plus its fade-out collection when
    /// the style fades out.
    pub fn register(&mut self, style: StyleDescriptor) -> Result<PoolHandle, StyleError> {
        style.validate()?;
        if self.name_lookup.contains_key(&style.name) {
            return Err(StyleError::DuplicateStyle { name: style.name });
        }
        let fades = style.fade_out_time > 0.0 && style.kind == StyleKind::Normal;
        let handle = self.insert(BulletPool::new(style, Owner::Enemy));
        if fades {
            self.attach_culled(handle);
        }
        Ok(handle)
    }

    fn insert(&mut self, pool: BulletPool) -> PoolHandle {
        let handle = PoolHandle::new(self.pools.len() as u32);
        tracing::debug!(%handle, name = pool.name(), kind = ?pool.kind(), "created pool");
        self.name_lookup.insert(pool.name().to_string(), handle);
        self.pools.push(Some(pool));
        handle
    }

    /// Give `handle` its own fade-out collection.
    fn attach_culled(&mut self, handle: PoolHandle) {
        let Some(pool) = self.pool(handle) else {
            return;
        };
        let name = culled_name(pool.name());
        let culled = match self.name_lookup.get(&name).copied() {
            Some(existing) => existing,
            None => {
                let culled = BulletPool::new_culled(name, pool.style(), pool.owner());
                self.insert(culled)
            }
        };
        if let Some(pool) = self.pool_mut(handle) {
            pool.set_culled_pool(Some(culled));
        }
    }

    pub fn len(&self) -> usize {
        self.name_lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_lookup.is_empty()
    }

    pub fn pool(&self, handle: PoolHandle) -> Option<&BulletPool> {
        self.pools.get(handle.index() as usize)?.as_ref()
    }

    pub fn pool_mut(&mut self, handle: PoolHandle) -> Option<&mut BulletPool> {
        self.pools.get_mut(handle.index() as usize)?.as_mut()
    }

    fn live(&mut self, handle: PoolHandle) -> Result<&mut BulletPool, LookupError> {
        self.pool_mut(handle).ok_or(LookupError::Destroyed { handle })
    }

    /// Existing pool by exact name. Never derives.
    pub fn handle(&self, name: &str) -> Option<PoolHandle> {
        self.name_lookup.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&BulletPool> {
        self.handle(name).and_then(|h| self.pool(h))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.name_lookup.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Find `name`, deriving it from its base if needed. Does not activate.
    pub fn resolve(&mut self, name: &str) -> Result<PoolHandle, LookupError> {
        if let Some(handle) = self.handle(name) {
            return Ok(handle);
        }
        if let Some(base) = name.strip_prefix(PLAYER_PREFIX) {
            let base_handle = self.resolve_base(name, base)?;
            return self.copy_pool(base_handle, name.to_string(), Owner::Player);
        }
        if let Some((base, _)) = name.split_once(VARIANT_SEPARATOR) {
            let base_handle = self.resolve_base(name, base)?;
            let owner = self.live(base_handle)?.owner();
            return self.copy_pool(base_handle, name.to_string(), owner);
        }
        Err(LookupError::UnknownStyle {
            name: name.to_string(),
        })
    }

    fn resolve_base(&mut self, name: &str, base: &str) -> Result<PoolHandle, LookupError> {
        let missing = || LookupError::MissingBase {
            name: name.to_string(),
            base: base.to_string(),
        };
        let handle = self.resolve(base).map_err(|err| match err {
            LookupError::UnknownStyle { .. } => missing(),
            other => other,
        })?;
        if self.live(handle)?.kind().is_auxiliary() {
            return Err(missing());
        }
        Ok(handle)
    }

    /// Strict lookup for callers that expect the style to exist. Derives
    /// and activates.
    pub fn get_or_copy(&mut self, name: &str) -> Result<PoolHandle, LookupError> {
        let handle = self.resolve(name)?;
        self.activate(handle)?;
        Ok(handle)
    }

    /// Like [`PoolRegistry::get_or_copy`], but placeholder names mean "no
    /// pool" instead of an error.
    pub fn try_get_or_copy(&mut self, name: &str) -> Result<Option<PoolHandle>, LookupError> {
        if is_sentinel(name) {
            return Ok(None);
        }
        self.get_or_copy(name).map(Some)
    }

    /// Copy `base` under `new_name`. Bullets are not copied.
    pub fn copy(&mut self, base: &str, new_name: &str) -> Result<PoolHandle, LookupError> {
        if self.name_lookup.contains_key(new_name) {
            return Err(LookupError::NameTaken {
                name: new_name.to_string(),
            });
        }
        let base_handle = self.resolve(base)?;
        let owner = self.live(base_handle)?.owner();
        self.copy_pool(base_handle, new_name.to_string(), owner)
    }

    fn copy_pool(&mut self, base: PoolHandle, name: String, owner: Owner) -> Result<PoolHandle, LookupError> {
        let origin = self.live(base)?;
        let base_owner = origin.owner();
        let copy = origin.derive(name, owner, base);
        let own_culled = owner != base_owner && copy.culled_pool().is_some();
        let handle = self.insert(copy);
        if own_culled {
            self.attach_culled(handle);
        }
        tracing::debug!(%handle, origin = %base, ?owner, "derived copy pool");
        Ok(handle)
    }

    /// Enqueue a pool for per-tick processing. Idempotent.
    pub fn activate(&mut self, handle: PoolHandle) -> Result<(), LookupError> {
        let pool = self.live(handle)?;
        if pool.is_active() {
            return Ok(());
        }
        pool.set_active(true);
        let class = PoolClass::of(pool);
        self.active[class as usize].push(handle);
        Ok(())
    }

    pub fn deactivate(&mut self, handle: PoolHandle) -> Result<(), LookupError> {
        let pool = self.live(handle)?;
        if !pool.is_active() {
            return Ok(());
        }
        pool.set_active(false);
        let class = PoolClass::of(pool);
        self.active[class as usize].retain(|&h| h != handle);
        Ok(())
    }

    /// Active pools in tick order.
    pub fn active_in_order(&self) -> Vec<PoolHandle> {
        self.active.iter().flatten().copied().collect()
    }

    /// Release a pool. Its handle and name become invalid; copies that
    /// point at it keep a stale origin.
    pub fn destroy(&mut self, handle: PoolHandle) -> Result<(), LookupError> {
        let pool = self
            .pools
            .get_mut(handle.index() as usize)
            .and_then(Option::take)
            .ok_or(LookupError::Destroyed { handle })?;
        self.name_lookup.remove(pool.name());
        if pool.is_active() {
            self.active[PoolClass::of(&pool) as usize].retain(|&h| h != handle);
        }
        tracing::debug!(%handle, name = pool.name(), "destroyed pool");
        Ok(())
    }

    /// Reset every pool, drop all controls, deactivate everything, and
    /// destroy derived copies along with player-owned fade-out pools.
    /// Returns the number of pools destroyed.
    pub fn orphan_copies(&mut self) -> usize {
        let mut doomed = Vec::new();
        for (idx, slot) in self.pools.iter_mut().enumerate() {
            let Some(pool) = slot else {
                continue;
            };
            pool.clear_controls();
            pool.reset();
            pool.set_active(false);
            let player_culled = matches!(pool.kind(), PoolKind::Culled { .. }) && pool.owner() == Owner::Player;
            if pool.is_copy() || player_culled {
                doomed.push(PoolHandle::new(idx as u32));
            }
        }
        for list in &mut self.active {
            list.clear();
        }
        for &handle in &doomed {
            // Every doomed handle was live above.
            let _ = self.destroy(handle);
        }
        tracing::debug!(destroyed = doomed.len(), "orphaned copy pools");
        doomed.len()
    }

    /// Drop every bullet in every pool. Controls and activation are kept.
    pub fn clear_all(&mut self) {
        for pool in self.pools.iter_mut().flatten() {
            pool.reset();
        }
    }

    pub fn clear_controls(&mut self) {
        for pool in self.pools.iter_mut().flatten() {
            pool.clear_controls();
        }
    }

    /// Pools addressed by `selector`. Concrete names are derived on demand;
    /// wildcard names only match registered, non-internal pools.
    pub fn select(&mut self, selector: &StyleSelector) -> Result<Vec<PoolHandle>, LookupError> {
        let candidates: Vec<String> = self
            .names()
            .into_iter()
            .filter(|name| !name.starts_with(CULLED_PREFIX))
            .map(str::to_string)
            .collect();
        let mut out = Vec::new();
        if selector.is_exclusive() {
            for name in candidates.iter().filter(|name| selector.matches(name)) {
                out.extend(self.handle(name));
            }
        } else {
            for pattern in selector.enumerated() {
                if pattern.contains(WILDCARD) {
                    for name in candidates.iter().filter(|name| glob_matches(pattern, name)) {
                        out.extend(self.handle(name));
                    }
                } else {
                    out.push(self.resolve(pattern)?);
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        out.retain(|h| seen.insert(*h));
        Ok(out)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &BulletPool)> {
        self.pools
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|pool| (PoolHandle::new(idx as u32), pool)))
    }
}
