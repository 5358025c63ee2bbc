//! Render batch packing
//!
//! Batches are rebuilt on demand each frame and borrow the pool, so they
//! cannot outlive a compaction.

use crate::bullet::Bullet;
use crate::store::SlotStore;
use bytemuck::{Pod, Zeroable};

/// Instances per batch.
pub const BATCH_SIZE: usize = 511;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RenderInstance {
    pub position: [f32; 2],
    pub direction_scaled: [f32; 2],
    pub time: f32,
    pub tint: [f32; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderBatch {
    pub instances: Vec<RenderInstance>,
    /// Whether `tint` carries anything other than white.
    pub tinted: bool,
}

impl RenderBatch {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

/// Live bullets of one pool in index order, `BATCH_SIZE` at a time.
pub struct RenderBatches<'a> {
    bullets: &'a SlotStore<Bullet>,
    cursor: usize,
    tint: [f32; 4],
    tinted: bool,
}

impl<'a> RenderBatches<'a> {
    pub(crate) fn new(bullets: &'a SlotStore<Bullet>, tint: [f32; 4], tinted: bool) -> Self {
        Self {
            bullets,
            cursor: 0,
            tint,
            tinted,
        }
    }

    pub(crate) fn empty(bullets: &'a SlotStore<Bullet>) -> Self {
        Self {
            bullets,
            cursor: bullets.len(),
            tint: [1.0; 4],
            tinted: false,
        }
    }
}

impl Iterator for RenderBatches<'_> {
    type Item = RenderBatch;

    fn next(&mut self) -> Option<RenderBatch> {
        let mut instances = Vec::with_capacity(BATCH_SIZE);
        while instances.len() < BATCH_SIZE && self.cursor < self.bullets.len() {
            if let Some(b) = self.bullets.try_get(self.cursor) {
                instances.push(RenderInstance {
                    position: b.position.to_array(),
                    direction_scaled: (b.direction * b.scale).to_array(),
                    time: b.age,
                    tint: self.tint,
                });
            }
            self.cursor += 1;
        }
        (!instances.is_empty()).then(|| RenderBatch {
            instances,
            tinted: self.tinted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bullet::{Motion, SpawnParams};
    use glam::Vec2;

    #[test]
    fn batches_split_at_batch_size_and_skip_tombstones() {
        let mut store = SlotStore::new();
        for i in 0..(BATCH_SIZE + 12) {
            let params = SpawnParams::at(Vec2::new(i as f32, 0.0)).scaled(2.0);
            store.append(Bullet::new(params, Motion::zero(), i as u32));
        }
        store.delete(0).unwrap();

        let batches: Vec<RenderBatch> = RenderBatches::new(&store, [1.0; 4], false).collect();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].instances.len(), BATCH_SIZE);
        assert_eq!(batches[1].instances.len(), 11);
        assert_eq!(batches[0].instances[0].position, [1.0, 0.0]);
        assert_eq!(batches[0].instances[0].direction_scaled, [2.0, 0.0]);
        assert_eq!(batches[0].as_bytes().len(), BATCH_SIZE * 36);
    }

    #[test]
    fn empty_iterator_yields_nothing() {
        let mut store = SlotStore::new();
        store.append(Bullet::new(SpawnParams::default(), Motion::zero(), 1));
        assert_eq!(RenderBatches::empty(&store).count(), 0);
    }
}
