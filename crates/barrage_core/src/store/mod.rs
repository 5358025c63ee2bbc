//! Compacting slot storage
//!
//! Append-only records with tombstone deletion and an explicit, order
//! preserving compaction pass. Bullets and hook lists both live here.

mod live_bits;
mod slot_store;

pub use live_bits::LiveBits;
pub use slot_store::SlotStore;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("slot {index} is out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("slot {index} was already deleted")]
    AlreadyDeleted { index: usize },
}
