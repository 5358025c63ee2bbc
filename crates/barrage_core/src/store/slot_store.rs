use super::{LiveBits, StoreError};

/// Growable record array with tombstone deletion.
///
/// `len()` is the high-water mark of appended slots, not the live count.
/// Indices below `len()` stay stable until the next [`SlotStore::compact`].
#[derive(Debug, Clone)]
pub struct SlotStore<T> {
    records: Vec<T>,
    live: LiveBits,
    tombstones: usize,
}

impl<T> SlotStore<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            live: LiveBits::new(),
            tombstones: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            live: LiveBits::new(),
            tombstones: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn live_count(&self) -> usize {
        self.records.len() - self.tombstones
    }

    #[inline]
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    #[inline]
    pub fn is_live(&self, idx: usize) -> bool {
        self.live.get(idx)
    }

    /// Append at the end and return the new slot index.
    pub fn append(&mut self, record: T) -> usize {
        let idx = self.records.len();
        self.records.push(record);
        self.live.push(true);
        idx
    }

    /// Insert a live record at `idx`, shifting every later slot up by one.
    pub fn insert(&mut self, idx: usize, record: T) -> Result<(), StoreError> {
        if idx > self.records.len() {
            return Err(StoreError::IndexOutOfBounds {
                index: idx,
                len: self.records.len(),
            });
        }
        self.records.insert(idx, record);
        self.live.insert(idx, true);
        Ok(())
    }

    /// Tombstone a slot. Deleting a slot twice is reported, not ignored.
    pub fn delete(&mut self, idx: usize) -> Result<(), StoreError> {
        if idx >= self.records.len() {
            return Err(StoreError::IndexOutOfBounds {
                index: idx,
                len: self.records.len(),
            });
        }
        if !self.live.get(idx) {
            return Err(StoreError::AlreadyDeleted { index: idx });
        }
        self.live.set(idx, false);
        self.tombstones += 1;
        Ok(())
    }

    /// Remove tombstones in one left-to-right pass, keeping survivor order.
    /// Returns the new live count.
    pub fn compact(&mut self) -> usize {
        if self.tombstones == 0 {
            return self.records.len();
        }
        let mut write = 0;
        for read in 0..self.records.len() {
            if self.live.get(read) {
                if read != write {
                    self.records.swap(write, read);
                }
                write += 1;
            }
        }
        self.records.truncate(write);
        self.live = LiveBits::all_live(write);
        self.tombstones = 0;
        write
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Result<&T, StoreError> {
        let len = self.records.len();
        self.records
            .get(idx)
            .ok_or(StoreError::IndexOutOfBounds { index: idx, len })
    }

    #[inline]
    pub fn get_mut(&mut self, idx: usize) -> Result<&mut T, StoreError> {
        let len = self.records.len();
        self.records
            .get_mut(idx)
            .ok_or(StoreError::IndexOutOfBounds { index: idx, len })
    }

    /// Live record at `idx`, or `None` if it was deleted or compacted away.
    #[inline]
    pub fn try_get(&self, idx: usize) -> Option<&T> {
        if self.live.get(idx) {
            self.records.get(idx)
        } else {
            None
        }
    }

    #[inline]
    pub fn try_get_mut(&mut self, idx: usize) -> Option<&mut T> {
        if self.live.get(idx) {
            self.records.get_mut(idx)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.live.clear();
        self.tombstones = 0;
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.live.get(*idx))
    }

    /// Records below `end` together with the liveness flags, for bulk updates
    /// that must not change which slots are live.
    pub fn window_mut(&mut self, end: usize) -> (&mut [T], &LiveBits) {
        let end = end.min(self.records.len());
        (&mut self.records[..end], &self.live)
    }
}

impl<T> Default for SlotStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
