//! Packed liveness flags, one bit per slot.

const WORD_BITS: usize = u64::BITS as usize;

#[derive(Debug, Clone, Default)]
pub struct LiveBits {
    words: Vec<u64>,
    len: usize,
}

impl LiveBits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bitset of `len` flags, all set.
    pub fn all_live(len: usize) -> Self {
        let mut words = vec![u64::MAX; len / WORD_BITS];
        let tail = len % WORD_BITS;
        if tail != 0 {
            words.push((1u64 << tail) - 1);
        }
        Self { words, len }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Push a new flag at the end.
    pub fn push(&mut self, live: bool) {
        let idx = self.len;
        if idx / WORD_BITS >= self.words.len() {
            self.words.push(0);
        }
        self.len += 1;
        self.set(idx, live);
    }

    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        if idx >= self.len {
            return false;
        }
        self.words[idx / WORD_BITS] & (1u64 << (idx % WORD_BITS)) != 0
    }

    #[inline]
    pub fn set(&mut self, idx: usize, live: bool) {
        debug_assert!(idx < self.len);
        let mask = 1u64 << (idx % WORD_BITS);
        let word = &mut self.words[idx / WORD_BITS];
        if live {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Shift flags at `idx..` one slot to the right and write `live` at `idx`.
    pub fn insert(&mut self, idx: usize, live: bool) {
        debug_assert!(idx <= self.len);
        self.push(false);
        for i in (idx + 1..self.len).rev() {
            let prev = self.get(i - 1);
            self.set(i, prev);
        }
        self.set(idx, live);
    }

    /// Drop every flag at `new_len..`.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len {
            return;
        }
        self.len = new_len;
        self.words.truncate(new_len.div_ceil(WORD_BITS));
        let tail = new_len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.len = 0;
    }

    pub fn count_live(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_clear_bits_across_words() {
        let mut bits = LiveBits::new();
        for i in 0..130 {
            bits.push(i % 3 != 0);
        }
        assert_eq!(bits.len(), 130);
        assert!(!bits.get(0));
        assert!(bits.get(64));
        assert!(!bits.get(129));
        assert_eq!(bits.count_live(), 130 - 44);

        bits.set(64, false);
        assert!(!bits.get(64));
    }

    #[test]
    fn all_live_sets_exactly_len_bits() {
        let bits = LiveBits::all_live(67);
        assert_eq!(bits.count_live(), 67);
        assert!(bits.get(66));
        assert!(!bits.get(67));
        assert_eq!(LiveBits::all_live(0).count_live(), 0);
    }

    #[test]
    fn insert_shifts_tail() {
        let mut bits = LiveBits::new();
        bits.push(true);
        bits.push(false);
        bits.push(true);
        bits.insert(1, true);
        let flags: Vec<bool> = (0..bits.len()).map(|i| bits.get(i)).collect();
        assert_eq!(flags, vec![true, true, false, true]);
    }

    #[test]
    fn truncate_masks_stale_bits() {
        let mut bits = LiveBits::new();
        for _ in 0..70 {
            bits.push(true);
        }
        bits.truncate(3);
        assert_eq!(bits.count_live(), 3);
        bits.push(false);
        assert!(!bits.get(3));
        assert!(!bits.get(65));
    }
}
