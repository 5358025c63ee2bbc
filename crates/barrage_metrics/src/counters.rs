//! Named per-tick counters with rolling averages

use super::ring_buffer::RingBuffer;
use std::collections::BTreeMap;

pub struct TickCounters {
    window: usize,
    current: BTreeMap<&'static str, u64>,
    history: BTreeMap<&'static str, RingBuffer<u64>>,
}

impl TickCounters {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            current: BTreeMap::new(),
            history: BTreeMap::new(),
        }
    }

    pub fn increment(&mut self, name: &'static str, value: u64) {
        *self.current.entry(name).or_insert(0) += value;
    }

    pub fn set(&mut self, name: &'static str, value: u64) {
        self.current.insert(name, value);
    }

    /// Value accumulated since the last [`TickCounters::end_tick`].
    pub fn get(&self, name: &str) -> u64 {
        self.current.get(name).copied().unwrap_or(0)
    }

    /// Rolling per-tick average.
    pub fn average(&self, name: &str) -> f64 {
        self.history.get(name).map(|samples| samples.average()).unwrap_or(0.0)
    }

    /// Fold this tick's values into the history and start over. Counters not
    /// touched this tick record zero.
    pub fn end_tick(&mut self) {
        let window = self.window;
        for name in self.current.keys() {
            self.history.entry(*name).or_insert_with(|| RingBuffer::new(window));
        }
        for (name, samples) in self.history.iter_mut() {
            samples.push(self.current.get(name).copied().unwrap_or(0));
        }
        self.current.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.current.iter().map(|(name, value)| (*name, *value))
    }
}

impl Default for TickCounters {
    fn default() -> Self {
        Self::new(120)
    }
}
