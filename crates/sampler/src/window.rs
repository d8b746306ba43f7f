//! Bounded, time-ordered sample window.

use std::collections::BTreeMap;

use contracts::{FixRecord, FixStatus};

/// One accepted fix plus the values derived from it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Update {
    pub record: FixRecord,
    /// Meters from the previous raw point
    pub distance_change: f64,
    /// Course mapped onto `[0, 1]`
    pub cyclical_course: f64,
    pub status: FixStatus,
}

/// Ordered map `timestamp → Update` with oldest-first eviction
///
/// A second update carrying an already-present timestamp replaces the first.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    entries: BTreeMap<i64, Update>,
    capacity: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert and evict the oldest entries beyond capacity; returns how many were evicted
    pub fn insert(&mut self, update: Update) -> usize {
        self.entries.insert(update.record.timestamp, update);
        self.evict()
    }

    /// Drop every entry with key ≤ `key`
    pub fn discard_through(&mut self, key: i64) {
        self.entries.retain(|k, _| *k > key);
    }

    /// Change capacity, evicting the oldest entries if it shrank
    pub fn resize(&mut self, capacity: usize) -> usize {
        self.capacity = capacity.max(1);
        self.evict()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest key
    pub fn first_key(&self) -> Option<i64> {
        self.entries.keys().next().copied()
    }

    /// Oldest → newest
    pub fn iter(&self) -> impl Iterator<Item = &Update> {
        self.entries.values()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_first();
            evicted += 1;
        }
        evicted
    }
}
