//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for capacity-driven eviction.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch stamps the key with a monotonically increasing tick; the
/// smallest tick is the least recently used key.
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Key -> tick of its latest touch
    ticks: HashMap<String, u64>,
    /// Tick -> key, ordered oldest first
    order: BTreeMap<u64, String>,
    /// Next tick to hand out
    clock: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used.
    pub fn touch(&mut self, key: &str) {
        let tick = self.clock;
        self.clock += 1;

        match self.ticks.get_mut(key) {
            Some(previous) => {
                if let Some(owned) = self.order.remove(&*previous) {
                    self.order.insert(tick, owned);
                }
                *previous = tick;
            }
            None => {
                self.ticks.insert(key.to_string(), tick);
                self.order.insert(tick, key.to_string());
            }
        }
    }

    // == Remove ==
    /// Stops tracking a key. No-op for unknown keys.
    pub fn remove(&mut self, key: &str) {
        if let Some(tick) = self.ticks.remove(key) {
            self.order.remove(&tick);
        }
    }

    // == Evict Oldest ==
    /// Returns and forgets the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }
}
