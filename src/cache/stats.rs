//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, loads and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from a fresh entry
    pub hits: u64,
    /// Reads that found nothing fresh
    pub misses: u64,
    /// Loader invocations started
    pub loads: u64,
    /// Loader invocations that failed
    pub load_failures: u64,
    /// Callers that joined a load already in flight
    pub coalesced: u64,
    /// Entries evicted due to the capacity bound
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Current number of stored entries
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_load(&mut self) {
        self.loads += 1;
    }

    pub fn record_load_failure(&mut self) {
        self.load_failures += 1;
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
