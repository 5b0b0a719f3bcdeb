//! Cache Store Module
//!
//! Single-threaded cache table combining HashMap storage with LRU tracking
//! and lazy TTL expiration. `TtlCache` wraps it for concurrent use.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruTracker};

// == Cache Store ==
/// Cache table with LRU eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries, `None` for unbounded
    capacity: Option<usize>,
    /// Lifetime of every stored entry
    ttl: Duration,
    /// Earliest deadline seen since the last sweep. May be stale-early after
    /// removals, which only costs one sweep that finds nothing.
    next_expiry: Option<Instant>,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a store whose entries live for `ttl`, optionally bounded to
    /// `capacity` entries.
    pub fn new(ttl: Duration, capacity: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            capacity,
            ttl,
            next_expiry: None,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Get ==
    /// Returns the value for `key` if a fresh entry exists.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                let value = entry.value.clone();
                self.stats.record_hit();
                self.lru.touch(key);
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            debug!(key, "cache entry expired on read");
        }
        self.stats.record_miss();
        None
    }

    // == Insert ==
    /// Stores `value` under `key` with a fresh expiry, replacing any
    /// previous entry.
    ///
    /// At capacity, expired entries are purged first if any deadline has
    /// passed; if that frees nothing the least recently used entry is
    /// evicted.
    pub fn insert(&mut self, key: String, value: V) {
        let is_overwrite = self.entries.contains_key(&key);

        if let Some(capacity) = self.capacity {
            if !is_overwrite && self.entries.len() >= capacity && self.has_expired_entries() {
                self.cleanup_expired();
            }
            while !is_overwrite && self.entries.len() >= capacity {
                match self.lru.evict_oldest() {
                    Some(evicted) => {
                        self.entries.remove(&evicted);
                        self.stats.record_eviction();
                        debug!(key = %evicted, "evicted least recently used entry");
                    }
                    None => break,
                }
            }
        }

        let entry = CacheEntry::new(value, self.ttl);
        if let Some(deadline) = entry.expires_at {
            self.next_expiry = Some(self.next_expiry.map_or(deadline, |d| d.min(deadline)));
        }
        self.entries.insert(key.clone(), entry);
        self.lru.touch(&key);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Remove ==
    /// Removes an entry unconditionally. Returns whether one was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.remove_entry(key).is_some()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.remove_entry(&key);
        }
        self.next_expiry = self.entries.values().filter_map(|e| e.expires_at).min();

        self.stats.record_expirations(count);
        count
    }

    // == Stats ==
    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    /// Number of physically stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn has_expired_entries(&self) -> bool {
        self.next_expiry
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }
}
