//! Cache Module
//!
//! In-memory memoization of fetch results with TTL expiration, LRU eviction
//! and collapsed concurrent loads.

mod entry;
mod lru;
mod stats;
mod store;
mod ttl_cache;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;
pub use ttl_cache::TtlCache;
