//! Cache Entry Module
//!
//! Defines a single memoized fetch result with its expiry deadline.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A stored value together with the monotonic instant it stops being visible.
///
/// Entries are never mutated in place; a reload replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// First instant at which the entry is no longer visible, `None` when
    /// the TTL reaches past what the clock can represent
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry stored now that lives for `ttl`.
    pub fn new(value: V, ttl: Duration) -> Self {
        Self::stored_at(value, Instant::now(), ttl)
    }

    /// Creates an entry as if stored at `now`.
    pub fn stored_at(value: V, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: now.checked_add(ttl),
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is expired at `now`.
    ///
    /// Boundary condition: an entry is expired once `now >= expires_at`, so a
    /// read exactly `ttl` after insertion is already a miss.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}
