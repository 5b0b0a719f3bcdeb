//! Fetch Orchestrator
//!
//! Sequences a cache lookup, a rate gate permit and the underlying fetch.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::{FetchError, GateError};
use crate::gate::RateGate;

// == Fetch Gate ==
/// Single entry point tool handlers call before any network I/O.
///
/// A cache hit never touches the rate gate. Concurrent misses on one key
/// share one load, so the group takes exactly one permit.
pub struct FetchGate<V> {
    cache: TtlCache<V>,
    gate: Arc<RateGate>,
}

impl<V> Clone for FetchGate<V> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<V> FetchGate<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(cache: TtlCache<V>, gate: Arc<RateGate>) -> Self {
        Self { cache, gate }
    }

    /// Builds a cache and a fresh gate from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            TtlCache::new(config.cache_ttl(), config.capacity()),
            Arc::new(RateGate::new(config.rate_interval())),
        )
    }

    // == Fetch ==
    /// Returns the cached value for `key` or loads it through the rate gate
    /// with `underlying`.
    ///
    /// Failures come back as `GateError::Fetch` carrying `key` and the
    /// underlying error unchanged; they are never cached.
    pub async fn fetch<F, Fut>(&self, key: &str, underlying: F) -> Result<V, GateError>
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        let gate = Arc::clone(&self.gate);
        let owned_key = key.to_string();

        self.cache
            .get_or_load(key, move || async move {
                gate.acquire().await;
                debug!(key = %owned_key, "rate gate permit granted");
                underlying(owned_key).await
            })
            .await
            .map_err(|source| GateError::Fetch {
                key: key.to_string(),
                source,
            })
    }

    pub fn cache(&self) -> &TtlCache<V> {
        &self.cache
    }

    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }
}
