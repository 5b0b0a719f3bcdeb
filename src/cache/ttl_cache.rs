//! Concurrent TTL cache with collapsed loads.
//!
//! The table and the in-flight markers live behind one mutex that is only
//! held for map bookkeeping, never across an await or a call into the
//! loader. A miss registers a shared handle for the key; callers arriving
//! while it runs attach to that handle instead of starting their own load.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, CacheStore};
use crate::error::FetchError;

type LoadFuture<V> = Shared<BoxFuture<'static, Result<V, FetchError>>>;
type LoadSender<V> = oneshot::Sender<Result<V, FetchError>>;

struct InFlight<V> {
    id: u64,
    future: LoadFuture<V>,
}

struct Inner<V> {
    store: CacheStore<V>,
    loads: HashMap<String, InFlight<V>>,
    next_load_id: u64,
}

impl<V> Inner<V> {
    /// Drops the in-flight marker for `key` if it still belongs to load `id`.
    fn clear_load(&mut self, key: &str, id: u64) {
        if self.loads.get(key).is_some_and(|flight| flight.id == id) {
            self.loads.remove(key);
        }
    }
}

/// Clears the in-flight marker if the loader or its task unwinds before the
/// outcome is recorded.
struct LoadGuard<V> {
    inner: Arc<Mutex<Inner<V>>>,
    key: String,
    id: u64,
    finished: bool,
}

impl<V> Drop for LoadGuard<V> {
    fn drop(&mut self) {
        if !self.finished {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.clear_load(&self.key, self.id);
        }
    }
}

// == TTL Cache ==
/// Thread-safe TTL cache whose misses are loaded at most once per key at a
/// time.
///
/// Cloning is cheap and every clone shares the same table.
pub struct TtlCache<V> {
    inner: Arc<Mutex<Inner<V>>>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache whose entries live for `ttl`, optionally bounded to
    /// `capacity` entries (least recently used evicted first).
    pub fn new(ttl: Duration, capacity: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                store: CacheStore::new(ttl, capacity),
                loads: HashMap::new(),
                next_load_id: 0,
            })),
        }
    }

    // == Get ==
    /// Returns the value for `key` if a fresh entry exists.
    ///
    /// Never waits for an in-flight load of the same key.
    pub fn get(&self, key: &str) -> Option<V> {
        self.lock().store.get(key)
    }

    // == Get Or Load ==
    /// Returns the fresh cached value for `key`, or runs `loader` to produce
    /// and store one.
    ///
    /// Concurrent callers for the same missing key share a single `loader`
    /// run and all receive its result or its error. A failed load stores
    /// nothing. The load runs on its own task, so dropping any caller
    /// (including the one that started it) leaves the others unaffected.
    pub async fn get_or_load<F, Fut>(&self, key: &str, loader: F) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        let (flight, leader) = {
            let mut inner = self.lock();
            if let Some(value) = inner.store.get(key) {
                debug!(key, "cache hit");
                return Ok(value);
            }

            match inner.loads.get(key) {
                Some(existing) => {
                    let future = existing.future.clone();
                    inner.store.stats_mut().record_coalesced();
                    debug!(key, "joining in-flight load");
                    (future, None)
                }
                None => {
                    let id = inner.next_load_id;
                    inner.next_load_id += 1;
                    inner.store.stats_mut().record_load();

                    let (tx, rx) = oneshot::channel();
                    let future = async move {
                        rx.await.unwrap_or_else(|_| {
                            Err(FetchError::Internal(
                                "load ended without producing a result".to_string(),
                            ))
                        })
                    }
                    .boxed()
                    .shared();
                    inner.loads.insert(
                        key.to_string(),
                        InFlight {
                            id,
                            future: future.clone(),
                        },
                    );

                    let guard = LoadGuard {
                        inner: Arc::clone(&self.inner),
                        key: key.to_string(),
                        id,
                        finished: false,
                    };
                    (future, Some((guard, tx)))
                }
            }
        };

        // Called with the table unlocked so the loader may use this cache.
        if let Some((guard, tx)) = leader {
            let load = loader();
            Self::spawn_load(guard, tx, load);
        }

        flight.await
    }

    // == Invalidate ==
    /// Removes the entry for `key`. Idempotent.
    ///
    /// A load already in flight for `key` is not cancelled and will store
    /// its result when it finishes.
    pub fn invalidate(&self, key: &str) {
        if self.lock().store.remove(key) {
            debug!(key, "cache entry invalidated");
        }
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.lock().store.cleanup_expired()
    }

    /// Snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.lock().store.stats()
    }

    /// Number of keys with a load currently running.
    pub fn loads_in_flight(&self) -> usize {
        self.lock().loads.len()
    }

    pub fn len(&self) -> usize {
        self.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().store.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.lock().store.ttl()
    }

    fn spawn_load<Fut>(mut guard: LoadGuard<V>, tx: LoadSender<V>, load: Fut)
    where
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        tokio::spawn(async move {
            let result = load.await;

            {
                let mut inner = guard.inner.lock().unwrap_or_else(PoisonError::into_inner);
                inner.clear_load(&guard.key, guard.id);
                match &result {
                    Ok(value) => {
                        inner.store.insert(guard.key.clone(), value.clone());
                        info!(key = %guard.key, "loaded and cached");
                    }
                    Err(err) => {
                        inner.store.stats_mut().record_load_failure();
                        warn!(key = %guard.key, error = %err, "load failed, nothing cached");
                    }
                }
            }
            guard.finished = true;
            // Every waiter may be gone; the entry is stored either way.
            let _ = tx.send(result);
        });
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        // The table stays consistent across a panicking holder: every
        // mutation completes before the guard is released.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
