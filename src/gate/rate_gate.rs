//! Rate Gate Module
//!
//! Process-wide minimum spacing between outbound fetches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::debug;

use crate::error::FetchError;

// == Rate Gate ==
/// Grants permits no closer together than `interval`.
///
/// Waiters queue on a fair mutex, so permits are granted in arrival order.
/// The grant time is written only after a waiter's sleep has finished:
/// dropping an `acquire` future at any point leaves the gate as if that
/// caller never asked.
#[derive(Debug)]
pub struct RateGate {
    interval: Duration,
    last_granted: Mutex<Option<Instant>>,
    grants: AtomicU64,
}

/// Snapshot of gate counters for the stats endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GateStats {
    pub interval_secs: f64,
    pub grants: u64,
}

impl RateGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_granted: Mutex::new(None),
            grants: AtomicU64::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    // == Acquire ==
    /// Waits until `interval` has passed since the previous permit, then
    /// records a new one.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            self.grants.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let mut last = self.last_granted.lock().await;
        if let Some(previous) = *last {
            match previous.checked_add(self.interval) {
                Some(ready_at) if ready_at > Instant::now() => {
                    debug!(
                        wait_ms = (ready_at - Instant::now()).as_millis() as u64,
                        "rate gate waiting"
                    );
                    sleep_until(ready_at).await;
                }
                Some(_) => {}
                // The next permit lies beyond the clock's range.
                None => std::future::pending::<()>().await,
            }
        }
        *last = Some(Instant::now());
        self.grants.fetch_add(1, Ordering::Relaxed);
    }

    /// Like [`acquire`](Self::acquire) but gives up after `limit`.
    ///
    /// On timeout the gate state is untouched and `FetchError::Cancelled`
    /// is returned.
    pub async fn acquire_timeout(&self, limit: Duration) -> Result<(), FetchError> {
        timeout(limit, self.acquire())
            .await
            .map_err(|_| FetchError::Cancelled)
    }

    // == Try Acquire ==
    /// Grants a permit only if one is available right now.
    ///
    /// Returns `false` without side effects when the interval has not yet
    /// elapsed or another caller is already queued.
    pub fn try_acquire(&self) -> bool {
        if self.interval.is_zero() {
            self.grants.fetch_add(1, Ordering::Relaxed);
            return true;
        }

        let Ok(mut last) = self.last_granted.try_lock() else {
            return false;
        };
        let now = Instant::now();
        let waiting = last.is_some_and(|previous| {
            previous
                .checked_add(self.interval)
                .map_or(true, |ready_at| now < ready_at)
        });
        if waiting {
            return false;
        }
        *last = Some(now);
        self.grants.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            interval_secs: self.interval.as_secs_f64(),
            grants: self.grants.load(Ordering::Relaxed),
        }
    }
}
