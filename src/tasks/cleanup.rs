//! TTL Cleanup Task
//!
//! Background task that periodically purges expired cache entries so memory
//! stays bounded even for keys that are never read again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;

/// Spawns a background task that purges expired entries every
/// `cleanup_interval_secs` seconds.
///
/// Returns the task handle so it can be aborted during graceful shutdown.
pub fn spawn_cleanup_task<V>(cache: TtlCache<V>, cleanup_interval_secs: u64) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            cleanup_interval_secs
        );

        let Some(first_tick) = tokio::time::Instant::now().checked_add(interval) else {
            warn!(
                "Cleanup interval of {} seconds is out of range, relying on lazy expiry",
                cleanup_interval_secs
            );
            return;
        };
        let mut ticker = tokio::time::interval_at(first_tick, interval);
        loop {
            ticker.tick().await;

            let removed = cache.purge_expired();
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
