//! Expiration Sweep Task
//!
//! Background task that periodically reaps expired cache entries. The sweep
//! exists purely to bound memory when a cache sits idle; every cache
//! operation already reaps inline, and correctness never depends on the
//! sweep running.

use std::hash::Hash;
use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::engine::CacheInner;

/// Spawns a task that reaps expired entries at a fixed interval.
///
/// The task holds only a weak handle, so it never keeps a dropped cache
/// alive; it exits on its own once the cache is gone or destroyed. The
/// returned handle is aborted during `destroy`.
pub(crate) fn spawn_sweep_task<K, V>(
    cache: Weak<CacheInner<K, V>>,
    interval: Duration,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            "starting expiration sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let Some(cache) = cache.upgrade() else {
                break;
            };
            if cache.is_destroyed() {
                break;
            }

            let removed = cache.reap_expired();
            if removed > 0 {
                info!(
                    "cache '{}': sweep removed {} expired entries",
                    cache.name(),
                    removed
                );
            } else {
                debug!("cache '{}': sweep found no expired entries", cache.name());
            }
        }
    })
}
