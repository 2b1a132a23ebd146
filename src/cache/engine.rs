//! Cache Engine Module
//!
//! Composes the store, the expiration tracker, the notification channel,
//! and the statistics counters behind the cache contract. Every operation
//! starts with a reap pass, so expired entries never linger past the next
//! access; the optional background sweep only exists to bound memory when
//! the cache sits idle.

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cache::contract::Cache;
use crate::cache::entry::Element;
use crate::cache::expiry::ExpirationTracker;
use crate::cache::stats::{CacheStats, StatsSnapshot};
use crate::cache::store::Store;
use crate::cache::ttl::effective_ttl_seconds;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::notify::{CacheListener, EntryEvent, EntryEventType, ListenerId, NotificationChannel};
use crate::tasks::spawn_sweep_task;

// == Local Cache ==
/// The embedded cache engine.
///
/// A `LocalCache` is a cheap handle; clones share the same instance. The
/// engine is safe to use from any number of threads: operations on
/// different keys do not block each other, and updates to one key appear
/// atomic to concurrent readers.
///
/// Expiration is sliding: a successful `get` restarts the key's TTL window.
///
/// Construction spawns the event delivery worker and must happen within a
/// Tokio runtime.
#[derive(Debug)]
pub struct LocalCache<K: Eq + Hash, V> {
    inner: Arc<CacheInner<K, V>>,
}

impl<K: Eq + Hash, V> Clone for LocalCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[derive(Debug)]
pub(crate) struct CacheInner<K: Eq + Hash, V> {
    name: Arc<str>,
    default_ttl: u64,
    store: Store<K, V>,
    tracker: ExpirationTracker<K>,
    channel: NotificationChannel<K, V>,
    stats: CacheStats,
    destroyed: AtomicBool,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> LocalCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a named cache with the given cache-wide default TTL in
    /// seconds (0 = entries never expire unless they request a TTL).
    pub fn new(name: impl Into<String>, default_ttl: u64) -> Self {
        Self::with_config(CacheConfig::new(name, default_ttl))
    }

    /// Creates a cache from a full configuration, spawning the background
    /// sweep task when an interval is configured.
    pub fn with_config(config: CacheConfig) -> Self {
        let inner = Arc::new(CacheInner {
            name: Arc::from(config.name.as_str()),
            default_ttl: config.default_ttl,
            store: Store::new(),
            tracker: ExpirationTracker::new(),
            channel: NotificationChannel::new(),
            stats: CacheStats::new(),
            destroyed: AtomicBool::new(false),
            sweeper: Mutex::new(None),
        });

        if let Some(seconds) = config.sweep_interval {
            let handle = spawn_sweep_task(Arc::downgrade(&inner), Duration::from_secs(seconds));
            *inner
                .sweeper
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(handle);
        }

        info!(
            "cache '{}' created (default ttl {}s)",
            inner.name, inner.default_ttl
        );
        Self { inner }
    }

    // == Get ==
    /// Looks up a key, renewing its TTL window on a hit.
    ///
    /// A key whose window has elapsed is treated as absent even if the
    /// reaper has not physically removed it yet.
    pub fn get(&self, key: &K) -> Option<Element<K, V>> {
        if self.inner.is_destroyed() {
            return None;
        }
        self.inner.reap_expired();

        let now = Instant::now();
        if !self.inner.tracker.renew(key, now) {
            self.inner.stats.record_miss();
            return None;
        }
        match self.inner.store.get(key) {
            Some(value) => {
                self.inner.stats.record_hit();
                Some(Element::new(key.clone(), value))
            }
            None => {
                self.inner.stats.record_miss();
                None
            }
        }
    }

    // == Put ==
    /// Installs or replaces the value for the element's key.
    ///
    /// The element's TTL request is resolved against the cache-wide default
    /// first; a request above a configured ceiling fails with
    /// [`CacheError::InvalidTtl`](crate::error::CacheError) and changes
    /// nothing. Returns the previous live value. Emits `Added` when there
    /// was none, `Updated` otherwise.
    pub fn put(&self, element: Element<K, V>) -> Result<Option<V>> {
        let ttl = effective_ttl_seconds(element.time_to_live(), self.inner.default_ttl)?;
        if self.inner.is_destroyed() {
            return Ok(None);
        }
        self.inner.reap_expired();

        let now = Instant::now();
        let (key, value) = element.into_parts();

        // Window and value are installed under the key's shard lock, so the
        // update appears atomic to readers, evictors, and the reaper.
        let inner = &self.inner;
        let track_key = key.clone();
        let event_key = key.clone();
        let new_value = value.clone();
        let mut was_live = false;
        let previous = inner.store.insert_with(key, value, |prev| {
            was_live = inner.tracker.track(track_key, ttl, now);
            let old_value = if was_live { prev.cloned() } else { None };
            let event_type = if old_value.is_some() {
                EntryEventType::Updated
            } else {
                EntryEventType::Added
            };
            inner.channel.publish(EntryEvent::new(
                Arc::clone(&inner.name),
                event_type,
                event_key,
                old_value,
                Some(new_value),
            ));
        });

        inner.stats.record_put();
        Ok(previous.filter(|_| was_live))
    }

    // == Evict ==
    /// Removes a key, returning its live value.
    ///
    /// Evicting an absent (or already expired) key is a no-op returning
    /// `None` and emitting nothing.
    pub fn evict(&self, key: &K) -> Option<V> {
        if self.inner.is_destroyed() {
            return None;
        }
        self.inner.reap_expired();

        let now = Instant::now();
        let inner = &self.inner;
        let mut was_live = false;
        let removed = inner.store.remove_with(key, |value| {
            was_live = inner.tracker.invalidate(key, now);
            if was_live {
                inner.channel.publish(EntryEvent::new(
                    Arc::clone(&inner.name),
                    EntryEventType::Removed,
                    key.clone(),
                    Some(value.clone()),
                    None,
                ));
            }
        });

        let removed = removed.filter(|_| was_live);
        if removed.is_some() {
            inner.stats.record_eviction();
        }
        removed
    }

    // == Clear ==
    /// Removes every entry, emitting one `Removed` event per live key.
    ///
    /// Removal is per-key atomic: a key written concurrently with `clear`
    /// either survives or is removed with its event; it is never silently
    /// dropped, and no key is announced twice.
    pub fn clear(&self) {
        if self.inner.is_destroyed() {
            return;
        }

        let now = Instant::now();
        let inner = &self.inner;
        for key in inner.store.keys() {
            inner.store.remove_with(&key, |value| {
                if inner.tracker.invalidate(&key, now) {
                    inner.channel.publish(EntryEvent::new(
                        Arc::clone(&inner.name),
                        EntryEventType::Removed,
                        key.clone(),
                        Some(value.clone()),
                        None,
                    ));
                }
            });
        }
    }

    // == Size ==
    /// Count of live entries as of the call.
    pub fn size(&self) -> usize {
        if self.inner.is_destroyed() {
            return 0;
        }
        self.inner.reap_expired();
        self.inner.store.len()
    }

    // == Entries ==
    /// Snapshot of the live entries.
    pub fn entries(&self) -> Vec<(K, V)> {
        if self.inner.is_destroyed() {
            return Vec::new();
        }
        self.inner.reap_expired();
        self.inner.store.entries()
    }

    // == Listeners ==
    /// Registers a mutation listener, returning its removal token.
    pub fn add_listener(&self, listener: Arc<dyn CacheListener<K, V>>) -> ListenerId {
        self.inner.channel.add_listener(listener)
    }

    /// Removes a listener registration; false for unknown tokens.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.channel.remove_listener(id)
    }

    // == Name ==
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    // == Stats ==
    /// Point-in-time metrics for this instance.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    // == Reap ==
    /// Removes every entry whose TTL window has elapsed.
    ///
    /// Called implicitly by every operation; exposed for callers (and the
    /// sweep task) that want to reclaim memory without touching the cache.
    /// Returns the number of entries removed.
    pub fn reap_expired(&self) -> usize {
        if self.inner.is_destroyed() {
            return 0;
        }
        self.inner.reap_expired()
    }

    // == Destroy ==
    /// Tears the instance down: stops the sweep task, closes the
    /// notification channel (already queued events drain best-effort), and
    /// releases all entries. Idempotent; operations on a destroyed cache
    /// are inert.
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    /// True once `destroy` has been called.
    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }
}

impl<K, V> CacheInner<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub(crate) fn reap_expired(&self) -> usize {
        let due = self.tracker.poll_due(Instant::now());
        let mut removed = 0;
        for key in due {
            // A concurrent put may have re-tracked the key after its old
            // window was polled; the fresh window protects the new value.
            let reaped = self
                .store
                .remove_when(&key, |_, _| !self.tracker.contains(&key));
            if reaped.is_some() {
                self.stats.record_expiration();
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("cache '{}': reaped {} expired entries", self.name, removed);
        }
        removed
    }

    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.channel.shutdown();
        self.store.clear();
        self.tracker.clear();
        info!("cache '{}' destroyed", self.name);
    }
}

impl<K: Eq + Hash, V> Drop for CacheInner<K, V> {
    fn drop(&mut self) {
        if !self.destroyed.swap(true, Ordering::AcqRel) {
            if let Some(handle) = self
                .sweeper
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
            {
                handle.abort();
            }
            self.channel.shutdown();
        }
    }
}

// == Contract Implementation ==
impl<K, V> Cache<K, V> for LocalCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        LocalCache::name(self)
    }

    fn size(&self) -> usize {
        LocalCache::size(self)
    }

    fn get(&self, key: &K) -> Option<Element<K, V>> {
        LocalCache::get(self, key)
    }

    fn put(&self, element: Element<K, V>) -> Result<Option<V>> {
        LocalCache::put(self, element)
    }

    fn evict(&self, key: &K) -> Option<V> {
        LocalCache::evict(self, key)
    }

    fn clear(&self) {
        LocalCache::clear(self)
    }

    fn add_listener(&self, listener: Arc<dyn CacheListener<K, V>>) -> ListenerId {
        LocalCache::add_listener(self, listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        LocalCache::remove_listener(self, id)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    fn cache(default_ttl: u64) -> LocalCache<String, String> {
        LocalCache::new("test", default_ttl)
    }

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let cache = cache(300);

        let previous = cache
            .put(Element::new("key1".to_string(), "value1".to_string()))
            .unwrap();
        assert_eq!(previous, None);

        let element = cache.get(&"key1".to_string()).unwrap();
        assert_eq!(element.value(), "value1");
        assert_eq!(cache.size(), 1);
    }

    #[tokio::test]
    async fn test_put_returns_previous_value() {
        let cache = cache(300);

        cache
            .put(Element::new("key1".to_string(), "value1".to_string()))
            .unwrap();
        let previous = cache
            .put(Element::new("key1".to_string(), "value2".to_string()))
            .unwrap();

        assert_eq!(previous, Some("value1".to_string()));
        assert_eq!(cache.size(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_ttl_above_ceiling() {
        let cache = cache(2);

        let result = cache.put(Element::with_time_to_live(
            "key1".to_string(),
            "value1".to_string(),
            5,
        ));

        assert_eq!(
            result,
            Err(CacheError::InvalidTtl {
                requested: 5,
                configured: 2,
            })
        );
        assert_eq!(cache.get(&"key1".to_string()), None);
        assert_eq!(cache.size(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_accounts_for_expired_entries() {
        let cache = cache(1);

        cache
            .put(Element::new("key1".to_string(), "value1".to_string()))
            .unwrap();
        assert_eq!(cache.size(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.size(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_skips_expired() {
        let cache = cache(0);

        cache
            .put(Element::with_time_to_live(
                "short".to_string(),
                "v1".to_string(),
                1,
            ))
            .unwrap();
        cache
            .put(Element::new("forever".to_string(), "v2".to_string()))
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        let entries = cache.entries();
        assert_eq!(entries, vec![("forever".to_string(), "v2".to_string())]);
    }

    #[tokio::test]
    async fn test_evict_absent_key_is_noop() {
        let cache = cache(300);

        assert_eq!(cache.evict(&"missing".to_string()), None);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let cache = cache(300);

        cache
            .put(Element::new("key1".to_string(), "value1".to_string()))
            .unwrap();
        cache.destroy();
        cache.destroy();

        assert!(cache.is_destroyed());
        assert_eq!(cache.get(&"key1".to_string()), None);
        assert_eq!(cache.size(), 0);
        assert_eq!(
            cache
                .put(Element::new("key1".to_string(), "value1".to_string()))
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_stats_track_operations() {
        let cache = cache(300);

        cache
            .put(Element::new("key1".to_string(), "value1".to_string()))
            .unwrap();
        cache.get(&"key1".to_string());
        cache.get(&"missing".to_string());
        cache.evict(&"key1".to_string());

        let stats = cache.stats();
        assert_eq!(stats.puts, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
    }

    #[tokio::test]
    async fn test_cache_handle_is_shared() {
        let cache = cache(300);
        let other = cache.clone();

        cache
            .put(Element::new("key1".to_string(), "value1".to_string()))
            .unwrap();

        assert_eq!(other.size(), 1);
        assert_eq!(other.name(), "test");
    }
}
