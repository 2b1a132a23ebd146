//! Cache Contract Module
//!
//! The uniform contract every cache backend satisfies, whether it is the
//! embedded engine in this crate or an adapter delegating to an externally
//! managed store. Alternate backends must preserve the same TTL-resolution
//! policy, the absent-is-not-an-error semantics, and the event shape.

use std::sync::Arc;

use crate::cache::entry::Element;
use crate::error::Result;
use crate::notify::{CacheListener, ListenerId};

// == Cache Trait ==
pub trait Cache<K, V>: Send + Sync {
    /// Name of this cache instance.
    fn name(&self) -> &str;

    /// Count of live (not due) entries.
    fn size(&self) -> usize;

    /// Looks up a key. Absence is not an error; due entries are never
    /// returned, even before physical removal.
    fn get(&self, key: &K) -> Option<Element<K, V>>;

    /// Installs or replaces a value, returning the previous live value.
    ///
    /// The only failure is a per-entry TTL the resolution policy rejects.
    /// Emits `Added` when there was no previous live value, `Updated`
    /// otherwise.
    fn put(&self, element: Element<K, V>) -> Result<Option<V>>;

    /// Removes a key, returning its live value. Evicting an absent key is a
    /// no-op returning `None`. Emits `Removed` when a live value was
    /// dropped.
    fn evict(&self, key: &K) -> Option<V>;

    /// Removes every entry, emitting one `Removed` event per live key.
    fn clear(&self);

    /// Registers a mutation listener, returning its removal token.
    fn add_listener(&self, listener: Arc<dyn CacheListener<K, V>>) -> ListenerId;

    /// Removes a listener registration; false for unknown tokens.
    fn remove_listener(&self, id: ListenerId) -> bool;
}
