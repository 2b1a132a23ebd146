//! Entry Event Module
//!
//! Defines the mutation events a cache emits and the listener contract for
//! receiving them.

use std::fmt;
use std::sync::Arc;

// == Event Type ==
/// The kind of mutation an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryEventType {
    /// A key was written that had no previous live value
    Added,
    /// A key was written over a previous live value
    Updated,
    /// A key was removed by `evict` or `clear`
    Removed,
}

// == Entry Event ==
/// A single mutation observed on a cache.
///
/// Carries the emitting cache's name, the affected key, and the value
/// transition: `Added` has no old value, `Removed` has no new value,
/// `Updated` carries both.
#[derive(Debug, Clone)]
pub struct EntryEvent<K, V> {
    source: Arc<str>,
    event_type: EntryEventType,
    key: K,
    old_value: Option<V>,
    new_value: Option<V>,
}

impl<K, V> EntryEvent<K, V> {
    pub fn new(
        source: Arc<str>,
        event_type: EntryEventType,
        key: K,
        old_value: Option<V>,
        new_value: Option<V>,
    ) -> Self {
        Self {
            source,
            event_type,
            key,
            old_value,
            new_value,
        }
    }

    // == Accessors ==
    /// Name of the cache that emitted this event.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn event_type(&self) -> EntryEventType {
        self.event_type
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn old_value(&self) -> Option<&V> {
        self.old_value.as_ref()
    }

    pub fn new_value(&self) -> Option<&V> {
        self.new_value.as_ref()
    }
}

// == Listener Id ==
/// Opaque token identifying one listener registration.
///
/// Unique per registration and the sole handle for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

// == Cache Listener ==
/// Observer of cache mutation events.
///
/// Callbacks run on the cache's delivery worker, never on the thread that
/// performed the mutation, and must not assume otherwise.
pub trait CacheListener<K, V>: Send + Sync {
    fn on_event(&self, event: &EntryEvent<K, V>);
}

/// Any `Fn(&EntryEvent)` closure is a listener.
impl<K, V, F> CacheListener<K, V> for F
where
    F: Fn(&EntryEvent<K, V>) + Send + Sync,
{
    fn on_event(&self, event: &EntryEvent<K, V>) {
        self(event)
    }
}
