//! Cache Store Module
//!
//! The concurrent key -> value mapping backing one cache instance. The store
//! is deliberately unaware of expiration; the engine keeps it consistent
//! with the expiration tracker.

use std::hash::Hash;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

// == Store ==
/// Sharded key/value storage. Operations on different keys do not block
/// each other; operations on the same key serialize on its shard lock.
#[derive(Debug)]
pub struct Store<K: Eq + Hash, V> {
    entries: DashMap<K, V>,
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    // == Get ==
    /// Returns a clone of the value for `key`, if present.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    // == Insert ==
    /// Installs or replaces the value for `key`, returning the previous one.
    ///
    /// `on_write` runs with the previous value before the key's shard lock
    /// is released, so observers of same-key writes see them in order.
    pub fn insert_with<F>(&self, key: K, value: V, on_write: F) -> Option<V>
    where
        F: FnOnce(Option<&V>),
    {
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let previous = std::mem::replace(occupied.get_mut(), value);
                on_write(Some(&previous));
                Some(previous)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(value);
                on_write(None);
                None
            }
        }
    }

    // == Remove ==
    /// Removes `key`, returning its value if it was present.
    ///
    /// `on_remove` runs under the same shard lock as the removal.
    pub fn remove_with<F>(&self, key: &K, on_remove: F) -> Option<V>
    where
        F: FnOnce(&V),
    {
        self.entries
            .remove_if(key, |_, value| {
                on_remove(value);
                true
            })
            .map(|(_, value)| value)
    }

    /// Removes `key` without running an observer.
    #[allow(dead_code)]
    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Removes `key` only when `predicate` approves, deciding under the
    /// same shard lock as the removal.
    pub fn remove_when<F>(&self, key: &K, predicate: F) -> Option<V>
    where
        F: FnOnce(&K, &V) -> bool,
    {
        self.entries.remove_if(key, predicate).map(|(_, value)| value)
    }

    // == Iteration ==
    /// Snapshot of the currently stored keys.
    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Snapshot of the currently stored entries.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Clear ==
    /// Removes every entry without running observers.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<K, V> Default for Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
