//! Cache Element Module
//!
//! Defines the immutable record handed to `put` and returned by `get`.

// == Element ==
/// A key/value pair with an optional per-write TTL request.
///
/// `time_to_live == 0` means "use the cache-wide default TTL". A positive
/// value requests a per-entry override, subject to the cache's resolution
/// policy. Elements are immutable once constructed; the key is the sole
/// identity field, so a second `put` with the same key replaces the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element<K, V> {
    key: K,
    value: V,
    time_to_live: u64,
}

impl<K, V> Element<K, V> {
    // == Constructors ==
    /// Creates an element that uses the cache-wide default TTL.
    pub fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            time_to_live: 0,
        }
    }

    /// Creates an element with a per-write TTL request in seconds.
    ///
    /// A value of 0 falls back to the cache-wide default.
    pub fn with_time_to_live(key: K, value: V, time_to_live: u64) -> Self {
        Self {
            key,
            value,
            time_to_live,
        }
    }

    // == Accessors ==
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// The TTL requested for this specific write, in seconds (0 = default).
    pub fn time_to_live(&self) -> u64 {
        self.time_to_live
    }

    /// Consumes the element, returning its key and value.
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}
