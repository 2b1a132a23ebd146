//! Expiration Tracker Module
//!
//! Tracks, per key, when the key's current TTL window ends, and discovers
//! due keys without scanning the whole key space. Windows live in a
//! concurrent map; a min-ordered queue of (due instant, generation, key)
//! makes `poll_due` cheap. Queue entries are never removed eagerly: a write
//! that replaces a window bumps the generation, so a stale queue entry is
//! simply discarded when it surfaces. A renewed window is re-enqueued at its
//! true deadline when its original queue entry fires early.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

// == Window ==
/// The tracked expiration state of a single key.
///
/// `duration == None` marks a key that never expires; it is still tracked so
/// that the store and the tracker stay in strict one-to-one correspondence.
#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    duration: Option<Duration>,
    generation: u64,
}

impl Window {
    fn deadline(&self) -> Option<Instant> {
        self.duration.and_then(|d| self.start.checked_add(d))
    }

    fn is_due(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| deadline <= now)
    }
}

// == Due Entry ==
/// A queue record ordered by due instant, earliest first (via `Reverse`).
#[derive(Debug)]
struct DueEntry<K> {
    due_at: Instant,
    generation: u64,
    key: K,
}

impl<K> PartialEq for DueEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.due_at == other.due_at && self.generation == other.generation
    }
}

impl<K> Eq for DueEntry<K> {}

impl<K> PartialOrd for DueEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for DueEntry<K> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due_at
            .cmp(&other.due_at)
            .then(self.generation.cmp(&other.generation))
    }
}

// == Expiration Tracker ==
/// Per-key expiration bookkeeping for one cache instance.
///
/// Invariant: while a key has a window with a deadline, the queue holds at
/// least one entry for it whose due instant is not later than that deadline.
/// `poll_due` therefore catches every due key without a full scan.
#[derive(Debug)]
pub struct ExpirationTracker<K: Eq + Hash> {
    windows: DashMap<K, Window>,
    queue: Mutex<BinaryHeap<Reverse<DueEntry<K>>>>,
    generation: AtomicU64,
}

impl<K> ExpirationTracker<K>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
            queue: Mutex::new(BinaryHeap::new()),
            generation: AtomicU64::new(0),
        }
    }

    // == Track ==
    /// Installs a fresh window for `key` with the given effective TTL.
    ///
    /// Any previous window is replaced; its queue entries become stale
    /// through the generation bump, so a late reap of the old window can
    /// never remove the newly written value. A TTL of 0 installs a
    /// never-due window and enqueues nothing.
    ///
    /// Returns true if the key previously had a live (not yet due) window.
    pub fn track(&self, key: K, ttl_seconds: u64, now: Instant) -> bool {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let window = Window {
            start: now,
            duration: (ttl_seconds > 0).then(|| Duration::from_secs(ttl_seconds)),
            generation,
        };
        let due_at = window.deadline();

        let previous = self.windows.insert(key.clone(), window);
        if let Some(due_at) = due_at {
            self.lock_queue().push(Reverse(DueEntry {
                due_at,
                generation,
                key,
            }));
        }

        previous.map(|w| !w.is_due(now)).unwrap_or(false)
    }

    // == Renew ==
    /// Restarts the window for `key` (sliding expiration).
    ///
    /// Returns true if the key had a live window; a due or untracked key is
    /// left alone. The queue entry keeps its original due instant and is
    /// re-enqueued at the extended deadline when it fires.
    pub fn renew(&self, key: &K, now: Instant) -> bool {
        match self.windows.get_mut(key) {
            Some(mut window) if !window.is_due(now) => {
                window.start = now;
                true
            }
            _ => false,
        }
    }

    // == Invalidate ==
    /// Drops the window for `key` immediately.
    ///
    /// Returns true if the key had a live window.
    pub fn invalidate(&self, key: &K, now: Instant) -> bool {
        self.windows
            .remove(key)
            .map(|(_, window)| !window.is_due(now))
            .unwrap_or(false)
    }

    // == Poll Due ==
    /// Removes and returns every key whose window has elapsed at `now`.
    ///
    /// Amortized O(log n) per due key; O(1) when nothing is due. Stale queue
    /// entries (superseded or invalidated windows) are discarded; entries for
    /// renewed windows are pushed back at their true deadline.
    pub fn poll_due(&self, now: Instant) -> Vec<K> {
        let mut due = Vec::new();
        let mut queue = self.lock_queue();

        while queue
            .peek()
            .is_some_and(|Reverse(head)| head.due_at <= now)
        {
            let Some(Reverse(entry)) = queue.pop() else {
                break;
            };

            let deadline = match self.windows.get(&entry.key) {
                Some(window) if window.generation == entry.generation => window.deadline(),
                _ => continue,
            };

            match deadline {
                Some(deadline) if deadline <= now => {
                    let removed = self
                        .windows
                        .remove_if(&entry.key, |_, w| w.generation == entry.generation)
                        .is_some();
                    if removed {
                        due.push(entry.key);
                    }
                }
                Some(deadline) => {
                    // Renewed since it was queued; wait for the extended window.
                    queue.push(Reverse(DueEntry {
                        due_at: deadline,
                        generation: entry.generation,
                        key: entry.key,
                    }));
                }
                None => {}
            }
        }

        due
    }

    // == Contains ==
    /// True while `key` has a window, due or not.
    pub fn contains(&self, key: &K) -> bool {
        self.windows.contains_key(key)
    }

    // == Clear ==
    /// Drops every window and queue entry.
    pub fn clear(&self) {
        self.windows.clear();
        self.lock_queue().clear();
    }

    // == Tracked Count ==
    /// Number of tracked keys, due or not.
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Recovers the queue even if a panic poisoned the lock; the heap itself
    /// is always structurally valid.
    fn lock_queue(&self) -> std::sync::MutexGuard<'_, BinaryHeap<Reverse<DueEntry<K>>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K> Default for ExpirationTracker<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
