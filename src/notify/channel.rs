//! Notification Channel Module
//!
//! Decouples listener invocation from the mutating thread. Every mutation
//! enqueues an event onto a single-consumer queue; one delivery worker per
//! cache instance drains it strictly in submission order and invokes every
//! currently registered listener. A panicking listener is skipped for that
//! event and the worker keeps going.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::notify::event::{CacheListener, EntryEvent, ListenerId};

type ListenerMap<K, V> = HashMap<ListenerId, Arc<dyn CacheListener<K, V>>>;

// == Notification Channel ==
/// Event queue, listener registry, and delivery worker for one cache.
pub struct NotificationChannel<K, V> {
    sender: Mutex<Option<mpsc::UnboundedSender<EntryEvent<K, V>>>>,
    listeners: Arc<RwLock<ListenerMap<K, V>>>,
    next_listener_id: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> NotificationChannel<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    // == Constructor ==
    /// Creates the channel and spawns its delivery worker.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<EntryEvent<K, V>>();
        let listeners: Arc<RwLock<ListenerMap<K, V>>> = Arc::new(RwLock::new(HashMap::new()));

        let worker_listeners = Arc::clone(&listeners);
        let worker = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                // Snapshot under the read lock, deliver outside it, so a slow
                // listener never blocks registration or removal.
                let snapshot: Vec<(ListenerId, Arc<dyn CacheListener<K, V>>)> = worker_listeners
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .map(|(id, listener)| (*id, Arc::clone(listener)))
                    .collect();

                for (id, listener) in snapshot {
                    if catch_unwind(AssertUnwindSafe(|| listener.on_event(&event))).is_err() {
                        warn!(
                            "cache '{}': {} panicked handling an event; skipping it for this event",
                            event.source(),
                            id
                        );
                    }
                }
            }
        });

        Self {
            sender: Mutex::new(Some(sender)),
            listeners,
            next_listener_id: AtomicU64::new(0),
            worker: Mutex::new(Some(worker)),
        }
    }
}

impl<K, V> NotificationChannel<K, V> {
    // == Publish ==
    /// Enqueues an event for delivery. Never blocks; after shutdown the
    /// event is silently dropped.
    pub fn publish(&self, event: EntryEvent<K, V>) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = sender.as_ref() {
            // Only fails when the worker is gone, i.e. during teardown.
            let _ = sender.send(event);
        }
    }

    // == Listener Registry ==
    /// Registers a listener, returning its unique token.
    pub fn add_listener(&self, listener: Arc<dyn CacheListener<K, V>>) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener);
        id
    }

    /// Removes a listener registration. Returns false for unknown tokens.
    ///
    /// Takes effect for future events only: an event already queued may
    /// still be delivered to the removed listener.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    // == Shutdown ==
    /// Closes the queue. The worker drains what is already queued, then
    /// exits; delivery of those events is best-effort. Idempotent.
    pub fn shutdown(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        // The worker handle is dropped rather than aborted so queued events
        // still drain; the task exits as soon as the queue is empty.
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl<K, V> std::fmt::Debug for NotificationChannel<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self
            .listeners
            .read()
            .map(|map| map.len())
            .unwrap_or_default();
        f.debug_struct("NotificationChannel")
            .field("listeners", &listeners)
            .finish_non_exhaustive()
    }
}

impl<K, V> Drop for NotificationChannel<K, V> {
    fn drop(&mut self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}
