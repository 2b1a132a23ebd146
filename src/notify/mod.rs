//! Notification Module
//!
//! Mutation events, the listener contract, and the per-cache delivery
//! channel that invokes listeners off the calling thread.

mod channel;
mod event;

// Re-export public types
pub use channel::NotificationChannel;
pub use event::{CacheListener, EntryEvent, EntryEventType, ListenerId};
