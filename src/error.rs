//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// Absence of a key is an expected outcome of normal use and is expressed
/// with `Option` results, never through this type. The only failure the
/// contract defines is a `put` whose requested TTL violates the policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A per-entry TTL exceeded the cache-wide ceiling
    #[error("invalid time to live: requested {requested}s exceeds the configured limit of {configured}s")]
    InvalidTtl { requested: u64, configured: u64 },
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
