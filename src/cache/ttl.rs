//! TTL Resolution Policy
//!
//! The single policy deciding which TTL applies to a write, shared by every
//! backend implementing the cache contract.

use crate::error::{CacheError, Result};

// == Effective TTL ==
/// Resolves the TTL to apply to a write from the per-entry request and the
/// cache-wide default. Both are in seconds; 0 means "unlimited" on the
/// configured side and "use the default" on the requested side.
///
/// Resolution:
/// - `configured == 0`: the request wins as-is (0 stays unlimited, a
///   positive request is honored even without a cache-wide default).
/// - `configured > 0, requested == 0`: the configured default applies.
/// - `configured > 0, 0 < requested <= configured`: the request applies.
/// - `configured > 0, requested > configured`: rejected with
///   [`CacheError::InvalidTtl`]. A per-entry request can shorten the
///   cache-wide ceiling but never lengthen it.
///
/// Pure and deterministic; computed exactly once per `put`.
pub fn effective_ttl_seconds(requested: u64, configured: u64) -> Result<u64> {
    if configured == 0 {
        return Ok(requested);
    }
    if requested == 0 {
        return Ok(configured);
    }
    if requested > configured {
        return Err(CacheError::InvalidTtl {
            requested,
            configured,
        });
    }
    Ok(requested)
}
