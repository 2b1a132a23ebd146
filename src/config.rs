//! Configuration Module
//!
//! Handles cache configuration, loadable from environment variables.

use std::env;

use serde::{Deserialize, Serialize};

/// Configuration for a single cache instance.
///
/// Fixed for the lifetime of the instance; there is no runtime
/// reconfiguration. All values can also be loaded from environment variables
/// with sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name of the cache, carried on every event it emits
    pub name: String,
    /// Cache-wide default TTL in seconds; 0 means entries never expire
    /// unless they carry their own positive TTL
    pub default_ttl: u64,
    /// Interval in seconds for the optional background sweep task;
    /// None disables the sweep (expiration still happens lazily)
    pub sweep_interval: Option<u64>,
}

impl CacheConfig {
    /// Creates a configuration with the given name and default TTL,
    /// background sweep disabled.
    pub fn new(name: impl Into<String>, default_ttl: u64) -> Self {
        Self {
            name: name.into(),
            default_ttl,
            sweep_interval: None,
        }
    }

    /// Enables the background sweep at the given interval in seconds.
    pub fn with_sweep_interval(mut self, seconds: u64) -> Self {
        self.sweep_interval = Some(seconds);
        self
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_NAME` - Cache name (default: "local")
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep interval in seconds; unset or 0
    ///   disables the background sweep
    pub fn from_env() -> Self {
        Self {
            name: env::var("CACHE_NAME").unwrap_or_else(|_| "local".to_string()),
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            sweep_interval: env::var("CACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&secs| secs > 0),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            default_ttl: 300,
            sweep_interval: None,
        }
    }
}
