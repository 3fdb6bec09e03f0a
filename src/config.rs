//! Configuration Module
//!
//! Tunables for the coherence protocol: lock TTLs, batch window size, and
//! the cache-key length ceiling (spec §6 "Tunables"). Loadable from
//! environment variables with defaults chosen from the original
//! implementation's test fixtures.

use std::env;
use std::time::Duration;

/// Coherence-protocol configuration.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// TTL on a reader's lock item (spec §3 point 2).
    pub lock_ttl_read: Duration,
    /// TTL on a writer's lock item (spec §3 point 3). Must exceed the
    /// maximum plausible store-read duration, or a slow reader can win a
    /// CAS race against a concurrent writer (spec §4.5, "Why this is
    /// correct").
    pub lock_ttl_write: Duration,
    /// Maximum number of keys sent to the store or cache in one backend
    /// call (spec §4.4).
    pub batch_window: usize,
    /// Cache-key length ceiling; keys longer than this are digested
    /// instead (spec §4.1).
    pub max_cache_key_len: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `NDS_LOCK_TTL_READ_SECS` - reader lock TTL in seconds (default: 32)
    /// - `NDS_LOCK_TTL_WRITE_SECS` - writer lock TTL in seconds (default: 160)
    /// - `NDS_BATCH_WINDOW` - backend per-call batch ceiling (default: 1000)
    /// - `NDS_MAX_CACHE_KEY_LEN` - cache key length ceiling in bytes (default: 250)
    pub fn from_env() -> Self {
        Self {
            lock_ttl_read: Duration::from_secs(env_u64("NDS_LOCK_TTL_READ_SECS", 32)),
            lock_ttl_write: Duration::from_secs(env_u64("NDS_LOCK_TTL_WRITE_SECS", 160)),
            batch_window: env_u64("NDS_BATCH_WINDOW", 1000) as usize,
            max_cache_key_len: env_u64("NDS_MAX_CACHE_KEY_LEN", 250) as usize,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_ttl_read: Duration::from_secs(32),
            lock_ttl_write: Duration::from_secs(160),
            batch_window: 1000,
            max_cache_key_len: 250,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
