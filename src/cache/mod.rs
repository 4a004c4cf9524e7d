//! Cache port consumed by the efficiency service.
//!
//! Every operation is fallible. The service treats any [`CacheError`] as a
//! miss (reads) or a no-op (writes and invalidations), so adapters report
//! failures instead of hiding them.

pub mod keys;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use keys::{CacheKeys, DEFAULT_CACHE_TTL_SECONDS, DEFAULT_KEY_PREFIX};
pub use memory::{InMemoryCache, NoopCache};

/// Cache-specific errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache payload error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// String key/value store with per-entry expiry and glob invalidation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a value; `Ok(None)` on a miss or an expired entry.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value that expires after `ttl_seconds`.
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Delete every key matching a glob (`*` and `?`). Returns the number of
    /// keys removed.
    async fn delete_by_pattern(&self, pattern: &str) -> CacheResult<u64>;
}

/// Counters describing how reads were served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Cached payloads that failed to decode and were re-read from the store
    pub decode_failures: u64,
    /// Cache operations that returned an error and were discarded
    pub cache_errors: u64,
}

impl CacheStats {
    /// Hit rate in `[0.0, 1.0]`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
