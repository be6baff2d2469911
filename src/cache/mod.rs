use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

mod memory;
mod null;

pub use memory::MemoryCache;
pub use null::NullCache;

/// Generic cache trait for storing and retrieving data
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Get a value from the cache
    ///
    /// Returns None if the key doesn't exist or has expired
    async fn get<V>(&self, key: &str) -> Result<Option<V>>
    where
        V: for<'de> Deserialize<'de> + Send;

    /// Put a value into the cache with a TTL (time-to-live)
    ///
    /// Inserts or overwrites the value and refreshes its timestamp; the value
    /// expires after the specified duration
    async fn put<V>(&self, key: &str, value: &V, ttl: Duration) -> Result<()>
    where
        V: Serialize + Send + Sync;

    /// Remove a key from the cache
    ///
    /// Idempotent: removing an absent key is not an error
    async fn invalidate(&self, key: &str) -> Result<()>;

    /// Sweep expired entries, returning how many were removed
    async fn cleanup(&self) -> Result<usize>;

    /// Clear all keys from the cache
    async fn clear(&self) -> Result<()>;

    /// Get cache statistics
    async fn stats(&self) -> Result<CacheStats>;
}

/// Statistics about cache performance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total number of cache hits (successful gets)
    pub hits: u64,

    /// Total number of cache misses (failed gets)
    pub misses: u64,

    /// Total number of evictions (expired or removed for the size bound)
    pub evictions: u64,

    /// Current number of items in the cache
    pub size: usize,

    /// Hit rate as a ratio (0.0 to 1.0)
    pub hit_rate: f64,
}

impl CacheStats {
    /// Create new cache stats with zero values
    pub fn new() -> Self {
        Self {
            hits: 0,
            misses: 0,
            evictions: 0,
            size: 0,
            hit_rate: 0.0,
        }
    }

    /// Calculate hit rate from hits and misses
    pub fn calculate_hit_rate(&mut self) {
        let total = self.hits + self.misses;
        self.hit_rate = if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        };
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Raised when the cache's value bookkeeping and recency bookkeeping no longer
/// agree. Internal to the crate: callers never observe it while the paired
/// structures are mutated under one lock, and cleanup asserts that they still
/// agree after every sweep.
#[derive(Debug, Clone, thiserror::Error)]
#[error(
    "cache bookkeeping diverged: {value_only} keys without recency records, \
     {recency_only} recency records without values"
)]
pub struct CacheConsistencyError {
    /// Keys present in the value map with no recency record
    pub value_only: usize,
    /// Recency records whose key is gone from the value map
    pub recency_only: usize,
}

/// Builder for consistent cache key naming
pub struct CacheKey;

impl CacheKey {
    /// Build a product cache key
    pub fn product(id: impl std::fmt::Display) -> String {
        format!("product:{}", id)
    }

    /// Build a brand cache key
    pub fn brand(id: impl std::fmt::Display) -> String {
        format!("brand:{}", id)
    }

    /// Build a category cache key
    pub fn category(id: impl std::fmt::Display) -> String {
        format!("category:{}", id)
    }

    /// Build the cache key for a document in an arbitrary collection
    pub fn document(collection: &str, key: impl std::fmt::Display) -> String {
        format!("{}:{}", collection, key)
    }

    /// Build a custom cache key with a prefix
    pub fn custom(prefix: &str, key: impl std::fmt::Display) -> String {
        format!("{}:{}", prefix, key)
    }
}
