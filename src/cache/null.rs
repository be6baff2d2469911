use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::{Cache, CacheStats};

/// A no-op cache implementation for testing purposes
///
/// `NullCache` implements the `Cache` trait but performs no actual caching
/// operations. All operations are no-ops and return empty values. This is
/// useful when cache behavior should be taken out of the picture.
///
/// # Use Cases
/// - Unit testing components that depend on a cache without needing to mock
/// - Verifying that a flow is correct when every read goes to the store
/// - Deployments where caching is disabled by configuration
///
/// # Example
/// ```
/// use catalog_foundation::cache::{Cache, NullCache};
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let cache = NullCache::new();
///
/// // get() always returns None
/// let value: Option<String> = cache.get("key").await?;
/// assert_eq!(value, None);
///
/// // put() does nothing
/// cache.put("key", &"value", Duration::from_secs(60)).await?;
///
/// // stats() returns empty statistics
/// let stats = cache.stats().await?;
/// assert_eq!(stats.hits, 0);
/// assert_eq!(stats.misses, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NullCache;

impl NullCache {
    /// Create a new `NullCache` instance
    pub fn new() -> Self {
        NullCache
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NullCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NullCache")
    }
}

#[async_trait]
impl Cache for NullCache {
    /// Always returns `Ok(None)` since no values are stored
    async fn get<V>(&self, _key: &str) -> Result<Option<V>>
    where
        V: for<'de> Deserialize<'de> + Send,
    {
        Ok(None)
    }

    /// Does nothing and returns `Ok(())`
    async fn put<V>(&self, _key: &str, _value: &V, _ttl: Duration) -> Result<()>
    where
        V: Serialize + Send + Sync,
    {
        Ok(())
    }

    /// Does nothing and returns `Ok(())`
    async fn invalidate(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    /// Nothing is stored, so nothing is ever swept
    async fn cleanup(&self) -> Result<usize> {
        Ok(0)
    }

    /// Does nothing and returns `Ok(())`
    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    /// Returns `Ok(CacheStats::new())` with all zero values
    async fn stats(&self) -> Result<CacheStats> {
        Ok(CacheStats::new())
    }
}
