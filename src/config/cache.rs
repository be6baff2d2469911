use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigError, Validate, WithDefaults};

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable the read-through cache
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl: u64,
    /// Maximum number of cached entries before eviction
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    /// Seconds between background sweeps of expired entries
    #[serde(default = "default_cache_cleanup_interval")]
    pub cleanup_interval: u64,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_cache_cleanup_interval() -> u64 {
    60 // 1 minute
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl: default_cache_ttl(),
            max_entries: default_cache_max_entries(),
            cleanup_interval: default_cache_cleanup_interval(),
        }
    }
}

impl Validate for CacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.ttl == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl must be > 0 when cache is enabled".to_string(),
            ));
        }
        if self.enabled && self.max_entries == 0 {
            return Err(ConfigError::ValidationError(
                "cache.max_entries must be > 0 when cache is enabled".to_string(),
            ));
        }
        if self.enabled && self.cleanup_interval == 0 {
            return Err(ConfigError::ValidationError(
                "cache.cleanup_interval must be > 0 when cache is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl WithDefaults for CacheConfig {
    fn with_defaults() -> Self {
        Self::default()
    }
}
