pub mod cache;
pub mod foundation;
pub mod resilience;
pub mod security;

pub use cache::CacheConfig;
pub use foundation::{AppMetadata, FoundationConfig};
pub use resilience::{CircuitBreakerConfig, ResilienceConfig};
pub use security::{SanitizationConfig, SecurityConfig};

use thiserror::Error;

/// Configuration loading or validation error
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A source file or environment variable could not be read or parsed
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] ::config::ConfigError),

    /// A loaded value is out of range or inconsistent
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Semantic validation, run after deserialization
pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Construct a configuration with every field at its default
pub trait WithDefaults {
    fn with_defaults() -> Self;
}

/// Load the foundation configuration from files and environment variables
pub fn load() -> Result<FoundationConfig, ConfigError> {
    foundation::load_config()
}
