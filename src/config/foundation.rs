use serde::{Deserialize, Serialize};

use super::{CacheConfig, ConfigError, ResilienceConfig, SecurityConfig, Validate, WithDefaults};

/// Top-level foundation configuration that aggregates all config modules
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FoundationConfig {
    /// Application metadata
    #[serde(default = "AppMetadata::default")]
    pub app: AppMetadata,
    /// Cache configuration (TTL, size bound, sweep interval)
    #[serde(default = "CacheConfig::default")]
    pub cache: CacheConfig,
    /// Resilience configuration (circuit breaker)
    #[serde(default = "ResilienceConfig::default")]
    pub resilience: ResilienceConfig,
    /// Security configuration (input screening)
    #[serde(default = "SecurityConfig::default")]
    pub security: SecurityConfig,
}

/// Application metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
    /// Application environment (development, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_app_name() -> String {
    "catalog-foundation".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
            environment: default_environment(),
        }
    }
}

impl Validate for AppMetadata {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "app.name cannot be empty".to_string(),
            ));
        }
        if self.version.is_empty() {
            return Err(ConfigError::ValidationError(
                "app.version cannot be empty".to_string(),
            ));
        }
        if self.environment.is_empty() {
            return Err(ConfigError::ValidationError(
                "app.environment cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Validate for FoundationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.app.validate()?;
        self.cache.validate()?;
        self.resilience.validate()?;
        self.security.validate()?;
        Ok(())
    }
}

impl WithDefaults for FoundationConfig {
    fn with_defaults() -> Self {
        Self {
            app: AppMetadata::default(),
            cache: CacheConfig::with_defaults(),
            resilience: ResilienceConfig::with_defaults(),
            security: SecurityConfig::with_defaults(),
        }
    }
}

/// Load configuration from files and environment variables
///
/// Configuration loading follows this precedence (highest to lowest):
/// 1. Environment variables: CATALOG_FOUNDATION__CACHE__TTL=120
/// 2. config/local.toml (git-ignored, developer overrides)
/// 3. config/{APP_ENV}.toml (development/staging/production)
/// 4. config/default.toml (base defaults)
pub fn load_config() -> Result<FoundationConfig, ConfigError> {
    use config::{Config, Environment, File};

    // Determine the environment
    let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

    // Build configuration with layered sources
    let config = Config::builder()
        // Layer 1: Base defaults
        .add_source(File::with_name("config/default").required(false))
        // Layer 2: Environment-specific overrides
        .add_source(File::with_name(&format!("config/{}", env)).required(false))
        // Layer 3: Local developer overrides (git-ignored)
        .add_source(File::with_name("config/local").required(false))
        // Layer 4: Environment variables (highest precedence)
        .add_source(Environment::with_prefix("CATALOG_FOUNDATION").separator("__"))
        .build()?;

    // Deserialize into FoundationConfig
    let foundation_config: FoundationConfig = config.try_deserialize()?;

    // Validate the configuration
    foundation_config.validate()?;

    Ok(foundation_config)
}
