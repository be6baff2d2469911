use serde::{Deserialize, Serialize};

use super::{ConfigError, Validate, WithDefaults};
use crate::security::DEFAULT_MAX_SCAN_LENGTH;

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    /// Input screening configuration
    #[serde(default = "SanitizationConfig::default")]
    pub sanitization: SanitizationConfig,
}

/// Input screening configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizationConfig {
    /// Screen externally supplied keys and filter values before store access
    #[serde(default = "default_sanitization_enabled")]
    pub enabled: bool,
    /// Inputs longer than this many bytes are rejected without scanning
    #[serde(default = "default_max_scan_length")]
    pub max_scan_length: usize,
}

fn default_sanitization_enabled() -> bool {
    true
}

fn default_max_scan_length() -> usize {
    DEFAULT_MAX_SCAN_LENGTH
}

impl Default for SanitizationConfig {
    fn default() -> Self {
        Self {
            enabled: default_sanitization_enabled(),
            max_scan_length: default_max_scan_length(),
        }
    }
}

impl Validate for SecurityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.sanitization.validate()?;
        Ok(())
    }
}

impl Validate for SanitizationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.max_scan_length == 0 {
            return Err(ConfigError::ValidationError(
                "security.sanitization.max_scan_length must be > 0 when sanitization is enabled"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl WithDefaults for SecurityConfig {
    fn with_defaults() -> Self {
        Self::default()
    }
}

impl WithDefaults for SanitizationConfig {
    fn with_defaults() -> Self {
        Self::default()
    }
}
