use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigError, Validate, WithDefaults};

/// Resilience configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResilienceConfig {
    /// Circuit breaker configuration
    #[serde(default = "CircuitBreakerConfig::default")]
    pub circuit_breaker: CircuitBreakerConfig,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Enable circuit breaking around store calls
    #[serde(default = "default_circuit_breaker_enabled")]
    pub enabled: bool,
    /// Number of failures within one closed period before opening the circuit
    #[serde(default = "default_circuit_breaker_threshold")]
    pub threshold: u32,
    /// Seconds an open circuit waits before admitting a trial call
    #[serde(default = "default_circuit_breaker_cool_down")]
    pub cool_down: u64,
    /// Per-call deadline in seconds; 0 disables the deadline
    #[serde(default = "default_circuit_breaker_operation_timeout")]
    pub operation_timeout: u64,
}

fn default_circuit_breaker_enabled() -> bool {
    true
}

fn default_circuit_breaker_threshold() -> u32 {
    5
}

fn default_circuit_breaker_cool_down() -> u64 {
    60 // 1 minute
}

fn default_circuit_breaker_operation_timeout() -> u64 {
    10
}

impl CircuitBreakerConfig {
    /// Translate into the breaker's own configuration type
    pub fn to_breaker_config(&self) -> crate::resilience::CircuitBreakerConfig {
        crate::resilience::CircuitBreakerConfig {
            failure_threshold: self.threshold,
            cool_down: Duration::from_secs(self.cool_down),
            operation_timeout: if self.operation_timeout == 0 {
                None
            } else {
                Some(Duration::from_secs(self.operation_timeout))
            },
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: default_circuit_breaker_enabled(),
            threshold: default_circuit_breaker_threshold(),
            cool_down: default_circuit_breaker_cool_down(),
            operation_timeout: default_circuit_breaker_operation_timeout(),
        }
    }
}

impl Validate for ResilienceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.circuit_breaker.validate()?;
        Ok(())
    }
}

impl Validate for CircuitBreakerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.threshold == 0 {
            return Err(ConfigError::ValidationError(
                "resilience.circuit_breaker.threshold must be > 0 when circuit breaker is enabled"
                    .to_string(),
            ));
        }
        if self.enabled && self.cool_down == 0 {
            return Err(ConfigError::ValidationError(
                "resilience.circuit_breaker.cool_down must be > 0 when circuit breaker is enabled"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl WithDefaults for ResilienceConfig {
    fn with_defaults() -> Self {
        Self::default()
    }
}

impl WithDefaults for CircuitBreakerConfig {
    fn with_defaults() -> Self {
        Self::default()
    }
}
