//! Resilience patterns for the data-access core
//!
//! This module provides the circuit breaker that stands between collection
//! managers and the backing store, so a failing store degrades into fast,
//! cheap rejections instead of a pile-up of hung calls.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use catalog_foundation::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create a circuit breaker for a guarded collection
//! let config = CircuitBreakerConfig {
//!     failure_threshold: 5,
//!     cool_down: Duration::from_secs(60),
//!     operation_timeout: Some(Duration::from_secs(10)),
//! };
//!
//! let cb = CircuitBreaker::with_config("products".to_string(), config);
//!
//! // Use it to protect your calls
//! let result = cb.call(async {
//!     // Your risky operation here
//!     Ok::<_, std::io::Error>(())
//! }).await;
//! # Ok(())
//! # }
//! ```

mod circuit_breaker;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerStats, CircuitState,
};
