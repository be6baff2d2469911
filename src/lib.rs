#![deny(warnings)]

// Re-export all public modules
pub mod cache;
pub mod config;
pub mod metrics;
pub mod models;
pub mod resilience;
pub mod security;
pub mod service;
pub mod store;

// Testing utilities (always available for integration tests)
pub mod testing;

// Re-export commonly used types for convenience
pub use cache::{Cache, CacheKey, CacheStats, MemoryCache, NullCache};
pub use metrics::FoundationMetrics;
pub use resilience::{CircuitBreaker, CircuitBreakerError, CircuitState};
pub use security::{SanitizationGuard, SanitizationVerdict};
pub use service::{CollectionManager, FoundationError, FoundationService};
pub use store::{DocumentStore, Filter, MemoryStore, StoreError};
