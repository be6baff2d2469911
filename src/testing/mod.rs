//! Test support: fixture documents, fast-settling configuration and a
//! failure-injecting store. Compiled into the library so integration tests
//! can use it.

pub mod flaky;

pub use flaky::FlakyStore;

use crate::config::FoundationConfig;
use crate::models::{Brand, Category, Product};

/// A product fixture with the given id
pub fn sample_product(id: &str) -> Product {
    Product {
        id: id.to_string(),
        name: format!("Aviator {}", id),
        brand_id: "brand-1".to_string(),
        category_id: "category-1".to_string(),
        price_cents: 12900,
        in_stock: true,
        tags: vec!["metal".to_string()],
    }
}

/// A brand fixture with the given id
pub fn sample_brand(id: &str) -> Brand {
    Brand {
        id: id.to_string(),
        name: format!("Brand {}", id),
        country: Some("IT".to_string()),
    }
}

/// A category fixture with the given id
pub fn sample_category(id: &str) -> Category {
    Category {
        id: id.to_string(),
        name: format!("Category {}", id),
        parent_id: None,
    }
}

/// Configuration tuned so breaker transitions settle within a test run:
/// two failures open a circuit and the cool-down is one second
pub fn test_config() -> FoundationConfig {
    let mut config = FoundationConfig::default();
    config.resilience.circuit_breaker.threshold = 2;
    config.resilience.circuit_breaker.cool_down = 1;
    config.resilience.circuit_breaker.operation_timeout = 1;
    config.cache.max_entries = 1_000;
    config
}
