//! Example walking through the foundation service layer by layer
//!
//! Run with:
//! ```bash
//! cargo run --example foundation_usage
//! ```

use std::sync::Arc;
use std::time::Duration;

use catalog_foundation::config::FoundationConfig;
use catalog_foundation::models::Product;
use catalog_foundation::security::SanitizationGuard;
use catalog_foundation::service::{FoundationError, FoundationService};
use catalog_foundation::store::MemoryStore;
use catalog_foundation::testing::FlakyStore;
use catalog_foundation::CacheKey;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=== Catalog Foundation Examples ===\n");

    println!("1. Documents and read-through caching:");
    documents_and_caching().await?;

    println!("\n2. Input screening:");
    input_screening().await?;

    println!("\n3. Circuit breaking against a failing store:");
    circuit_breaking().await?;

    Ok(())
}

async fn documents_and_caching() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let service = FoundationService::with_memory_cache(store, FoundationConfig::default());

    let product = Product {
        id: "FRAME-AVIATOR-58".to_string(),
        name: "Aviator Classic 58mm".to_string(),
        brand_id: "brand-rayban".to_string(),
        category_id: "category-sun".to_string(),
        price_cents: 12900,
        in_stock: true,
        tags: vec!["metal".to_string(), "pilot".to_string()],
    };

    service.upsert(&product).await?;
    println!("   ✓ Upserted product: {}", product.name);

    // First read fetches from the store and caches the document
    let fetched = service.get::<Product>(&product.id).await?;
    println!("   ✓ Fetched: {:?}", fetched.map(|p| p.name));

    // Second read is served from the cache
    service.get::<Product>(&product.id).await?;
    let stats = service.cache_stats().await?;
    println!(
        "   ✓ Cache stats: size={} hits={} misses={} hit_rate={:.0}%",
        stats.size,
        stats.hits,
        stats.misses,
        stats.hit_rate * 100.0
    );

    println!("   Cache key shapes:");
    println!("      - product:  {}", CacheKey::product("123"));
    println!("      - brand:    {}", CacheKey::brand("acme"));
    println!("      - document: {}", CacheKey::document("categories", "sun"));
    println!("      - custom:   {}", CacheKey::custom("session", "abc"));
    Ok(())
}

async fn input_screening() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let service = FoundationService::with_memory_cache(store, FoundationConfig::default());

    let hostile = "'; DROP TABLE products; --";
    match service.get::<Product>(hostile).await {
        Err(FoundationError::Validation { field, pattern, .. }) => {
            println!("   ✓ Rejected {} (field={}, pattern={})", hostile, field, pattern);
        }
        other => println!("   ✗ Unexpected outcome: {:?}", other),
    }

    // The guard can also be consulted directly
    let verdict = SanitizationGuard::inspect("%27%3B%20DROP%20TABLE%20products%3B%20--");
    println!(
        "   ✓ Encoded payload rejected={} pattern={:?} form={:?}",
        verdict.rejected, verdict.matched_pattern, verdict.matched_form
    );
    Ok(())
}

async fn circuit_breaking() -> anyhow::Result<()> {
    let store = Arc::new(FlakyStore::new());
    let mut config = FoundationConfig::default();
    config.resilience.circuit_breaker.threshold = 2;
    config.resilience.circuit_breaker.cool_down = 1;
    let service = FoundationService::with_memory_cache(Arc::clone(&store), config);

    store.set_failing(true);
    for attempt in 1..=2 {
        let result = service.get::<Product>("p1").await;
        println!("   ✗ Attempt {} failed: {:?}", attempt, result.err().map(|e| e.to_string()));
    }

    // The circuit is now open: rejection happens without a store call
    let calls_before = store.total_calls();
    let result = service.get::<Product>("p1").await;
    println!(
        "   ✓ Fast rejection while open: {:?} (store calls unchanged: {})",
        result.err().map(|e| e.to_string()),
        store.total_calls() == calls_before
    );

    // After the cool-down, one probe call checks whether the store is back
    store.heal();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let result = service.get::<Product>("p1").await;
    println!("   ✓ Probe after cool-down succeeded: {}", result.is_ok());

    let stats = service.breaker_stats("products").unwrap();
    println!(
        "   ✓ Breaker stats: state={} requests={} failures={} rejected={}",
        stats.state, stats.total_requests, stats.total_failures, stats.rejected_requests
    );
    Ok(())
}
