//! Integration tests for the complete document access flow
//!
//! This module tests the full end-to-end flow through every foundation
//! layer including:
//! - Typed upsert, fetch, query and delete across collections
//! - Read-through caching with invalidation on writes
//! - TTL expiry forcing a refetch from the store
//! - Malformed document reporting
//! - Operation deadlines against a slow store
//!
//! Tests cover both success and failure scenarios against an
//! instrumented store so the number of backend calls can be asserted.

use std::sync::Arc;
use std::time::Duration;

use catalog_foundation::config::FoundationConfig;
use catalog_foundation::models::{Brand, Category, Product};
use catalog_foundation::service::{FoundationError, FoundationService};
use catalog_foundation::store::{Filter, StoreError};
use catalog_foundation::testing::{
    sample_brand, sample_category, sample_product, test_config, FlakyStore,
};
use serde_json::json;

fn foundation() -> (Arc<FlakyStore>, FoundationService<FlakyStore>) {
    let store = Arc::new(FlakyStore::new());
    let service = FoundationService::with_memory_cache(Arc::clone(&store), test_config());
    (store, service)
}

fn foundation_with(config: FoundationConfig) -> (Arc<FlakyStore>, FoundationService<FlakyStore>) {
    let store = Arc::new(FlakyStore::new());
    let service = FoundationService::with_memory_cache(Arc::clone(&store), config);
    (store, service)
}

// =============================================================================
// SUCCESS PATH TESTS - Complete Document Lifecycle
// =============================================================================

/// Test the complete successful document lifecycle:
/// 1. Upsert documents in three collections
/// 2. Fetch each back as its typed model
/// 3. Query one collection with a field filter
/// 4. Delete a document and observe its absence
#[tokio::test]
async fn test_complete_document_lifecycle() {
    let (_, service) = foundation();

    // Step 1: Write one document per collection
    let product = sample_product("p1");
    let brand = sample_brand("b1");
    let category = sample_category("c1");
    service.upsert(&product).await.unwrap();
    service.upsert(&brand).await.unwrap();
    service.upsert(&category).await.unwrap();

    // Step 2: Each comes back typed from its own collection
    assert_eq!(service.get::<Product>("p1").await.unwrap(), Some(product));
    assert_eq!(service.get::<Brand>("b1").await.unwrap(), Some(brand));
    assert_eq!(
        service.get::<Category>("c1").await.unwrap(),
        Some(category)
    );

    // Step 3: Field-equality query returns typed matches
    let mut second = sample_product("p2");
    second.in_stock = false;
    service.upsert(&second).await.unwrap();

    let in_stock = service
        .find::<Product>(&Filter::new().eq("in_stock", true))
        .await
        .unwrap();
    assert_eq!(in_stock.len(), 1);
    assert_eq!(in_stock[0].id, "p1");

    // Step 4: Delete reports prior existence, then the document is gone
    assert!(service.delete::<Product>("p1").await.unwrap());
    assert_eq!(service.get::<Product>("p1").await.unwrap(), None);
    assert!(!service.delete::<Product>("p1").await.unwrap());
}

#[tokio::test]
async fn test_find_returns_documents_in_key_order() {
    let (_, service) = foundation();

    for id in ["pz", "pa", "pm"] {
        service.upsert(&sample_product(id)).await.unwrap();
    }

    let all = service.find::<Product>(&Filter::new()).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["pa", "pm", "pz"]);
}

// =============================================================================
// READ-THROUGH CACHE TESTS
// =============================================================================

#[tokio::test]
async fn test_repeated_reads_hit_the_store_once() {
    let (store, service) = foundation();
    service.upsert(&sample_product("p1")).await.unwrap();

    for _ in 0..5 {
        let fetched = service.get::<Product>("p1").await.unwrap();
        assert!(fetched.is_some());
    }

    // First read populated the cache; the rest never reached the store
    assert_eq!(store.fetch_count(), 1);
}

#[tokio::test]
async fn test_write_invalidates_and_next_read_refetches() {
    let (store, service) = foundation();
    let mut product = sample_product("p1");
    service.upsert(&product).await.unwrap();
    service.get::<Product>("p1").await.unwrap();

    product.price_cents = 9900;
    service.upsert(&product).await.unwrap();

    let fetched = service.get::<Product>("p1").await.unwrap().unwrap();
    assert_eq!(fetched.price_cents, 9900);
    assert_eq!(store.fetch_count(), 2);
}

#[tokio::test]
async fn test_ttl_expiry_forces_refetch() {
    let mut config = test_config();
    config.cache.ttl = 1;
    let (store, service) = foundation_with(config);

    service.upsert(&sample_product("p1")).await.unwrap();
    service.get::<Product>("p1").await.unwrap();
    assert_eq!(store.fetch_count(), 1);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    service.get::<Product>("p1").await.unwrap();
    assert_eq!(store.fetch_count(), 2);
}

// =============================================================================
// FAILURE PATH TESTS
// =============================================================================

#[tokio::test]
async fn test_malformed_document_names_collection_and_key() {
    let (store, service) = foundation();
    store
        .seed("products", "corrupt", json!({"id": 42, "price_cents": "free"}))
        .await;

    match service.get::<Product>("corrupt").await {
        Err(FoundationError::Store(StoreError::MalformedDocument {
            collection,
            key,
            reason,
        })) => {
            assert_eq!(collection, "products");
            assert_eq!(key, "corrupt");
            assert!(!reason.is_empty());
        }
        other => panic!("expected malformed document error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_store_hits_operation_deadline() {
    // test_config sets a one second operation timeout
    let (store, service) = foundation();
    store.set_latency(Duration::from_millis(1500));

    let result = service.get::<Product>("p1").await;
    match result {
        Err(FoundationError::Store(StoreError::Timeout(elapsed))) => {
            assert!(elapsed >= Duration::from_secs(1));
        }
        other => panic!("expected timeout, got {:?}", other),
    }

    // The timeout counts as a failure on the collection's breaker
    let stats = service.breaker_stats("products").unwrap();
    assert_eq!(stats.total_failures, 1);
}

#[tokio::test]
async fn test_store_error_is_not_masked_by_cache() {
    let (store, service) = foundation();
    store.fail_next(1);

    let result = service.get::<Product>("p1").await;
    assert!(matches!(
        result,
        Err(FoundationError::Store(StoreError::Unavailable(_)))
    ));

    // The failure was not cached; the next read reaches the store and succeeds
    assert_eq!(service.get::<Product>("p1").await.unwrap(), None);
    assert_eq!(store.fetch_count(), 2);
}

// =============================================================================
// LAYER CONFIGURATION TESTS
// =============================================================================

#[tokio::test]
async fn test_every_layer_can_be_disabled_together() {
    let mut config = test_config();
    config.cache.enabled = false;
    config.resilience.circuit_breaker.enabled = false;
    config.security.sanitization.enabled = false;
    let (store, service) = foundation_with(config);

    // A hostile key flows straight through to the store and misses
    let fetched = service.get::<Product>("'; DROP TABLE products; --").await;
    assert!(matches!(fetched, Ok(None)));
    assert_eq!(store.fetch_count(), 1);
    assert!(service.tracked_collections().is_empty());
}
