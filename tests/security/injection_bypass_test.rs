//! Injection screening tests through the full service path
//!
//! Every operation that accepts an externally supplied string (document
//! keys and filter fields/values) must reject injection payloads before
//! any store call is made.
//!
//! We test attack vectors across several encodings:
//! - Classic SQL and NoSQL payloads in keys and filters
//! - Fullwidth Unicode disguises (ＤＲＯＰ for DROP)
//! - Percent-encoded and double-percent-encoded payloads
//! - Inline comments splitting keywords (Dr/**/Op)
//! - Oversize and undecodable input, which must fail closed
//!
//! Each test verifies that:
//! 1. The operation returns a validation error, not a store error
//! 2. The store is never called for a rejected input
//! 3. The error names the pattern and normalized form that fired
//! 4. Previously stored documents remain intact and readable

use std::sync::Arc;

use catalog_foundation::models::Product;
use catalog_foundation::security::{NormalForm, PATTERN_DECODE_FAILURE, PATTERN_MAX_LENGTH};
use catalog_foundation::service::{FoundationError, FoundationService};
use catalog_foundation::store::Filter;
use catalog_foundation::testing::{sample_product, test_config, FlakyStore};

fn foundation() -> (Arc<FlakyStore>, FoundationService<FlakyStore>) {
    let store = Arc::new(FlakyStore::new());
    let service = FoundationService::with_memory_cache(Arc::clone(&store), test_config());
    (store, service)
}

fn assert_rejected<T: std::fmt::Debug>(
    result: Result<T, FoundationError>,
    payload: &str,
) -> (String, &'static str, Option<NormalForm>) {
    match result {
        Err(FoundationError::Validation {
            field,
            pattern,
            form,
        }) => (field, pattern, form),
        other => panic!("payload not rejected: {} (got {:?})", payload, other),
    }
}

// =============================================================================
// KEY SCREENING ON EVERY OPERATION
// =============================================================================

/// Attack vector: classic stacked DROP TABLE in a document key
/// Expected: every operation rejects it and the store is never called
#[tokio::test]
async fn test_hostile_key_is_rejected_on_every_operation() {
    let (store, service) = foundation();
    let payload = "'; DROP TABLE products; --";

    let (field, pattern, _) = assert_rejected(service.get::<Product>(payload).await, payload);
    assert_eq!(field, "key");
    assert_eq!(pattern, "sql-keyword");

    assert_rejected(service.delete::<Product>(payload).await, payload);

    let mut product = sample_product("p1");
    product.id = payload.to_string();
    assert_rejected(service.upsert(&product).await, payload);

    assert_eq!(store.total_calls(), 0);
}

/// Attack vector: boolean tautology in a filter value
/// Expected: the query is rejected and the error names the filter field
#[tokio::test]
async fn test_hostile_filter_value_is_rejected() {
    let (store, service) = foundation();

    let filter = Filter::new().eq("name", "x' OR '1'='1");
    let (field, pattern, _) =
        assert_rejected(service.find::<Product>(&filter).await, "x' OR '1'='1");
    assert_eq!(field, "filter.name");
    assert_eq!(pattern, "boolean-tautology");
    assert_eq!(store.query_count(), 0);
}

/// Attack vector: injection in the filter field name itself
/// Expected: field names are screened like values
#[tokio::test]
async fn test_hostile_filter_field_name_is_rejected() {
    let (store, service) = foundation();

    let filter = Filter::new().eq("name'; DELETE FROM products", "aviator");
    let (field, _, _) = assert_rejected(
        service.find::<Product>(&filter).await,
        "name'; DELETE FROM products",
    );
    assert!(field.starts_with("filter."));
    assert_eq!(store.query_count(), 0);
}

/// Attack vector: NoSQL operator smuggled through a filter value
/// Expected: operator syntax is rejected before it reaches the store
#[tokio::test]
async fn test_nosql_operator_payloads_are_rejected() {
    let (store, service) = foundation();

    let payloads = vec![
        r#"{"$ne": null}"#,
        r#"{"$gt": ""}"#,
        "$where: sleep(1000)",
        r#"{"$regex": ".*", "$options": "i"}"#,
    ];

    for payload in payloads {
        let filter = Filter::new().eq("name", payload);
        let result = service.find::<Product>(&filter).await;
        assert!(
            matches!(result, Err(FoundationError::Validation { .. })),
            "payload not rejected: {}",
            payload
        );
    }
    assert_eq!(store.total_calls(), 0);
}

// =============================================================================
// ENCODING-RESISTANT BYPASS PAYLOADS
// =============================================================================

/// Attack vectors: the payloads that defeat single-pass screening
/// Expected: rejection regardless of how the payload is dressed up
#[tokio::test]
async fn test_encoded_payloads_do_not_bypass_screening() {
    let (store, service) = foundation();

    let payloads = vec![
        // Fullwidth Unicode variants of the SQL keywords
        "'; ＤＲＯＰ ＴＡＢＬＥ products; --",
        // Percent-encoded classic payload
        "%27%3B%20DROP%20TABLE%20products%3B%20--",
        // Double-percent-encoded, surviving one decode pass
        "%2527%253B%2520DROP%2520TABLE%2520products%253B%2520--",
        // Keyword split by an inline comment, in mixed case
        "Dr/**/Op TaBLe products",
        // Fullwidth characters hidden behind percent encoding
        "%EF%BC%A4%EF%BC%B2%EF%BC%AF%EF%BC%B0 TABLE users",
        // Encoded stacked statement
        "1%3B%20DELETE%20FROM%20products",
        // Plain case obfuscation
        "dRoP tAbLe products",
    ];

    for payload in payloads {
        let result = service.get::<Product>(payload).await;
        assert!(
            matches!(result, Err(FoundationError::Validation { .. })),
            "payload not rejected: {}",
            payload
        );
    }
    assert_eq!(store.fetch_count(), 0);
}

/// The rejection reports which normalized form exposed the payload, so
/// operators can see what kind of obfuscation is being thrown at them
#[tokio::test]
async fn test_rejection_attributes_the_normalized_form() {
    let (_, service) = foundation();

    let (_, _, form) = assert_rejected(
        service.get::<Product>("ＤＲＯＰ ＴＡＢＬＥ products").await,
        "fullwidth",
    );
    assert_eq!(form, Some(NormalForm::Unicode));

    let (_, _, form) = assert_rejected(
        service
            .get::<Product>("%27%3B%20DROP%20TABLE%20products")
            .await,
        "percent-encoded",
    );
    assert_eq!(form, Some(NormalForm::Decoded));

    let (_, _, form) = assert_rejected(
        service
            .get::<Product>("%2527%253B%2520DROP%2520TABLE%2520products")
            .await,
        "double-encoded",
    );
    assert_eq!(form, Some(NormalForm::DoubleDecoded));
}

// =============================================================================
// FAIL CLOSED
// =============================================================================

/// Attack vector: a payload too large to scan
/// Expected: rejected outright; unscanned input is never trusted
#[tokio::test]
async fn test_oversize_key_fails_closed() {
    let (store, service) = foundation();

    let huge = "a".repeat(5000);
    let (_, pattern, _) = assert_rejected(service.get::<Product>(&huge).await, "oversize");
    assert_eq!(pattern, PATTERN_MAX_LENGTH);
    assert_eq!(store.fetch_count(), 0);
}

/// Attack vector: percent escapes that decode to invalid UTF-8
/// Expected: input whose decoded form cannot be inspected is rejected
#[tokio::test]
async fn test_undecodable_key_fails_closed() {
    let (store, service) = foundation();

    let (_, pattern, _) = assert_rejected(service.get::<Product>("%FF%FE").await, "%FF%FE");
    assert_eq!(pattern, PATTERN_DECODE_FAILURE);
    assert_eq!(store.fetch_count(), 0);
}

#[tokio::test]
async fn test_scan_length_limit_is_configurable() {
    let store = Arc::new(FlakyStore::new());
    let mut config = test_config();
    config.security.sanitization.max_scan_length = 10;
    let service = FoundationService::with_memory_cache(Arc::clone(&store), config);

    let (_, pattern, _) = assert_rejected(
        service.get::<Product>("a-perfectly-benign-key").await,
        "long benign key",
    );
    assert_eq!(pattern, PATTERN_MAX_LENGTH);

    assert!(matches!(service.get::<Product>("short-key").await, Ok(None)));
}

// =============================================================================
// INTEGRITY AND CONFIGURATION
// =============================================================================

/// A barrage of rejected payloads must leave stored documents untouched
/// and readable, with not a single store call made for the attacks
#[tokio::test]
async fn test_store_is_untouched_by_an_attack_barrage() {
    let (store, service) = foundation();

    let product = sample_product("p1");
    service.upsert(&product).await.unwrap();
    let calls_before = store.total_calls();

    let payloads = vec![
        "'; DROP TABLE products; --",
        "%27%3B%20DROP%20TABLE%20products%3B%20--",
        "Dr/**/Op TaBLe products",
        "' OR '1'='1",
        "1; TRUNCATE TABLE products",
        r#"{"$where": "1"}"#,
        "1 AND SLEEP(5)",
        "javascript:alert(1)",
    ];

    for payload in &payloads {
        let _ = service.get::<Product>(payload).await;
        let _ = service.delete::<Product>(payload).await;
        let _ = service
            .find::<Product>(&Filter::new().eq("name", *payload))
            .await;
    }
    assert_eq!(store.total_calls(), calls_before);

    // The legitimate document is still there, byte for byte
    let fetched = service.get::<Product>("p1").await.unwrap();
    assert_eq!(fetched, Some(product));
}

/// Screening is a configuration choice; a trusted deployment can turn it
/// off and hostile-looking keys become plain keys
#[tokio::test]
async fn test_screening_can_be_disabled() {
    let store = Arc::new(FlakyStore::new());
    let mut config = test_config();
    config.security.sanitization.enabled = false;
    let service = FoundationService::with_memory_cache(Arc::clone(&store), config);

    let result = service.get::<Product>("'; DROP TABLE products; --").await;
    assert!(matches!(result, Ok(None)));
    assert_eq!(store.fetch_count(), 1);
}
