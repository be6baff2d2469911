//! False-positive tests: legitimate commerce input must flow through
//!
//! Screening that rejects real catalog data is as broken as screening
//! that admits payloads. This module runs a corpus of realistic eyewear
//! keys, names and filter values through the full service path and
//! through the guard directly, and expects zero rejections.
//!
//! Document field values are data, not queries: they are stored verbatim
//! and never screened, so punctuation-heavy names must round-trip
//! byte for byte.

use std::sync::Arc;

use catalog_foundation::models::Product;
use catalog_foundation::security::SanitizationGuard;
use catalog_foundation::service::FoundationService;
use catalog_foundation::store::Filter;
use catalog_foundation::testing::{sample_product, test_config, FlakyStore};

fn foundation() -> (Arc<FlakyStore>, FoundationService<FlakyStore>) {
    let store = Arc::new(FlakyStore::new());
    let service = FoundationService::with_memory_cache(Arc::clone(&store), test_config());
    (store, service)
}

// =============================================================================
// REALISTIC KEYS
// =============================================================================

/// Keys in the shapes real catalogs use: SKUs, slugs, UUIDs, paths
#[tokio::test]
async fn test_realistic_document_keys_pass() {
    let (_, service) = foundation();

    let keys = vec![
        "FRAME-2024-TITANIUM",
        "aviator-classic-58mm",
        "sku_000812-b",
        "550e8400-e29b-41d4-a716-446655440000",
        "kids/outdoor",
        "brand=acme",
        "p.1.2.3",
        "B00X4WHP5E",
    ];

    for key in keys {
        let result = service.get::<Product>(key).await;
        assert!(
            matches!(result, Ok(None)),
            "benign key rejected: {} (got {:?})",
            key,
            result
        );
    }
}

// =============================================================================
// REALISTIC FILTER VALUES
// =============================================================================

/// Filter values copied from real product and brand names, including the
/// apostrophes and ampersands that naive screens trip over
#[tokio::test]
async fn test_realistic_filter_values_pass() {
    let (_, service) = foundation();

    let values = vec![
        "Aviator Classic 58mm",
        "Ray-Ban Round Metal",
        "O'Connor & Sons Eyewear",
        "Women's polarized",
        "Café Lumière tortoise",
        "Blue light blocking glasses (2-pack)",
        "Brillenfassung Größe 52",
        "Occhiali da sole",
        "サングラス",
        "priced at $129",
        "Select frames from our spring collection",
        "Autumn '24 drop",
    ];

    for value in values {
        let filter = Filter::new().eq("name", value);
        let result = service.find::<Product>(&filter).await;
        assert!(
            result.is_ok(),
            "benign filter value rejected: {} (got {:?})",
            value,
            result
        );
    }
}

// =============================================================================
// VALUES ARE DATA, NOT QUERIES
// =============================================================================

/// Document fields may contain anything, including text that would be
/// rejected as a key; they are stored and returned verbatim
#[tokio::test]
async fn test_document_values_are_stored_verbatim() {
    let (_, service) = foundation();

    let spiky_names = vec![
        "O'Reilly & Sons \"Limited\" frame",
        "100% UV protection -- lab tested",
        "Lenses; cases; cloths",
        "SELECT collection, autumn drop",
    ];

    for (i, name) in spiky_names.iter().enumerate() {
        let mut product = sample_product(&format!("spiky-{}", i));
        product.name = name.to_string();
        service.upsert(&product).await.unwrap();

        let fetched = service
            .get::<Product>(&format!("spiky-{}", i))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.name, *name, "value was not stored verbatim");
    }
}

/// A full write/read/query/delete cycle with punctuation-heavy data and
/// benign inputs end to end
#[tokio::test]
async fn test_full_cycle_with_benign_inputs() {
    let (store, service) = foundation();

    let mut product = sample_product("FRAME-2024-TITANIUM");
    product.name = "L'Occhiale del Sole 54mm".to_string();
    service.upsert(&product).await.unwrap();

    let fetched = service
        .get::<Product>("FRAME-2024-TITANIUM")
        .await
        .unwrap();
    assert_eq!(fetched, Some(product.clone()));

    let matches = service
        .find::<Product>(&Filter::new().eq("name", "L'Occhiale del Sole 54mm"))
        .await
        .unwrap();
    assert_eq!(matches, vec![product]);

    assert!(service.delete::<Product>("FRAME-2024-TITANIUM").await.unwrap());
    assert!(store.total_calls() > 0);
}

// =============================================================================
// GUARD-LEVEL CORPUS
// =============================================================================

/// A wider corpus straight against the guard, with the verdict details
/// in the failure message so a regression names its own cause
#[test]
fn test_extended_benign_corpus_is_safe() {
    let corpus = vec![
        // Product and brand names
        "Aviator Classic 58mm",
        "Wayfarer Ease, matte black",
        "Clubmaster '86 revival",
        "Persol & Co. folding",
        "Møller titanium rimless",
        "Lindberg n.o.w. 6505",
        // Customer-ish input
        "customer@example.com",
        "+39 02 1234 5678",
        "Via Monte Napoleone 21, Milano",
        // Marketing copy fragments
        "20% off summer sale",
        "2-for-1 on all readers",
        "free case, cloth included",
        "new in: spring collection",
        // Identifiers and query-ish strings
        "order #20240817-0042",
        "lens_width:52;bridge:18",
        "rx=-2.50/-1.75x180",
        "tags[0]",
        "size 52□18-140",
    ];

    for input in corpus {
        let verdict = SanitizationGuard::inspect(input);
        assert!(
            verdict.is_safe(),
            "benign input rejected: {} (pattern {:?}, form {:?})",
            input,
            verdict.matched_pattern,
            verdict.matched_form
        );
    }
}
