//! Foundation service
//!
//! [`FoundationService`] composes the three layers every store access goes
//! through: input screening, the read-through cache, and a per-collection
//! circuit breaker around the store itself. Typed access to one collection
//! goes through [`CollectionManager`]; the service keeps one circuit breaker
//! per collection so a failing collection cannot trip the others.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use catalog_foundation::config::FoundationConfig;
//! use catalog_foundation::models::Product;
//! use catalog_foundation::service::FoundationService;
//! use catalog_foundation::store::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let service = FoundationService::with_memory_cache(store, FoundationConfig::default());
//!
//! let product = Product {
//!     id: "p1".to_string(),
//!     name: "Aviator Classic".to_string(),
//!     brand_id: "b1".to_string(),
//!     category_id: "c1".to_string(),
//!     price_cents: 12900,
//!     in_stock: true,
//!     tags: vec![],
//! };
//!
//! service.upsert(&product).await?;
//! let fetched = service.get::<Product>("p1").await?;
//! assert_eq!(fetched.as_ref().map(|p| p.name.as_str()), Some("Aviator Classic"));
//! # Ok(())
//! # }
//! ```

mod collection;

pub use collection::CollectionManager;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::cache::{Cache, CacheStats, MemoryCache};
use crate::config::FoundationConfig;
use crate::metrics::FoundationMetrics;
use crate::models::CatalogDocument;
use crate::resilience::{CircuitBreaker, CircuitBreakerError, CircuitBreakerStats};
use crate::security::NormalForm;
use crate::store::{DocumentStore, Filter, StoreError};

/// Error surfaced by foundation operations
#[derive(Error, Debug)]
pub enum FoundationError {
    /// An externally supplied string matched an injection pattern
    #[error("Input rejected: {field} matched injection pattern {pattern}")]
    Validation {
        /// Which input was rejected ("key", or "filter.<field>")
        field: String,
        /// Id of the pattern that fired
        pattern: &'static str,
        /// Normalized form the pattern fired on
        form: Option<NormalForm>,
    },

    /// The collection's circuit breaker is open and the call was not attempted
    #[error("Circuit breaker for collection {collection} is open, store temporarily unavailable")]
    CircuitOpen { collection: String },

    /// The store failed or timed out
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FoundationError {
    /// Map a breaker outcome onto the service error taxonomy
    pub(crate) fn from_breaker(collection: &str, error: CircuitBreakerError<StoreError>) -> Self {
        match error {
            CircuitBreakerError::Open { .. } => FoundationError::CircuitOpen {
                collection: collection.to_string(),
            },
            CircuitBreakerError::Timeout { elapsed } => {
                FoundationError::Store(StoreError::Timeout(elapsed))
            }
            CircuitBreakerError::Inner(err) => FoundationError::Store(err),
        }
    }
}

/// Concurrency-safe data access facade over a document store.
///
/// # Thread Safety
///
/// The service is cheap to clone and safe to share across tasks. The breaker
/// registry sits behind a mutex that is only held to look up or create a
/// breaker, never across a store call.
pub struct FoundationService<S, C = MemoryCache>
where
    S: DocumentStore,
    C: Cache,
{
    /// Backing document store
    store: Arc<S>,
    /// Read-through cache for single-document fetches
    cache: Arc<C>,
    /// One circuit breaker per collection, created on first use
    breakers: Arc<Mutex<HashMap<String, CircuitBreaker>>>,
    /// Foundation configuration
    config: Arc<FoundationConfig>,
    /// Optional Prometheus metrics
    metrics: Option<FoundationMetrics>,
}

impl<S> FoundationService<S, MemoryCache>
where
    S: DocumentStore,
{
    /// Wire the service with a [`MemoryCache`] sized from the configuration.
    ///
    /// Spawns the cache's background sweeper, so this must run inside a tokio
    /// runtime.
    pub fn with_memory_cache(store: Arc<S>, config: FoundationConfig) -> Self {
        let cache = MemoryCache::new(config.cache.max_entries, config.cache.cleanup_interval());
        Self::new(store, Arc::new(cache), config)
    }
}

impl<S, C> FoundationService<S, C>
where
    S: DocumentStore,
    C: Cache,
{
    /// Create a new foundation service over `store` and `cache`
    #[tracing::instrument(skip(store, cache, config), fields(
        circuit_breaker_enabled = %config.resilience.circuit_breaker.enabled,
        failure_threshold = %config.resilience.circuit_breaker.threshold,
        cache_enabled = %config.cache.enabled
    ))]
    pub fn new(store: Arc<S>, cache: Arc<C>, config: FoundationConfig) -> Self {
        if config.resilience.circuit_breaker.enabled {
            tracing::info!(
                threshold = config.resilience.circuit_breaker.threshold,
                cool_down = config.resilience.circuit_breaker.cool_down,
                "Store calls are circuit broken per collection"
            );
        } else {
            tracing::warn!("Store circuit breaking is disabled");
        }

        Self {
            store,
            cache,
            breakers: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
            metrics: None,
        }
    }

    /// Record operation counters and durations to `metrics`
    pub fn with_metrics(mut self, metrics: FoundationMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Typed view over the collection document type `T` lives in
    pub fn collection<T: CatalogDocument>(&self) -> CollectionManager<'_, T, S, C> {
        CollectionManager::new(self)
    }

    /// Fetch one document by key. See [`CollectionManager::get`].
    pub async fn get<T: CatalogDocument>(&self, key: &str) -> Result<Option<T>, FoundationError> {
        self.collection::<T>().get(key).await
    }

    /// Query documents by field equality. See [`CollectionManager::find`].
    pub async fn find<T: CatalogDocument>(
        &self,
        filter: &Filter,
    ) -> Result<Vec<T>, FoundationError> {
        self.collection::<T>().find(filter).await
    }

    /// Insert or replace a document. See [`CollectionManager::upsert`].
    pub async fn upsert<T: CatalogDocument>(&self, document: &T) -> Result<(), FoundationError> {
        self.collection::<T>().upsert(document).await
    }

    /// Delete a document by key. See [`CollectionManager::delete`].
    pub async fn delete<T: CatalogDocument>(&self, key: &str) -> Result<bool, FoundationError> {
        self.collection::<T>().delete(key).await
    }

    /// The backing store.
    ///
    /// # Warning
    ///
    /// Going through the store directly bypasses input screening, caching and
    /// circuit breaking. Prefer [`FoundationService::collection`].
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The cache layer
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// The loaded configuration
    pub fn config(&self) -> &FoundationConfig {
        &self.config
    }

    pub(crate) fn metrics(&self) -> Option<&FoundationMetrics> {
        self.metrics.as_ref()
    }

    /// The circuit breaker guarding `collection`, created on first use
    pub(crate) fn breaker_for(&self, collection: &str) -> CircuitBreaker {
        let mut breakers = self.breakers.lock().unwrap();
        breakers
            .entry(collection.to_string())
            .or_insert_with(|| {
                CircuitBreaker::with_config(
                    collection.to_string(),
                    self.config.resilience.circuit_breaker.to_breaker_config(),
                )
            })
            .clone()
    }

    /// Counter snapshot for `collection`'s breaker, if one exists yet
    pub fn breaker_stats(&self, collection: &str) -> Option<CircuitBreakerStats> {
        self.breakers
            .lock()
            .unwrap()
            .get(collection)
            .map(|breaker| breaker.stats())
    }

    /// Names of collections that have been accessed through a breaker
    pub fn tracked_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Force `collection`'s breaker back to closed, reporting whether one
    /// existed.
    ///
    /// # Warning
    ///
    /// This should only be used for testing or administrative purposes. In
    /// production, let the breaker manage state transitions automatically.
    pub fn reset_breaker(&self, collection: &str) -> bool {
        let breakers = self.breakers.lock().unwrap();
        match breakers.get(collection) {
            Some(breaker) => {
                tracing::warn!(collection = collection, "Manually resetting circuit breaker");
                breaker.reset();
                true
            }
            None => false,
        }
    }

    /// Hit/miss/eviction counters from the cache layer
    pub async fn cache_stats(&self) -> anyhow::Result<CacheStats> {
        self.cache.stats().await
    }
}

impl<S, C> Clone for FoundationService<S, C>
where
    S: DocumentStore,
    C: Cache,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            breakers: Arc::clone(&self.breakers),
            config: Arc::clone(&self.config),
            metrics: self.metrics.clone(),
        }
    }
}

impl<S, C> std::fmt::Debug for FoundationService<S, C>
where
    S: DocumentStore,
    C: Cache,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoundationService")
            .field("store", &self.store)
            .field("cache", &self.cache)
            .field("config", &self.config)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
