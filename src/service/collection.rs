use std::future::Future;
use std::marker::PhantomData;
use std::time::Instant;

use serde_json::Value;

use crate::cache::{Cache, CacheKey};
use crate::models::CatalogDocument;
use crate::security::SanitizationGuard;
use crate::store::{DocumentStore, Filter, StoreError};

use super::{FoundationError, FoundationService};

/// Typed view over one collection of a [`FoundationService`].
///
/// Every operation runs the same gauntlet: externally supplied strings are
/// screened first, reads consult the cache, and every store call goes through
/// the collection's circuit breaker. Cache failures are never fatal; they
/// degrade to a miss or a skipped write and the store remains authoritative.
pub struct CollectionManager<'a, T, S, C>
where
    T: CatalogDocument,
    S: DocumentStore,
    C: Cache,
{
    service: &'a FoundationService<S, C>,
    _document: PhantomData<T>,
}

impl<'a, T, S, C> CollectionManager<'a, T, S, C>
where
    T: CatalogDocument,
    S: DocumentStore,
    C: Cache,
{
    pub(super) fn new(service: &'a FoundationService<S, C>) -> Self {
        Self {
            service,
            _document: PhantomData,
        }
    }

    /// Fetch one document by key, read-through cached.
    ///
    /// A cache hit never touches the store. A miss fetches through the
    /// circuit breaker and, on success, populates the cache for the
    /// configured TTL. Absent documents are not cached.
    #[tracing::instrument(skip(self), fields(collection = T::COLLECTION, key = %key))]
    pub async fn get(&self, key: &str) -> Result<Option<T>, FoundationError> {
        self.screen("key", key)?;
        let cache_key = self.cache_key(key);

        if self.cache_enabled() {
            match self.service.cache().get::<T>(&cache_key).await {
                Ok(Some(document)) => {
                    ::tracing::debug!("Cache hit");
                    if let Some(metrics) = self.service.metrics() {
                        metrics.record_cache_hit();
                    }
                    return Ok(Some(document));
                }
                Ok(None) => {}
                Err(e) => {
                    ::tracing::warn!(error = %e, "Cache read failed, falling through to store");
                }
            }
            if let Some(metrics) = self.service.metrics() {
                metrics.record_cache_miss();
            }
        }

        let fetched = self
            .guarded("fetch", async {
                self.service.store().fetch(T::COLLECTION, key).await
            })
            .await?;

        let Some(raw) = fetched else {
            return Ok(None);
        };

        let document: T =
            serde_json::from_value(raw).map_err(|e| StoreError::MalformedDocument {
                collection: T::COLLECTION.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if self.cache_enabled() {
            let ttl = self.service.config().cache.ttl();
            if let Err(e) = self.service.cache().put(&cache_key, &document, ttl).await {
                ::tracing::warn!(error = %e, "Failed to cache fetched document");
            }
        }

        Ok(Some(document))
    }

    /// Return all documents matching a field-equality filter.
    ///
    /// Filter field names and string filter values are screened; results are
    /// served from the store on every call and are not cached.
    #[tracing::instrument(skip(self, filter), fields(collection = T::COLLECTION, filter_fields = filter.len()))]
    pub async fn find(&self, filter: &Filter) -> Result<Vec<T>, FoundationError> {
        self.screen_filter(filter)?;

        let raw = self
            .guarded("query", async {
                self.service.store().query(T::COLLECTION, filter).await
            })
            .await?;

        let mut documents = Vec::with_capacity(raw.len());
        for value in raw {
            let key = value
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let document: T =
                serde_json::from_value(value).map_err(|e| StoreError::MalformedDocument {
                    collection: T::COLLECTION.to_string(),
                    key,
                    reason: e.to_string(),
                })?;
            documents.push(document);
        }

        Ok(documents)
    }

    /// Insert or replace a document, keyed by [`CatalogDocument::document_key`].
    ///
    /// The cached copy is invalidated after a successful write so the next
    /// read refetches from the store.
    #[tracing::instrument(skip(self, document), fields(collection = T::COLLECTION))]
    pub async fn upsert(&self, document: &T) -> Result<(), FoundationError> {
        let key = document.document_key().to_string();
        self.screen("key", &key)?;

        let value = serde_json::to_value(document)
            .map_err(|e| StoreError::Query(format!("Failed to serialize document: {}", e)))?;

        self.guarded("upsert", async {
            self.service.store().upsert(T::COLLECTION, &key, value).await
        })
        .await?;

        self.invalidate_cached(&key).await;
        ::tracing::debug!(key = %key, "Document upserted");
        Ok(())
    }

    /// Delete a document by key, reporting whether it existed
    #[tracing::instrument(skip(self), fields(collection = T::COLLECTION, key = %key))]
    pub async fn delete(&self, key: &str) -> Result<bool, FoundationError> {
        self.screen("key", key)?;

        let removed = self
            .guarded("remove", async {
                self.service.store().remove(T::COLLECTION, key).await
            })
            .await?;

        self.invalidate_cached(key).await;
        Ok(removed)
    }

    fn cache_enabled(&self) -> bool {
        self.service.config().cache.enabled
    }

    fn cache_key(&self, key: &str) -> String {
        CacheKey::document(T::COLLECTION, key)
    }

    async fn invalidate_cached(&self, key: &str) {
        if !self.cache_enabled() {
            return;
        }
        if let Err(e) = self.service.cache().invalidate(&self.cache_key(key)).await {
            ::tracing::warn!(error = %e, "Failed to invalidate cached document");
        }
    }

    /// Run a store operation through this collection's circuit breaker
    async fn guarded<R, Fut>(
        &self,
        operation: &'static str,
        call: Fut,
    ) -> Result<R, FoundationError>
    where
        Fut: Future<Output = Result<R, StoreError>>,
    {
        let started = Instant::now();
        let result = if self.service.config().resilience.circuit_breaker.enabled {
            self.service
                .breaker_for(T::COLLECTION)
                .call(call)
                .await
                .map_err(|e| FoundationError::from_breaker(T::COLLECTION, e))
        } else {
            // Circuit breaker disabled, call the store directly
            call.await.map_err(FoundationError::from)
        };

        if let Some(metrics) = self.service.metrics() {
            let outcome = match &result {
                Ok(_) => "success",
                Err(FoundationError::CircuitOpen { .. }) => "rejected",
                Err(_) => "error",
            };
            metrics.record_store_operation(
                T::COLLECTION,
                operation,
                outcome,
                started.elapsed().as_secs_f64(),
            );
            if matches!(result, Err(FoundationError::CircuitOpen { .. })) {
                metrics.record_circuit_rejection(T::COLLECTION);
            }
        }

        result
    }

    fn screen(&self, field: &str, input: &str) -> Result<(), FoundationError> {
        let sanitization = &self.service.config().security.sanitization;
        if !sanitization.enabled {
            return Ok(());
        }

        let verdict = SanitizationGuard::inspect_with_limit(input, sanitization.max_scan_length);
        if verdict.rejected {
            let pattern = verdict.matched_pattern.unwrap_or("unknown");
            ::tracing::warn!(
                collection = T::COLLECTION,
                field = field,
                pattern = pattern,
                form = ?verdict.matched_form,
                "Rejected unsafe input"
            );
            if let Some(metrics) = self.service.metrics() {
                metrics.record_sanitization_rejection(pattern);
            }
            return Err(FoundationError::Validation {
                field: field.to_string(),
                pattern,
                form: verdict.matched_form,
            });
        }

        Ok(())
    }

    fn screen_filter(&self, filter: &Filter) -> Result<(), FoundationError> {
        for (field, value) in filter.fields() {
            let label = format!("filter.{}", field);
            self.screen(&label, field)?;
            if let Some(text) = value.as_str() {
                self.screen(&label, text)?;
            }
        }
        Ok(())
    }
}
