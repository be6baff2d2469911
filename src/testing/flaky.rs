//! Failure-injecting document store
//!
//! Wraps a [`MemoryStore`] and misbehaves on command: fail the next N calls,
//! fail until told otherwise, or respond slowly. Call counters make cache
//! behavior observable (a cache hit leaves `fetch_count` untouched).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;

use crate::store::{DocumentStore, Filter, MemoryStore, StoreError};

/// A [`DocumentStore`] with controllable failures and latency
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
    fail_remaining: AtomicU64,
    latency_ms: AtomicU64,
    fetch_calls: AtomicU64,
    query_calls: AtomicU64,
    upsert_calls: AtomicU64,
    remove_calls: AtomicU64,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            ..Self::default()
        }
    }

    /// Fail every call until [`FlakyStore::heal`] is called
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail exactly the next `count` calls, then recover
    pub fn fail_next(&self, count: u64) {
        self.fail_remaining.store(count, Ordering::SeqCst);
    }

    /// Stop all failure injection
    pub fn heal(&self) {
        self.failing.store(false, Ordering::SeqCst);
        self.fail_remaining.store(0, Ordering::SeqCst);
    }

    /// Delay every call by `latency` before it is served or failed
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> u64 {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_count(&self) -> u64 {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> u64 {
        self.remove_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> u64 {
        self.fetch_count() + self.query_count() + self.upsert_count() + self.remove_count()
    }

    /// Seed a document directly, bypassing failure injection and counters
    pub async fn seed(&self, collection: &str, key: &str, document: Value) {
        self.inner
            .upsert(collection, key, document)
            .await
            .expect("MemoryStore upsert cannot fail");
    }

    async fn interfere(&self) -> Result<(), StoreError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }

        // Claim one of the remaining one-shot failures, if any
        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for FlakyStore {
    async fn fetch(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.interfere().await?;
        self.inner.fetch(collection, key).await
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.interfere().await?;
        self.inner.query(collection, filter).await
    }

    async fn upsert(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> Result<(), StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.interfere().await?;
        self.inner.upsert(collection, key, document).await
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.interfere().await?;
        self.inner.remove(collection, key).await
    }
}
