//! In-memory document store
//!
//! Reference [`DocumentStore`] backed by sharded concurrent maps. Used as the
//! default store in tests and as the backing target when exercising the
//! resilience layers without a real database.

use dashmap::DashMap;
use serde_json::Value;

use super::{DocumentStore, Filter, StoreError};

/// In-memory store: a sharded map of collections, each a sharded map of
/// documents by key
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, DashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        // Shard count must be a power of two
        let shards = (num_cpus::get() * 4).next_power_of_two();
        Self {
            collections: DashMap::with_shard_amount(shards),
        }
    }

    /// Number of documents currently in `collection`
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|documents| documents.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Names of all collections that have ever held a document
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Drop every document in every collection
    pub fn clear(&self) {
        self.collections.clear();
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let documents = match self.collections.get(collection) {
            Some(documents) => documents,
            None => return Ok(None),
        };
        Ok(documents.get(key).map(|entry| entry.value().clone()))
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let documents = match self.collections.get(collection) {
            Some(documents) => documents,
            None => return Ok(Vec::new()),
        };

        let mut matches: Vec<(String, Value)> = documents
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        // Key order keeps results deterministic across shard iteration
        matches.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(matches.into_iter().map(|(_, document)| document).collect())
    }

    async fn upsert(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> Result<(), StoreError> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), document);
        Ok(())
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        let documents = match self.collections.get(collection) {
            Some(documents) => documents,
            None => return Ok(false),
        };
        Ok(documents.remove(key).is_some())
    }
}
