//! Document store abstraction
//!
//! The [`DocumentStore`] trait is the seam between the service layer and
//! whatever actually holds the documents. Implementations only deal in raw
//! [`serde_json::Value`] documents keyed by collection and document key;
//! typed (de)serialization happens above, input screening happens above,
//! and circuit breaking wraps every call from above. A store implementation
//! stays oblivious to all three.

mod memory;

pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Error surfaced by a document store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The backing store cannot be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected or failed the operation
    #[error("query failed: {0}")]
    Query(String),

    /// A stored document did not deserialize into the expected shape
    #[error("malformed document in {collection}/{key}: {reason}")]
    MalformedDocument {
        collection: String,
        key: String,
        reason: String,
    },

    /// The operation did not complete within the configured deadline
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Field-equality filter for [`DocumentStore::query`].
///
/// A document matches when every listed field is present with exactly the
/// listed value. An empty filter matches every document in the collection.
///
/// # Example
///
/// ```
/// use catalog_foundation::store::Filter;
///
/// let filter = Filter::new().eq("brand", "acme").eq("in_stock", true);
/// assert_eq!(filter.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: BTreeMap<String, Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Iterate the required field/value pairs in field order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether `document` satisfies every field requirement
    pub fn matches(&self, document: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}

/// Keyed document storage, grouped into named collections.
///
/// Implementations must be safe to share across tasks; all methods take
/// `&self`.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Fetch one document by key. `Ok(None)` means the document does not
    /// exist, which is not an error.
    async fn fetch(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Return all documents in `collection` matching `filter`, ordered by
    /// document key
    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    /// Insert or replace the document at `key`
    async fn upsert(&self, collection: &str, key: &str, document: Value)
        -> Result<(), StoreError>;

    /// Delete the document at `key`, reporting whether it existed
    async fn remove(&self, collection: &str, key: &str) -> Result<bool, StoreError>;
}
