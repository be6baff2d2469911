//! Catalog document models
//!
//! Typed shapes for the documents the foundation serves. Each model binds
//! itself to its collection through [`CatalogDocument`], which is what lets
//! the service layer stay generic over document types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A document type with a fixed home collection and a natural key
pub trait CatalogDocument: Serialize + DeserializeOwned + Send + Sync {
    /// Collection this document type lives in
    const COLLECTION: &'static str;

    /// The document's key within its collection
    fn document_key(&self) -> &str;
}

/// An eyewear product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub brand_id: String,
    pub category_id: String,
    /// Price in minor currency units
    pub price_cents: i64,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CatalogDocument for Product {
    const COLLECTION: &'static str = "products";

    fn document_key(&self) -> &str {
        &self.id
    }
}

/// A brand selling products
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Brand {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
}

impl CatalogDocument for Brand {
    const COLLECTION: &'static str = "brands";

    fn document_key(&self) -> &str {
        &self.id
    }
}

/// A product category, optionally nested under a parent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl CatalogDocument for Category {
    const COLLECTION: &'static str = "categories";

    fn document_key(&self) -> &str {
        &self.id
    }
}
