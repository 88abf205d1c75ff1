//! Remote Catalog Abstraction
//!
//! Read-only access to the remote document catalog that holds song and
//! setlist metadata. The catalog is a set of named collections of JSON
//! documents keyed by id.
//!
//! ```ignore
//! use bridge_traits::catalog::RemoteCatalog;
//!
//! async fn count_songs(catalog: &dyn RemoteCatalog) -> Result<usize> {
//!     Ok(catalog.list_documents("songs").await?.len())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Collection holding song documents
pub const SONGS_COLLECTION: &str = "songs";

/// Collection holding setlist documents
pub const SETLISTS_COLLECTION: &str = "setlists";

/// A document fetched from the remote catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Document id, unique within its collection
    pub id: String,
    /// Decoded document body, normally a JSON object
    pub data: Value,
}

impl CatalogDocument {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Look up a top-level field of the document body
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Top-level string field, `None` when absent or not a string
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }
}

/// Remote catalog trait
///
/// Implementations list whole collections in catalog order. Paging, retries
/// and auth are the implementation's concern.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// List every document in `collection`
    async fn list_documents(&self, collection: &str) -> Result<Vec<CatalogDocument>>;

    /// Fetch a single document, `None` when it does not exist
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<CatalogDocument>>;
}
