//! Document storage backends and the debounced persistence bridge.

mod autosave;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use autosave::{
    LoadedScene, PersistenceBridge, SaveJob, SaveStatus, DEFAULT_SAVE_DEBOUNCE_MS, fetch_scene,
};
pub use memory::MemoryDocumentStore;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileDocumentStore;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// The persisted part of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentContent {
    /// Scene JSON as produced by [`crate::record::encode_scene`].
    pub scene_json: String,
    /// `data:image/png;base64,...` preview, if one was rendered.
    pub thumbnail_data_url: Option<String>,
    /// Unix epoch milliseconds of the last successful save.
    pub last_saved_at_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    pub name: String,
}

/// A document as held by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub content: DocumentContent,
    pub metadata: DocumentMetadata,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: DocumentContent::default(),
            metadata: DocumentMetadata { name: name.into() },
        }
    }
}

/// Listing entry returned by [`DocumentStore::list_documents`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub last_saved_at_ms: Option<u64>,
}

impl From<&StoredDocument> for DocumentSummary {
    fn from(doc: &StoredDocument) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.metadata.name.clone(),
            last_saved_at_ms: doc.content.last_saved_at_ms,
        }
    }
}

/// Trait for document storage backends.
///
/// `update_document` replaces the content of an existing document, or
/// creates it (named after its id) when missing. Writes are last-write-wins.
///
/// On native platforms implementations must be Send + Sync.
/// On WASM these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait DocumentStore: Send + Sync {
    fn get_document(&self, id: &str) -> BoxFuture<'_, StorageResult<StoredDocument>>;

    fn update_document(&self, id: &str, content: DocumentContent) -> BoxFuture<'_, StorageResult<()>>;

    fn list_documents(&self) -> BoxFuture<'_, StorageResult<Vec<DocumentSummary>>>;

    fn delete_document(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;
}

/// Trait for document storage backends (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait DocumentStore {
    fn get_document(&self, id: &str) -> BoxFuture<'_, StorageResult<StoredDocument>>;

    fn update_document(&self, id: &str, content: DocumentContent) -> BoxFuture<'_, StorageResult<()>>;

    fn list_documents(&self) -> BoxFuture<'_, StorageResult<Vec<DocumentSummary>>>;

    fn delete_document(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;
}

/// Current time as Unix epoch milliseconds.
pub(crate) fn epoch_millis() -> u64 {
    #[cfg(not(target_arch = "wasm32"))]
    use std::time::{SystemTime, UNIX_EPOCH};
    #[cfg(target_arch = "wasm32")]
    use web_time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
