//! In-memory document store.

use super::{
    BoxFuture, DocumentContent, DocumentStore, DocumentSummary, StorageError, StorageResult,
    StoredDocument,
};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory store for tests and ephemeral sessions.
///
/// Counts successful writes and can be told to fail them, which is how save
/// retry paths are exercised.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, StoredDocument>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document directly, bypassing the write counter.
    pub fn insert(&self, document: StoredDocument) -> StorageResult<()> {
        let mut docs = self
            .documents
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        docs.insert(document.id.clone(), document);
        Ok(())
    }

    /// Number of successful `update_document` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make subsequent writes fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get_document(&self, id: &str) -> BoxFuture<'_, StorageResult<StoredDocument>> {
        let id = id.to_string();
        Box::pin(async move {
            let docs = self
                .documents
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            docs.get(&id).cloned().ok_or(StorageError::NotFound(id))
        })
    }

    fn update_document(&self, id: &str, content: DocumentContent) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Io(format!("Write to {} rejected", id)));
            }
            let mut docs = self
                .documents
                .write()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            docs.entry(id.clone())
                .or_insert_with(|| StoredDocument::new(id.clone(), id))
                .content = content;
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn list_documents(&self) -> BoxFuture<'_, StorageResult<Vec<DocumentSummary>>> {
        Box::pin(async move {
            let docs = self
                .documents
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            let mut list: Vec<DocumentSummary> = docs.values().map(DocumentSummary::from).collect();
            list.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(list)
        })
    }

    fn delete_document(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut docs = self
                .documents
                .write()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            docs.remove(&id);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;

    fn content(json: &str) -> DocumentContent {
        DocumentContent {
            scene_json: json.to_string(),
            ..DocumentContent::default()
        }
    }

    #[test]
    fn test_update_and_get() {
        let store = MemoryDocumentStore::new();
        block_on(store.update_document("doc", content("{}"))).unwrap();
        let doc = block_on(store.get_document("doc")).unwrap();
        assert_eq!(doc.content.scene_json, "{}");
        assert_eq!(doc.metadata.name, "doc");
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_update_keeps_metadata() {
        let store = MemoryDocumentStore::new();
        store.insert(StoredDocument::new("doc", "My board")).unwrap();
        block_on(store.update_document("doc", content("{}"))).unwrap();
        let doc = block_on(store.get_document("doc")).unwrap();
        assert_eq!(doc.metadata.name, "My board");
    }

    #[test]
    fn test_not_found() {
        let store = MemoryDocumentStore::new();
        let result = block_on(store.get_document("missing"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_failing_writes() {
        let store = MemoryDocumentStore::new();
        store.set_fail_writes(true);
        assert!(block_on(store.update_document("doc", content("{}"))).is_err());
        assert_eq!(store.write_count(), 0);
        store.set_fail_writes(false);
        assert!(block_on(store.update_document("doc", content("{}"))).is_ok());
    }

    #[test]
    fn test_list_and_delete() {
        let store = MemoryDocumentStore::new();
        block_on(store.update_document("b", content(""))).unwrap();
        block_on(store.update_document("a", content(""))).unwrap();
        let ids: Vec<String> = block_on(store.list_documents())
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        block_on(store.delete_document("a")).unwrap();
        assert_eq!(block_on(store.list_documents()).unwrap().len(), 1);
    }
}
