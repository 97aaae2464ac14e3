//! File-based document store for native platforms.

use super::{
    BoxFuture, DocumentContent, DocumentStore, DocumentSummary, StorageError, StorageResult,
    StoredDocument,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each document as a JSON file in a directory.
pub struct FileDocumentStore {
    base_path: PathBuf,
}

impl FileDocumentStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create a store in the default location.
    ///
    /// On Unix: `~/.local/share/sketchdeck/documents/`
    /// On Windows: `%LOCALAPPDATA%\sketchdeck\documents\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("sketchdeck").join("documents"))
    }

    /// File path for a document id. Anything outside `[A-Za-z0-9_-]` is
    /// replaced so ids can never escape the base directory.
    fn document_path(&self, id: &str) -> PathBuf {
        let safe_id: String = id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_id))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn read(path: &Path, id: &str) -> StorageResult<StoredDocument> {
        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let json = fs::read_to_string(path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&json).map_err(|e| {
            StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn write(path: &Path, document: &StoredDocument) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(document)?;
        // Write then rename so a crash never leaves a half-written document.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, path)
            .map_err(|e| StorageError::Io(format!("Failed to replace {}: {}", path.display(), e)))
    }
}

impl DocumentStore for FileDocumentStore {
    fn get_document(&self, id: &str) -> BoxFuture<'_, StorageResult<StoredDocument>> {
        let path = self.document_path(id);
        let id = id.to_string();
        Box::pin(async move { Self::read(&path, &id) })
    }

    fn update_document(&self, id: &str, content: DocumentContent) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.document_path(id);
        let id = id.to_string();
        Box::pin(async move {
            let mut document = match Self::read(&path, &id) {
                Ok(document) => document,
                Err(StorageError::NotFound(_)) => StoredDocument::new(id.clone(), id),
                Err(e) => return Err(e),
            };
            document.content = content;
            Self::write(&path, &document)
        })
    }

    fn list_documents(&self) -> BoxFuture<'_, StorageResult<Vec<DocumentSummary>>> {
        let base = self.base_path.clone();
        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }
            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let mut list = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_none_or(|ext| ext != "json") {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                match Self::read(&path, stem) {
                    Ok(document) => list.push(DocumentSummary::from(&document)),
                    Err(e) => log::warn!("Skipping unreadable document {}: {}", path.display(), e),
                }
            }
            list.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(list)
        })
    }

    fn delete_document(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.document_path(id);
        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;
    use tempfile::tempdir;

    fn content(json: &str) -> DocumentContent {
        DocumentContent {
            scene_json: json.to_string(),
            thumbnail_data_url: Some("data:image/png;base64,AA==".to_string()),
            last_saved_at_ms: Some(42),
        }
    }

    #[test]
    fn test_update_and_get() {
        let dir = tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path()).unwrap();

        block_on(store.update_document("board-1", content("{\"objects\":[]}"))).unwrap();
        let doc = block_on(store.get_document("board-1")).unwrap();
        assert_eq!(doc.id, "board-1");
        assert_eq!(doc.content, content("{\"objects\":[]}"));
        assert!(dir.path().join("board-1.json").exists());
    }

    #[test]
    fn test_not_found() {
        let dir = tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path()).unwrap();
        let result = block_on(store.get_document("missing"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_ids_are_sanitized() {
        let dir = tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path()).unwrap();
        block_on(store.update_document("../escape", content(""))).unwrap();
        assert!(dir.path().join("___escape.json").exists());
        assert!(!dir.path().parent().unwrap().join("escape.json").exists());
    }

    #[test]
    fn test_list_and_delete() {
        let dir = tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path()).unwrap();
        block_on(store.update_document("a", content(""))).unwrap();
        block_on(store.update_document("b", content(""))).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let list = block_on(store.list_documents()).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].last_saved_at_ms, Some(42));

        block_on(store.delete_document("a")).unwrap();
        let list = block_on(store.list_documents()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "b");
    }

    #[test]
    fn test_creates_base_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("deep").join("docs");
        let store = FileDocumentStore::new(&nested).unwrap();
        assert!(store.base_path().exists());
    }
}
