//! Debounced saving of the scene to a document store.
//!
//! Mutations call [`PersistenceBridge::schedule_save`]; the host polls the
//! bridge and runs whatever [`SaveJob`] it hands back. A job owns a copy of
//! the scene, so the editor can keep mutating while the write is in flight.

use super::{DocumentContent, DocumentStore, StorageError, StorageResult, StoredDocument, epoch_millis};
use crate::Instant;
use crate::canvas::SceneGraph;
use crate::record::{LoadReport, decode_scene_lenient, encode_scene};
use crate::shapes::SceneObject;
use crate::thumbnail::{DEFAULT_THUMBNAIL_MAX_SIDE, DEFAULT_THUMBNAIL_SCALE, render_thumbnail};
use std::sync::Arc;
use std::time::Duration;

/// Quiet period after the last mutation before a save starts.
pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 2000;

/// Save state shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    /// Nothing changed since the document was opened.
    #[default]
    Clean,
    /// Changes are waiting for the debounce to elapse.
    Pending,
    Saving,
    Saved { at_ms: u64 },
    /// The last write failed; the changes are still unsaved.
    Failed { message: String },
}

impl SaveStatus {
    pub fn is_unsaved(&self) -> bool {
        matches!(self, SaveStatus::Pending | SaveStatus::Saving | SaveStatus::Failed { .. })
    }
}

/// A prepared write, detached from the editor.
pub struct SaveJob<S: DocumentStore> {
    store: Arc<S>,
    document_id: String,
    content: DocumentContent,
}

impl<S: DocumentStore> SaveJob<S> {
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn content(&self) -> &DocumentContent {
        &self.content
    }

    pub async fn run(self) -> StorageResult<()> {
        self.store.update_document(&self.document_id, self.content).await
    }
}

/// A parsed document ready to become the editor's scene.
#[derive(Debug, Clone)]
pub struct LoadedScene {
    pub graph: SceneGraph,
    pub report: LoadReport,
}

/// Load a document, treating a missing one as a fresh empty document.
pub async fn fetch_scene<S: DocumentStore + ?Sized>(store: &S, id: &str) -> StorageResult<StoredDocument> {
    match store.get_document(id).await {
        Ok(document) => Ok(document),
        Err(StorageError::NotFound(_)) => {
            log::info!("Document {} not found, starting empty", id);
            Ok(StoredDocument::new(id, id))
        }
        Err(e) => Err(e),
    }
}

/// Trailing-edge debounced saves with an in-flight guard.
pub struct PersistenceBridge<S: DocumentStore> {
    store: Arc<S>,
    document_id: String,
    debounce: Duration,
    deadline: Option<Instant>,
    in_flight: bool,
    /// A save was requested while another was in flight.
    resave: bool,
    status: SaveStatus,
    thumbnail_scale: f64,
    thumbnail_max_side: u32,
}

impl<S: DocumentStore> PersistenceBridge<S> {
    pub fn new(store: Arc<S>, document_id: impl Into<String>) -> Self {
        Self {
            store,
            document_id: document_id.into(),
            debounce: Duration::from_millis(DEFAULT_SAVE_DEBOUNCE_MS),
            deadline: None,
            in_flight: false,
            resave: false,
            status: SaveStatus::Clean,
            thumbnail_scale: DEFAULT_THUMBNAIL_SCALE,
            thumbnail_max_side: DEFAULT_THUMBNAIL_MAX_SIDE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_thumbnail(mut self, scale: f64, max_side: u32) -> Self {
        self.thumbnail_scale = scale;
        self.thumbnail_max_side = max_side;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Whether changes exist that have not reached the store.
    pub fn is_dirty(&self) -> bool {
        self.deadline.is_some() || self.in_flight || self.resave || matches!(self.status, SaveStatus::Failed { .. })
    }

    /// Restart the debounce window.
    pub fn schedule_save(&mut self, now: Instant) {
        self.deadline = Some(now + self.debounce);
        if !self.in_flight {
            self.status = SaveStatus::Pending;
        }
    }

    /// Hand out a save job once the debounce has elapsed.
    ///
    /// While a save is in flight the deadline is kept, so the next poll after
    /// completion picks up the newer state.
    pub fn poll(&mut self, objects: &[SceneObject], now: Instant) -> Option<SaveJob<S>> {
        let deadline = self.deadline?;
        if now < deadline || self.in_flight {
            return None;
        }
        self.prepare_save(objects)
    }

    /// Serialize the scene into a job, unless a save is already in flight.
    pub fn prepare_save(&mut self, objects: &[SceneObject]) -> Option<SaveJob<S>> {
        if self.in_flight {
            log::debug!("Save already in progress, deferring");
            self.resave = true;
            return None;
        }

        let scene_json = match encode_scene(objects) {
            Ok(json) => json,
            Err(e) => {
                log::error!("Failed to serialize scene: {}", e);
                self.status = SaveStatus::Failed {
                    message: e.to_string(),
                };
                self.deadline = None;
                return None;
            }
        };
        let thumbnail_data_url = match render_thumbnail(objects, self.thumbnail_scale, self.thumbnail_max_side) {
            Ok(thumbnail) => Some(thumbnail.data_url),
            Err(e) => {
                log::warn!("Thumbnail rendering failed: {}", e);
                None
            }
        };

        log::info!("Saving document {} ({} objects)", self.document_id, objects.len());
        self.deadline = None;
        self.in_flight = true;
        self.status = SaveStatus::Saving;
        Some(SaveJob {
            store: Arc::clone(&self.store),
            document_id: self.document_id.clone(),
            content: DocumentContent {
                scene_json,
                thumbnail_data_url,
                last_saved_at_ms: Some(epoch_millis()),
            },
        })
    }

    /// Record the outcome of a job from [`prepare_save`](Self::prepare_save).
    pub fn complete_save(&mut self, result: &StorageResult<()>, now: Instant) {
        self.in_flight = false;
        let resave = std::mem::take(&mut self.resave);
        match result {
            Ok(()) => {
                log::info!("Saved document {}", self.document_id);
                self.status = SaveStatus::Saved { at_ms: epoch_millis() };
                if resave || self.deadline.is_some() {
                    self.deadline.get_or_insert(now + self.debounce);
                    self.status = SaveStatus::Pending;
                }
            }
            Err(e) => {
                log::error!("Failed to save document {}: {}", self.document_id, e);
                self.status = SaveStatus::Failed { message: e.to_string() };
                // Retry with whatever the scene looks like by then.
                self.deadline.get_or_insert(now + self.debounce);
            }
        }
    }

    /// Save immediately, bypassing the debounce. Returns `Ok(false)` when
    /// nothing was written because another save is in flight.
    pub async fn save_now(&mut self, objects: &[SceneObject], now: Instant) -> StorageResult<bool> {
        let Some(job) = self.prepare_save(objects) else {
            return Ok(false);
        };
        let result = job.run().await;
        self.complete_save(&result, now);
        result.map(|()| true)
    }

    /// Parse a stored document and make it the bridge's target.
    ///
    /// Never fails: unreadable content becomes an empty scene and the problems
    /// are listed in the report.
    pub fn load(&mut self, document: &StoredDocument) -> LoadedScene {
        let (objects, report) = decode_scene_lenient(&document.content.scene_json);
        log::info!(
            "Loaded document {} ({} objects, {} skipped)",
            document.id,
            objects.len(),
            report.skipped
        );
        self.document_id = document.id.clone();
        self.deadline = None;
        self.resave = false;
        self.status = match document.content.last_saved_at_ms {
            Some(at_ms) => SaveStatus::Saved { at_ms },
            None => SaveStatus::Clean,
        };
        LoadedScene {
            graph: SceneGraph::from_objects(objects),
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Rgba, StickyColor, StickyNote};
    use crate::storage::MemoryDocumentStore;
    use kurbo::{Point, Rect};
    use pollster::block_on;

    fn bridge() -> (Arc<MemoryDocumentStore>, PersistenceBridge<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let bridge = PersistenceBridge::new(Arc::clone(&store), "doc");
        (store, bridge)
    }

    fn scene() -> Vec<SceneObject> {
        vec![SceneObject::rectangle(Rect::new(0.0, 0.0, 10.0, 10.0), Rgba::black())]
    }

    fn ms(start: Instant, millis: u64) -> Instant {
        start + Duration::from_millis(millis)
    }

    #[test]
    fn test_debounce_collapses_bursts() {
        let (store, mut bridge) = bridge();
        let t0 = Instant::now();
        let objects = scene();

        // Five mutations 100ms apart.
        for i in 0..5 {
            bridge.schedule_save(ms(t0, i * 100));
        }
        assert_eq!(bridge.status(), &SaveStatus::Pending);
        assert!(bridge.poll(&objects, ms(t0, 2000)).is_none());

        let job = bridge.poll(&objects, ms(t0, 2400)).unwrap();
        assert!(bridge.poll(&objects, ms(t0, 2500)).is_none());
        let result = block_on(job.run());
        bridge.complete_save(&result, ms(t0, 2600));

        assert_eq!(store.write_count(), 1);
        assert!(matches!(bridge.status(), SaveStatus::Saved { .. }));
        assert!(!bridge.is_dirty());
        let saved = block_on(store.get_document("doc")).unwrap();
        assert_eq!(saved.content.scene_json, encode_scene(&objects).unwrap());
    }

    #[test]
    fn test_overlapping_save_is_deferred() {
        let (store, mut bridge) = bridge();
        let t0 = Instant::now();
        let objects = scene();

        let first = bridge.prepare_save(&objects).unwrap();
        assert!(bridge.prepare_save(&objects).is_none());
        assert!(bridge.is_dirty());

        let result = block_on(first.run());
        bridge.complete_save(&result, t0);
        assert_eq!(bridge.status(), &SaveStatus::Pending);
        assert!(bridge.poll(&objects, ms(t0, 1999)).is_none());

        let second = bridge.poll(&objects, ms(t0, 2000)).unwrap();
        bridge.complete_save(&block_on(second.run()), ms(t0, 2001));
        assert_eq!(store.write_count(), 2);
        assert!(!bridge.is_dirty());
    }

    #[test]
    fn test_mutation_during_flight_waits_for_completion() {
        let (_store, mut bridge) = bridge();
        let t0 = Instant::now();
        let objects = scene();

        bridge.schedule_save(t0);
        let job = bridge.poll(&objects, ms(t0, 2000)).unwrap();
        bridge.schedule_save(ms(t0, 2100));
        assert_eq!(bridge.status(), &SaveStatus::Saving);
        assert!(bridge.poll(&objects, ms(t0, 5000)).is_none());

        bridge.complete_save(&block_on(job.run()), ms(t0, 5000));
        assert!(bridge.poll(&objects, ms(t0, 5000)).is_some());
    }

    #[test]
    fn test_failed_save_stays_dirty_and_retries() {
        let (store, mut bridge) = bridge();
        let t0 = Instant::now();
        let objects = scene();
        store.set_fail_writes(true);

        assert!(block_on(bridge.save_now(&objects, t0)).is_err());
        assert!(matches!(bridge.status(), SaveStatus::Failed { .. }));
        assert!(bridge.status().is_unsaved());
        assert!(bridge.is_dirty());

        store.set_fail_writes(false);
        let retry = bridge.poll(&objects, ms(t0, 2000)).unwrap();
        bridge.complete_save(&block_on(retry.run()), ms(t0, 2000));
        assert_eq!(store.write_count(), 1);
        assert!(!bridge.is_dirty());
    }

    #[test]
    fn test_saved_content() {
        let (store, mut bridge) = bridge();
        let objects = scene();
        assert!(block_on(bridge.save_now(&objects, Instant::now())).unwrap());

        let doc = block_on(store.get_document("doc")).unwrap();
        assert!(doc.content.scene_json.contains("\"rect\""));
        assert!(doc.content.last_saved_at_ms.is_some());
        assert!(
            doc.content
                .thumbnail_data_url
                .as_deref()
                .is_some_and(|url| url.starts_with("data:image/png;base64,"))
        );
    }

    #[test]
    fn test_sticky_note_survives_save_and_load() {
        let (store, mut bridge) = bridge();
        let note = SceneObject::sticky_note(StickyNote::new(Point::new(40.0, 40.0), StickyColor::Pink, "Hello"));
        let id = note.id();
        block_on(bridge.save_now(&[note], Instant::now())).unwrap();

        let doc = block_on(fetch_scene(store.as_ref(), "doc")).unwrap();
        let loaded = bridge.load(&doc);
        let object = loaded.graph.get(id).unwrap();
        let crate::shapes::ObjectKind::StickyNote(note) = &object.kind else {
            panic!("expected a sticky note, got {:?}", object.kind);
        };
        assert_eq!(note.color, StickyColor::Pink);
        assert_eq!(note.text_meta().unwrap().text, "Hello");
        assert!(!loaded.report.malformed);
    }

    #[test]
    fn test_missing_document_is_empty() {
        let (store, mut bridge) = bridge();
        let doc = block_on(fetch_scene(store.as_ref(), "fresh")).unwrap();
        let loaded = bridge.load(&doc);
        assert!(loaded.graph.is_empty());
        assert_eq!(bridge.document_id(), "fresh");
        assert_eq!(bridge.status(), &SaveStatus::Clean);
    }

    #[test]
    fn test_malformed_document_loads_empty() {
        let (_store, mut bridge) = bridge();
        let mut doc = StoredDocument::new("bad", "bad");
        doc.content.scene_json = "{ not json".to_string();
        let loaded = bridge.load(&doc);
        assert!(loaded.graph.is_empty());
        assert!(loaded.report.malformed);
    }
}
