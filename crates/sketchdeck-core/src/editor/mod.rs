//! An editing session: the scene plus everything that reacts to input.
//!
//! [`Editor`] owns the scene graph, the undo history, the camera, the active
//! tool and the persistence bridge. Every mutation goes through
//! [`Editor::commit`], which turns the graph's pending changes into exactly
//! one history snapshot and one debounced save.

mod actions;
mod dispatch;

use crate::Instant;
use crate::camera::Camera;
use crate::canvas::SceneGraph;
use crate::config::EditorConfig;
use crate::history::{History, RecordGate};
use crate::input::ClickTracker;
use crate::record::LoadReport;
use crate::selection::{Selection, SelectionSummary};
use crate::shapes::{ObjectId, ObjectKind, SceneObject};
use crate::snap::SnapGuide;
use crate::storage::{DocumentStore, PersistenceBridge, SaveJob, SaveStatus, StorageResult, StoredDocument};
use crate::tools::{Gesture, ToolFactories, ToolKind, ToolManager};
use kurbo::Point;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Objects copied by the user, with a counter so repeated pastes cascade.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    objects: Vec<SceneObject>,
    pastes: u32,
}

impl Clipboard {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    fn set(&mut self, objects: Vec<SceneObject>) {
        self.objects = objects;
        self.pastes = 0;
    }
}

/// In-progress canvas text edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    pub id: ObjectId,
    /// The object was created by this edit and is dropped if left blank.
    pub is_new: bool,
}

pub struct Editor<S: DocumentStore> {
    graph: SceneGraph,
    history: History,
    gate: RecordGate,
    bridge: PersistenceBridge<S>,
    camera: Camera,
    tools: ToolManager,
    selection: Selection,
    clipboard: Clipboard,
    notifications: Vec<Notification>,
    guides: Vec<SnapGuide>,
    editing: Option<TextEdit>,
    native_input_focus: bool,
    clicks: ClickTracker,
    /// Last pointer position in screen space, for touches that end without one.
    last_pointer: Point,
    config: EditorConfig,
}

impl<S: DocumentStore> Editor<S> {
    pub fn new(store: Arc<S>, document_id: impl Into<String>, config: EditorConfig, factories: ToolFactories) -> Self {
        let config = config.normalized();
        let bridge = PersistenceBridge::new(store, document_id)
            .with_debounce(Duration::from_millis(config.autosave_debounce_ms))
            .with_thumbnail(config.thumbnail_scale, config.thumbnail_max_side);

        let mut tools = ToolManager::new(factories);
        tools.brush = config.brush;
        tools.font_size = config.font_size;

        let graph = SceneGraph::new();
        let mut history = History::new(config.history_limit);
        if let Err(e) = history.reset(graph.objects()) {
            log::error!("Failed to record initial snapshot: {}", e);
        }

        Self {
            graph,
            history,
            gate: RecordGate::new(),
            bridge,
            camera: Camera::default(),
            tools,
            selection: Selection::new(),
            clipboard: Clipboard::default(),
            notifications: Vec::new(),
            guides: Vec::new(),
            editing: None,
            native_input_focus: false,
            clicks: ClickTracker::new(),
            last_pointer: Point::ZERO,
            config,
        }
    }

    /// Session with default settings and tool factories.
    pub fn with_store(store: Arc<S>, document_id: impl Into<String>) -> Self {
        Self::new(store, document_id, EditorConfig::default(), ToolFactories::default())
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    /// Brush, default fill and font settings. Changing them does not touch
    /// the scene.
    pub fn tools_mut(&mut self) -> &mut ToolManager {
        &mut self.tools
    }

    pub fn tool(&self) -> ToolKind {
        self.tools.current()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_summary(&self) -> SelectionSummary {
        SelectionSummary::from_graph(&self.selection, &self.graph)
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Snap guides for the drag in progress.
    pub fn guides(&self) -> &[SnapGuide] {
        &self.guides
    }

    pub fn editing(&self) -> Option<TextEdit> {
        self.editing
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub(crate) fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push(Notification {
            level,
            message: message.into(),
        });
    }

    // --- Commit ---

    /// Turn pending graph changes into one snapshot and one save trigger.
    /// Returns whether anything was recorded.
    pub(crate) fn commit(&mut self, now: Instant) -> bool {
        let changes = self.graph.take_changes();
        if changes.is_empty() {
            return false;
        }
        if self.gate.is_suppressed() {
            log::debug!("Dropping {} changes recorded while restoring", changes.len());
            return false;
        }
        if let Err(e) = self.history.push_snapshot(self.graph.objects()) {
            log::error!("Failed to record snapshot: {}", e);
        }
        log::debug!("Committed {} changes ({} snapshots)", changes.len(), self.history.len());
        self.bridge.schedule_save(now);
        true
    }

    /// Drop pending changes without recording them.
    pub(crate) fn discard_changes(&mut self) {
        self.graph.take_changes();
    }

    /// Add an object with the interactivity the current tool expects.
    pub(crate) fn insert_object(&mut self, mut object: SceneObject) -> ObjectId {
        let (selectable, evented) = self.tools.current().object_interactivity();
        object.set_interactivity(selectable, evented);
        self.graph.add(object)
    }

    pub(crate) fn apply_tool_interactivity(&mut self) {
        let (selectable, evented) = self.tools.current().object_interactivity();
        self.graph.set_interactivity(selectable, evented);
    }

    // --- Undo / redo ---

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.undo_at(Instant::now())
    }

    pub fn undo_at(&mut self, now: Instant) -> bool {
        self.finish_interaction(now);
        let restored = self.history.undo();
        self.apply_restore(restored, now, "undo")
    }

    pub fn redo(&mut self) -> bool {
        self.redo_at(Instant::now())
    }

    pub fn redo_at(&mut self, now: Instant) -> bool {
        self.finish_interaction(now);
        let restored = self.history.redo();
        self.apply_restore(restored, now, "redo")
    }

    fn apply_restore(
        &mut self,
        restored: Result<Option<Vec<SceneObject>>, crate::history::HistoryError>,
        now: Instant,
        what: &str,
    ) -> bool {
        match restored {
            Ok(Some(objects)) => {
                {
                    let _guard = self.gate.suppress();
                    self.graph.replace_all(objects);
                    self.commit(now);
                }
                self.apply_tool_interactivity();
                self.selection.retain_existing(&self.graph);
                // The store has not seen the restored state yet.
                self.bridge.schedule_save(now);
                true
            }
            Ok(None) => false,
            Err(e) => {
                log::error!("Failed to {}: {}", what, e);
                self.notify(NotificationLevel::Error, format!("Could not {}: {}", what, e));
                false
            }
        }
    }

    /// End text editing and drop any half-finished gesture before a
    /// whole-scene operation.
    fn finish_interaction(&mut self, now: Instant) {
        self.exit_editing_at(now);
        let interrupted = std::mem::take(&mut self.tools.gesture);
        self.cancel_gesture(interrupted);
    }

    // --- Viewport ---

    pub fn zoom_in(&mut self) -> bool {
        self.camera.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.camera.zoom_out()
    }

    pub fn reset_view(&mut self) {
        self.camera.reset();
    }

    /// Fit every object into the viewport.
    pub fn zoom_to_fit(&mut self) {
        if let Some(bounds) = self.graph.bounds() {
            self.camera.fit_to_bounds(bounds, 40.0);
        }
    }

    // --- Persistence ---

    pub fn save_status(&self) -> &SaveStatus {
        self.bridge.status()
    }

    pub fn is_dirty(&self) -> bool {
        self.bridge.is_dirty()
    }

    pub fn document_id(&self) -> &str {
        self.bridge.document_id()
    }

    /// Hand out a save job once the debounce has elapsed. The host runs it
    /// and reports back through [`finish_save`](Self::finish_save).
    pub fn tick(&mut self, now: Instant) -> Option<SaveJob<S>> {
        self.bridge.poll(self.graph.objects(), now)
    }

    pub fn finish_save(&mut self, result: &StorageResult<()>, now: Instant) {
        self.bridge.complete_save(result, now);
    }

    /// Write the current scene immediately.
    pub async fn save_now(&mut self, now: Instant) -> StorageResult<bool> {
        self.exit_editing_at(now);
        self.bridge.save_now(self.graph.objects(), now).await
    }

    /// Replace the session with a stored document. History restarts from the
    /// loaded state.
    pub fn open(&mut self, document: &StoredDocument) -> LoadReport {
        self.editing = None;
        let interrupted = std::mem::take(&mut self.tools.gesture);
        self.cancel_gesture(interrupted);

        let loaded = self.bridge.load(document);
        self.graph = loaded.graph;
        self.apply_tool_interactivity();
        self.selection.clear();
        self.guides.clear();
        self.clicks.reset();
        if let Err(e) = self.history.reset(self.graph.objects()) {
            log::error!("Failed to record initial snapshot: {}", e);
        }

        let report = loaded.report;
        if report.malformed {
            self.notify(NotificationLevel::Warning, "This document could not be read and was opened empty");
        } else if report.skipped > 0 {
            self.notify(
                NotificationLevel::Warning,
                format!("{} unsupported objects were skipped", report.skipped),
            );
        }
        report
    }
}

/// Recompute text size after content or font changed. Sticky notes keep
/// their outer size and resize only the text child.
pub(crate) fn remeasure_text(object: &mut SceneObject) {
    match &mut object.kind {
        ObjectKind::TextBox(meta) => {
            let (width, height) = meta.measure();
            object.geometry.width = width;
            object.geometry.height = height;
        }
        ObjectKind::StickyNote(note) => note.remeasure_text(),
        _ => {}
    }
}

impl<S: DocumentStore> Editor<S> {
    /// Undo a gesture interrupted by a tool switch, a second finger or a
    /// whole-scene operation.
    pub(crate) fn cancel_gesture(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::Shape { id, .. } => {
                self.graph.remove(id);
                self.discard_changes();
            }
            Gesture::Drag { origins, moved: true, .. } => {
                for (id, origin) in origins {
                    self.graph.modify(id, |o| o.set_position(origin));
                }
                self.discard_changes();
            }
            Gesture::Idle
            | Gesture::RubberBand { .. }
            | Gesture::Drag { .. }
            | Gesture::Pan { .. }
            | Gesture::Stroke { .. }
            | Gesture::TouchPan { .. } => {}
        }
        self.guides.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Modifiers, PointerEvent, TouchEvent, TouchPoint, WheelEvent};
    use crate::record::encode_scene;
    use crate::shapes::StickyColor;
    use crate::snap::SnapConfig;
    use crate::storage::MemoryDocumentStore;
    use kurbo::{Rect, Vec2};
    use pollster::block_on;

    pub(super) fn editor() -> (Arc<MemoryDocumentStore>, Editor<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let config = EditorConfig {
            snap: SnapConfig {
                grid_enabled: false,
                ..SnapConfig::default()
            },
            ..EditorConfig::default()
        };
        let editor = Editor::new(
            Arc::clone(&store),
            "doc",
            config,
            ToolFactories::fixed_sticky_color(StickyColor::Yellow),
        );
        (store, editor)
    }

    fn ms(start: Instant, millis: u64) -> Instant {
        start + Duration::from_millis(millis)
    }

    fn scene_json(editor: &Editor<MemoryDocumentStore>) -> String {
        encode_scene(editor.graph().objects()).unwrap()
    }

    #[test]
    fn test_draw_rectangle_scenario() {
        let (store, mut editor) = editor();
        let t0 = Instant::now();
        editor.set_tool(ToolKind::Rectangle);

        editor.handle_pointer_at(&PointerEvent::down(Point::new(10.0, 10.0)), t0);
        editor.handle_pointer_at(&PointerEvent::moved(Point::new(110.0, 60.0)), t0);
        editor.handle_pointer_at(&PointerEvent::up(Point::new(110.0, 60.0)), t0);

        assert_eq!(editor.graph().len(), 1);
        let rect = &editor.graph().objects()[0];
        assert!(matches!(rect.kind, ObjectKind::Rectangle));
        assert_eq!(rect.bounds(), Rect::new(10.0, 10.0, 110.0, 60.0));
        assert_eq!(editor.selection().ids(), &[rect.id()]);
        assert_eq!(editor.history().len(), 2);
        assert_eq!(editor.save_status(), &SaveStatus::Pending);

        assert!(editor.tick(ms(t0, 1999)).is_none());
        let job = editor.tick(ms(t0, 2000)).unwrap();
        let result = block_on(job.run());
        editor.finish_save(&result, ms(t0, 2010));
        assert_eq!(store.write_count(), 1);
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_undo_after_delete() {
        let (_store, mut editor) = editor();
        let t0 = Instant::now();
        let id = editor.add_sticky_note_at(Some(Point::new(50.0, 50.0)), "keep me", t0);
        let before_delete = scene_json(&editor);
        assert_eq!(editor.delete_selected_at(t0), 1);
        assert!(editor.graph().is_empty());
        assert_eq!(editor.history().len(), 3);

        assert!(editor.undo_at(t0));
        assert!(editor.graph().contains(id));
        assert_eq!(scene_json(&editor), before_delete);
        // Restoring is not recorded as a new step.
        assert_eq!(editor.history().len(), 2);
        assert!(editor.can_redo());

        assert!(editor.redo_at(t0));
        assert!(editor.graph().is_empty());
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_burst_of_edits_saves_final_state_once() {
        let (store, mut editor) = editor();
        let t0 = Instant::now();
        let at = |ms: u64| t0 + Duration::from_millis(ms);

        let id = editor.add_sticky_note_at(Some(Point::ZERO), "draft", at(0));
        editor.add_image_at("a.png", Some(Point::new(400.0, 0.0)), at(100));
        editor.set_fill_color_at(crate::shapes::Rgba::rgb(10, 20, 30), at(200));
        editor.select_all();
        editor.duplicate_selected_at(at(300));
        editor.graph.modify(id, |o| o.set_position(Point::new(5.0, 5.0)));
        editor.commit(at(400));
        assert_eq!(editor.history().len(), 6);

        assert!(editor.tick(at(2300)).is_none());
        let job = editor.tick(at(2400)).unwrap();
        let result = block_on(job.run());
        editor.finish_save(&result, at(2500));
        assert!(editor.tick(at(10_000)).is_none());

        assert_eq!(store.write_count(), 1);
        let saved = block_on(store.get_document("doc")).unwrap();
        assert_eq!(saved.content.scene_json, scene_json(&editor));
    }

    #[test]
    fn test_undo_redo_inverse() {
        let (_store, mut editor) = editor();
        let t0 = Instant::now();
        editor.add_image_at("a.png", Some(Point::new(0.0, 0.0)), t0);
        let after_first = scene_json(&editor);
        editor.add_image_at("b.png", Some(Point::new(600.0, 0.0)), t0);
        editor.add_image_at("c.png", Some(Point::new(1200.0, 0.0)), t0);
        let after_third = scene_json(&editor);

        assert!(editor.undo_at(t0));
        assert!(editor.undo_at(t0));
        assert_eq!(scene_json(&editor), after_first);

        assert!(editor.redo_at(t0));
        assert!(editor.redo_at(t0));
        assert_eq!(scene_json(&editor), after_third);
        assert!(!editor.redo_at(t0));
    }

    #[test]
    fn test_new_mutation_clears_redo() {
        let (_store, mut editor) = editor();
        let t0 = Instant::now();
        editor.add_image_at("a.png", None, t0);
        editor.add_image_at("b.png", None, t0);
        assert!(editor.undo_at(t0));
        assert!(editor.can_redo());

        editor.add_sticky_note_at(None, "", t0);
        assert!(!editor.can_redo());
        assert!(!editor.redo_at(t0));
    }

    #[test]
    fn test_undo_on_fresh_editor_is_noop() {
        let (_store, mut editor) = editor();
        assert!(!editor.can_undo());
        assert!(!editor.undo());
        assert!(!editor.redo());
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_undo_reapplies_tool_interactivity() {
        let (_store, mut editor) = editor();
        let t0 = Instant::now();
        editor.add_image_at("a.png", None, t0);
        editor.add_image_at("b.png", None, t0);
        editor.set_tool(ToolKind::Draw);
        assert!(editor.undo_at(t0));
        let object = &editor.graph().objects()[0];
        assert!(!object.flags.selectable);
        assert!(!object.flags.evented);
    }

    #[test]
    fn test_viewport_operations_never_commit() {
        let (_store, mut editor) = editor();
        let t0 = Instant::now();

        assert!(editor.zoom_in());
        assert!(editor.zoom_out());
        editor.handle_wheel(&WheelEvent {
            position: Point::new(100.0, 100.0),
            delta: Vec2::new(0.0, 40.0),
            modifiers: Modifiers::ctrl(),
        });
        editor.handle_wheel(&WheelEvent {
            position: Point::new(100.0, 100.0),
            delta: Vec2::new(15.0, 25.0),
            modifiers: Modifiers::NONE,
        });

        editor.set_tool(ToolKind::Pan);
        editor.handle_pointer_at(&PointerEvent::down(Point::new(0.0, 0.0)), t0);
        editor.handle_pointer_at(&PointerEvent::moved(Point::new(30.0, 30.0)), t0);
        editor.handle_pointer_at(&PointerEvent::up(Point::new(30.0, 30.0)), t0);

        let touches = |x: f64| {
            vec![
                TouchPoint {
                    id: 1,
                    position: Point::new(x, 0.0),
                },
                TouchPoint {
                    id: 2,
                    position: Point::new(x, 100.0),
                },
            ]
        };
        editor.handle_touch_at(&TouchEvent::Start { touches: touches(0.0) }, t0);
        editor.handle_touch_at(&TouchEvent::Move { touches: touches(10.0) }, t0);
        editor.handle_touch_at(&TouchEvent::End { touches: vec![] }, t0);

        editor.reset_view();
        assert_eq!(editor.history().len(), 1);
        assert!(!editor.is_dirty());
        assert!(editor.tick(ms(t0, 60_000)).is_none());
    }

    #[test]
    fn test_failed_save_keeps_session_dirty() {
        let (store, mut editor) = editor();
        let t0 = Instant::now();
        editor.add_image_at("a.png", None, t0);
        store.set_fail_writes(true);

        let job = editor.tick(ms(t0, 2000)).unwrap();
        editor.finish_save(&block_on(job.run()), ms(t0, 2100));
        assert!(matches!(editor.save_status(), SaveStatus::Failed { .. }));
        assert!(editor.is_dirty());

        store.set_fail_writes(false);
        editor.add_image_at("b.png", None, ms(t0, 2200));
        let job = editor.tick(ms(t0, 4200)).unwrap();
        assert!(job.content().scene_json.contains("b.png"));
        editor.finish_save(&block_on(job.run()), ms(t0, 4300));
        assert!(!editor.is_dirty());
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_open_round_trip() {
        let (store, mut editor) = editor();
        let t0 = Instant::now();
        let note = editor.add_sticky_note_at(Some(Point::new(10.0, 10.0)), "persist", t0);
        assert!(block_on(editor.save_now(t0)).unwrap());

        let (_, mut other) = self::editor();
        let document = block_on(store.get_document("doc")).unwrap();
        let report = other.open(&document);
        assert!(!report.malformed);
        assert!(other.graph().contains(note));
        assert_eq!(other.history().len(), 1);
        assert!(!other.can_undo());
        assert_eq!(scene_json(&other), scene_json(&editor));
    }

    #[test]
    fn test_open_malformed_document() {
        let (_store, mut editor) = editor();
        editor.add_image_at("a.png", None, Instant::now());
        let mut document = StoredDocument::new("broken", "broken");
        document.content.scene_json = "[oops".to_string();

        let report = editor.open(&document);
        assert!(report.malformed);
        assert!(editor.graph().is_empty());
        assert_eq!(editor.document_id(), "broken");
        let notes = editor.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Warning);
    }
}
