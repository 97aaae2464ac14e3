//! Routing of pointer, touch, wheel and keyboard input to the active tool.

use super::{Editor, TextEdit, remeasure_text};
use crate::Instant;
use crate::input::{KeyEvent, Modifiers, MouseButton, PointerEvent, TouchEvent, WheelEvent};
use crate::shapes::{FreehandPath, ObjectId, ObjectKind, SceneObject, StickyNote, TextMeta};
use crate::shortcuts::{ShortcutAction, ShortcutRegistry};
use crate::snap::snap_position;
use crate::storage::DocumentStore;
use crate::tools::{Gesture, SelectionRect, ToolKind, circle_from_drag, is_degenerate, rect_from_drag};
use kurbo::{Point, Rect, Vec2};

/// Pick radius in screen pixels.
const HIT_TOLERANCE: f64 = 4.0;

impl<S: DocumentStore> Editor<S> {
    // --- Tools and focus ---

    /// Switch tools. Cancels the gesture in progress, ends text editing and
    /// updates which objects respond to the pointer.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if tool == self.tools.current() {
            return;
        }
        let now = Instant::now();
        self.exit_editing_at(now);
        let interrupted = self.tools.set_tool(tool);
        self.cancel_gesture(interrupted);
        self.apply_tool_interactivity();
        if matches!(tool, ToolKind::Draw | ToolKind::Pan) {
            self.selection.clear();
        }
        log::debug!("Tool: {}", tool.name());
    }

    /// Tell the editor a native text field owns the keyboard. Shortcuts are
    /// ignored until focus returns.
    pub fn set_native_input_focus(&mut self, focused: bool) {
        self.native_input_focus = focused;
    }

    pub fn has_native_input_focus(&self) -> bool {
        self.native_input_focus
    }

    // --- Text editing ---

    pub fn begin_editing(&mut self, id: ObjectId) -> bool {
        let editable = self.graph.get(id).is_some_and(SceneObject::is_text_like);
        if !editable {
            return false;
        }
        self.exit_editing_at(Instant::now());
        self.selection.select(id);
        self.editing = Some(TextEdit { id, is_new: false });
        true
    }

    /// Replace the text of the object being edited. Recorded when editing ends.
    pub fn update_editing_text(&mut self, text: &str) -> bool {
        let Some(edit) = self.editing else {
            return false;
        };
        self.graph.modify(edit.id, |object| {
            if let Some(meta) = object.text_meta_mut() {
                meta.text = text.to_string();
            }
            remeasure_text(object);
        })
    }

    pub fn exit_editing(&mut self) {
        self.exit_editing_at(Instant::now());
    }

    /// Leave text editing. A new text box left blank is removed without a
    /// history entry; anything else commits.
    pub fn exit_editing_at(&mut self, now: Instant) {
        let Some(edit) = self.editing.take() else {
            return;
        };
        let blank = self
            .graph
            .get(edit.id)
            .and_then(SceneObject::text_meta)
            .is_none_or(TextMeta::is_blank);

        if edit.is_new && blank {
            self.graph.remove(edit.id);
            self.selection.retain_existing(&self.graph);
            let changes = self.graph.take_changes();
            let only_this = changes.iter().all(|change| match change {
                crate::canvas::SceneChange::Added(id)
                | crate::canvas::SceneChange::Modified(id)
                | crate::canvas::SceneChange::Removed(id) => *id == edit.id,
                crate::canvas::SceneChange::Replaced => false,
            });
            if only_this {
                log::debug!("Discarded empty text box");
                return;
            }
            // Unrelated changes are still pending; record them.
            if let Err(e) = self.history.push_snapshot(self.graph.objects()) {
                log::error!("Failed to record snapshot: {}", e);
            }
            self.bridge.schedule_save(now);
            return;
        }
        self.commit(now);
    }

    // --- Pointer ---

    pub fn handle_pointer(&mut self, event: &PointerEvent) -> bool {
        self.handle_pointer_at(event, Instant::now())
    }

    /// Route a pointer event. Returns whether the event was consumed.
    pub fn handle_pointer_at(&mut self, event: &PointerEvent, now: Instant) -> bool {
        if matches!(self.tools.gesture, Gesture::TouchPan { .. }) {
            return false;
        }
        let screen = event.position();
        self.last_pointer = screen;
        let world = self.camera.screen_to_world(screen);

        match *event {
            PointerEvent::Down { button, modifiers, .. } => {
                if button != MouseButton::Left {
                    return false;
                }
                self.pointer_down(screen, world, modifiers, now)
            }
            PointerEvent::Move { .. } => self.pointer_move(screen, world),
            PointerEvent::Up { button, .. } => {
                if button != MouseButton::Left {
                    return false;
                }
                self.pointer_up(world, now)
            }
        }
    }

    fn pointer_down(&mut self, screen: Point, world: Point, modifiers: Modifiers, now: Instant) -> bool {
        let tolerance = HIT_TOLERANCE / self.camera.zoom;
        if let Some(edit) = self.editing {
            let on_edited = self.graph.get(edit.id).is_some_and(|o| o.hit_test(world, tolerance));
            if on_edited {
                return true;
            }
            self.exit_editing_at(now);
        }

        match self.tools.current() {
            ToolKind::Select => {
                let hit = self.graph.objects_at_point(world, tolerance).first().copied();
                let double = self.clicks.register(screen, now);
                match hit {
                    Some(id) => {
                        if double && self.begin_editing(id) {
                            return true;
                        }
                        if modifiers.shift {
                            self.selection.toggle(id);
                        } else if !self.selection.contains(id) {
                            self.selection.select(id);
                        }
                        if self.selection.contains(id) {
                            let origins = self
                                .selection
                                .ids()
                                .iter()
                                .filter_map(|sid| self.graph.get(*sid).map(|o| (*sid, o.position())))
                                .collect();
                            self.tools.gesture = Gesture::Drag {
                                primary: id,
                                start: world,
                                origins,
                                moved: false,
                            };
                        }
                    }
                    None => {
                        if !modifiers.shift {
                            self.selection.clear();
                        }
                        self.guides.clear();
                        self.tools.gesture = Gesture::RubberBand {
                            start: world,
                            current: world,
                        };
                    }
                }
            }
            ToolKind::Pan => {
                self.tools.gesture = Gesture::Pan { last: screen };
            }
            ToolKind::Rectangle => {
                let rect = Rect::from_origin_size(world, (0.0, 0.0));
                let id = self.insert_object(SceneObject::rectangle(rect, self.tools.shape_fill));
                self.tools.gesture = Gesture::Shape { id, anchor: world };
            }
            ToolKind::Circle => {
                let id = self.insert_object(SceneObject::circle(world, 0.0, self.tools.shape_fill));
                self.tools.gesture = Gesture::Shape { id, anchor: world };
            }
            ToolKind::Text => {
                let meta = TextMeta::new("").with_font_size(self.tools.font_size);
                let id = self.insert_object(SceneObject::text_box(world, meta, self.tools.text_color));
                self.selection.select(id);
                self.editing = Some(TextEdit { id, is_new: true });
            }
            ToolKind::StickyNote => {
                let color = self.tools.next_sticky_color();
                let id = self.insert_object(SceneObject::sticky_note(StickyNote::new(world, color, "")));
                self.selection.select(id);
                self.commit(now);
                self.editing = Some(TextEdit { id, is_new: false });
            }
            ToolKind::Draw => {
                let path = FreehandPath::new(vec![world]).with_composite(self.tools.brush.composite());
                self.tools.gesture = Gesture::Stroke { path };
            }
        }
        true
    }

    fn pointer_move(&mut self, screen: Point, world: Point) -> bool {
        match &mut self.tools.gesture {
            Gesture::Idle | Gesture::TouchPan { .. } => false,
            Gesture::RubberBand { current, .. } => {
                *current = world;
                true
            }
            Gesture::Pan { last } => {
                let delta = screen - *last;
                *last = screen;
                self.camera.pan(delta);
                true
            }
            Gesture::Stroke { path } => {
                path.push(world);
                true
            }
            Gesture::Shape { id, anchor } => {
                let (id, anchor) = (*id, *anchor);
                self.resize_shape(id, anchor, world);
                true
            }
            Gesture::Drag { .. } => {
                self.drag_selection(world);
                true
            }
        }
    }

    fn resize_shape(&mut self, id: ObjectId, anchor: Point, pointer: Point) {
        self.graph.modify(id, |object| match object.kind {
            ObjectKind::Circle { ref mut radius } => {
                let (origin, r) = circle_from_drag(anchor, pointer);
                *radius = r;
                object.geometry.position = origin;
                object.geometry.width = r * 2.0;
                object.geometry.height = r * 2.0;
            }
            _ => {
                let rect = rect_from_drag(anchor, pointer);
                object.geometry.position = rect.origin();
                object.geometry.width = rect.width();
                object.geometry.height = rect.height();
            }
        });
    }

    /// Move the selection so the primary object follows the pointer, snapped.
    fn drag_selection(&mut self, world: Point) {
        let Gesture::Drag {
            primary,
            start,
            ref origins,
            ..
        } = self.tools.gesture
        else {
            return;
        };
        let Some(&(_, primary_origin)) = origins.iter().find(|(id, _)| *id == primary) else {
            return;
        };
        let Some(object) = self.graph.get(primary) else {
            return;
        };

        let candidate = primary_origin + (world - start);
        let moving = object.bounds() + (candidate - object.position());
        let excluded: Vec<ObjectId> = origins.iter().map(|(id, _)| *id).collect();
        let others = self.graph.bounds_except(&excluded);
        let outcome = snap_position(moving, candidate, &others, &self.config.snap);
        let delta: Vec2 = outcome.position - primary_origin;
        self.guides = outcome.guides;

        let targets: Vec<(ObjectId, Point)> = origins.iter().map(|(id, origin)| (*id, *origin + delta)).collect();
        let mut moved = false;
        for (id, target) in targets {
            if self.graph.get(id).is_some_and(|o| o.position() != target) {
                self.graph.modify(id, |o| o.set_position(target));
                moved = true;
            }
        }
        if let Gesture::Drag { moved: was_moved, .. } = &mut self.tools.gesture {
            *was_moved |= moved;
        }
    }

    fn pointer_up(&mut self, world: Point, now: Instant) -> bool {
        match std::mem::take(&mut self.tools.gesture) {
            Gesture::Idle | Gesture::TouchPan { .. } => false,
            Gesture::Pan { .. } => true,
            Gesture::RubberBand { start, .. } => {
                let marquee = SelectionRect { start, current: world }.to_rect();
                if marquee.area() > 0.0 {
                    for id in self.graph.objects_in_rect(marquee) {
                        self.selection.add(id);
                    }
                }
                true
            }
            Gesture::Drag { moved, .. } => {
                self.guides.clear();
                if moved {
                    self.commit(now);
                }
                true
            }
            Gesture::Shape { id, anchor } => {
                self.resize_shape(id, anchor, world);
                self.guides.clear();
                let size = self.graph.get(id).map(|o| o.bounds().size().to_vec2()).unwrap_or_default();
                if is_degenerate(size) {
                    log::debug!("Discarding degenerate shape");
                    self.graph.remove(id);
                    self.discard_changes();
                    return true;
                }
                self.selection.select(id);
                self.commit(now);
                true
            }
            Gesture::Stroke { mut path } => {
                path.push(world);
                if path.len() < 2 {
                    return true;
                }
                let brush = self.tools.brush;
                self.insert_object(SceneObject::freehand(path, brush.stroke_color(), brush.width));
                self.commit(now);
                true
            }
        }
    }

    // --- Touch ---

    pub fn handle_touch(&mut self, event: &TouchEvent) -> bool {
        self.handle_touch_at(event, Instant::now())
    }

    /// Two fingers pan the view with any tool; one finger acts as the pointer.
    pub fn handle_touch_at(&mut self, event: &TouchEvent, now: Instant) -> bool {
        if let Some(center) = event.two_finger_center() {
            match &mut self.tools.gesture {
                Gesture::TouchPan { last_center } => {
                    let delta = center - *last_center;
                    *last_center = center;
                    self.camera.pan(delta);
                }
                _ => {
                    let interrupted = std::mem::take(&mut self.tools.gesture);
                    self.cancel_gesture(interrupted);
                    self.tools.gesture = Gesture::TouchPan { last_center: center };
                }
            }
            return true;
        }

        if matches!(self.tools.gesture, Gesture::TouchPan { .. }) {
            // Lifting fingers after a pan never starts a pointer gesture.
            if matches!(event, TouchEvent::End { .. }) || event.touches().is_empty() {
                self.tools.gesture = Gesture::Idle;
            }
            return true;
        }

        match (event, event.touches().first()) {
            (TouchEvent::Start { .. }, Some(touch)) => {
                self.handle_pointer_at(&PointerEvent::down(touch.position), now)
            }
            (TouchEvent::Move { .. }, Some(touch)) => {
                self.handle_pointer_at(&PointerEvent::moved(touch.position), now)
            }
            (TouchEvent::End { .. }, touch) => {
                let position = touch.map_or(self.last_pointer, |t| t.position);
                self.handle_pointer_at(&PointerEvent::up(position), now)
            }
            _ => false,
        }
    }

    // --- Wheel ---

    /// Scroll pans the view with any tool. Shift turns vertical scroll into
    /// horizontal panning; Ctrl/Cmd zooms around the pointer instead.
    pub fn handle_wheel(&mut self, event: &WheelEvent) -> bool {
        if event.modifiers.command() {
            return self.camera.zoom_wheel(event.position, event.delta.y);
        }
        let delta = if event.modifiers.shift && event.delta.x == 0.0 {
            Vec2::new(event.delta.y, 0.0)
        } else {
            event.delta
        };
        self.camera.pan(-delta);
        true
    }

    // --- Keyboard ---

    pub fn handle_key(&mut self, event: &KeyEvent) -> bool {
        self.handle_key_at(event, Instant::now())
    }

    /// Run the shortcut bound to a key. Ignored while a native text field
    /// has focus; during canvas text editing only Escape is handled.
    pub fn handle_key_at(&mut self, event: &KeyEvent, now: Instant) -> bool {
        if self.native_input_focus {
            return false;
        }
        let Some(action) = ShortcutRegistry::resolve(event) else {
            return false;
        };
        if self.editing.is_some() {
            if action == ShortcutAction::Escape {
                self.exit_editing_at(now);
                return true;
            }
            return false;
        }

        match action {
            ShortcutAction::Copy => self.copy_selected() > 0,
            ShortcutAction::Paste => !self.paste_at(now).is_empty(),
            ShortcutAction::Cut => self.cut_at(now) > 0,
            ShortcutAction::Duplicate => !self.duplicate_selected_at(now).is_empty(),
            ShortcutAction::Undo => self.undo_at(now),
            ShortcutAction::Redo => self.redo_at(now),
            ShortcutAction::SelectAll => {
                self.select_all();
                true
            }
            ShortcutAction::Delete => self.delete_selected_at(now) > 0,
            ShortcutAction::Group => self.group_selected_at(now).is_some(),
            ShortcutAction::Ungroup => self.ungroup_selected_at(now).is_some(),
            ShortcutAction::BringToFront => self.bring_to_front_at(now),
            ShortcutAction::SendToBack => self.send_to_back_at(now),
            ShortcutAction::Escape => {
                let interrupted = std::mem::take(&mut self.tools.gesture);
                self.cancel_gesture(interrupted);
                self.selection.clear();
                true
            }
        }
    }
}
