//! Scene mutations exposed to toolbars and menus.
//!
//! Each entry point has a `*_at` variant taking the current time, which is
//! what the debounced save is measured from.

use super::{Editor, NotificationLevel, remeasure_text};
use crate::Instant;
use crate::generation::{FALLBACK_IMAGE_SIZE, GeneratedImage, GenerationError, MAX_INSERTED_IMAGE_SIZE};
use crate::shapes::{
    ObjectId, ObjectKind, Rgba, STICKY_SIZE, SceneObject, StickyColor, StickyNote, TextMeta, fit_within,
};
use crate::storage::DocumentStore;
use kurbo::{Point, Vec2};

impl<S: DocumentStore> Editor<S> {
    /// Top-left position that centers a box of the given size in the view.
    fn centered_in_view(&self, width: f64, height: f64) -> Point {
        let center = self.camera.center_world();
        Point::new(center.x - width / 2.0, center.y - height / 2.0)
    }

    fn image_size(&self, src: &str, reported: Option<(f64, f64)>) -> (f64, f64) {
        let (width, height) = reported
            .or_else(|| (self.tools.factories.image_size)(src))
            .unwrap_or((FALLBACK_IMAGE_SIZE, FALLBACK_IMAGE_SIZE));
        fit_within(width, height, MAX_INSERTED_IMAGE_SIZE, MAX_INSERTED_IMAGE_SIZE)
    }

    // --- Insertion ---

    pub fn add_image(&mut self, src: &str, position: Option<Point>) -> ObjectId {
        self.add_image_at(src, position, Instant::now())
    }

    /// Insert an image, centered in the view unless a position is given.
    pub fn add_image_at(&mut self, src: &str, position: Option<Point>, now: Instant) -> ObjectId {
        let (width, height) = self.image_size(src, None);
        self.insert_image(src, width, height, position, now)
    }

    fn insert_image(&mut self, src: &str, width: f64, height: f64, position: Option<Point>, now: Instant) -> ObjectId {
        let position = position.unwrap_or_else(|| self.centered_in_view(width, height));
        let id = self.insert_object(SceneObject::image(position, width, height, src));
        self.selection.select(id);
        self.commit(now);
        id
    }

    pub fn add_sticky_note(&mut self, position: Option<Point>, text: &str) -> ObjectId {
        self.add_sticky_note_at(position, text, Instant::now())
    }

    pub fn add_sticky_note_at(&mut self, position: Option<Point>, text: &str, now: Instant) -> ObjectId {
        let size = STICKY_SIZE;
        let position = position.unwrap_or_else(|| self.centered_in_view(size, size));
        let color = self.tools.next_sticky_color();
        let id = self.insert_object(SceneObject::sticky_note(StickyNote::new(position, color, text)));
        self.selection.select(id);
        self.commit(now);
        id
    }

    pub fn add_text(&mut self, text: &str, position: Option<Point>) -> Option<ObjectId> {
        self.add_text_at(text, position, Instant::now())
    }

    /// Insert a text box. Blank text inserts nothing.
    pub fn add_text_at(&mut self, text: &str, position: Option<Point>, now: Instant) -> Option<ObjectId> {
        let meta = TextMeta::new(text).with_font_size(self.tools.font_size);
        if meta.is_blank() {
            return None;
        }
        let (width, height) = meta.measure();
        let position = position.unwrap_or_else(|| self.centered_in_view(width, height));
        let id = self.insert_object(SceneObject::text_box(position, meta, self.tools.text_color));
        self.selection.select(id);
        self.commit(now);
        Some(id)
    }

    /// Insert the result of an image generation, or tell the user why there
    /// is none. The active tool and gesture are left alone either way.
    pub fn apply_generation_result(
        &mut self,
        result: Result<GeneratedImage, GenerationError>,
        position: Option<Point>,
    ) -> Option<ObjectId> {
        self.apply_generation_result_at(result, position, Instant::now())
    }

    pub fn apply_generation_result_at(
        &mut self,
        result: Result<GeneratedImage, GenerationError>,
        position: Option<Point>,
        now: Instant,
    ) -> Option<ObjectId> {
        let image = match result {
            Ok(image) if !image.url.trim().is_empty() => image,
            Ok(image) => {
                let e = GenerationError::EmptyResult(image.kind);
                log::warn!("{}", e);
                self.notify(NotificationLevel::Error, e.to_string());
                return None;
            }
            Err(e) => {
                log::warn!("Generation failed: {}", e);
                self.notify(NotificationLevel::Error, e.to_string());
                return None;
            }
        };
        let (width, height) = self.image_size(&image.url, image.size());
        let id = self.insert_image(&image.url, width, height, position, now);
        self.notify(NotificationLevel::Info, format!("{} added to the canvas", image.kind.label()));
        Some(id)
    }

    // --- Selection-wide edits ---

    pub fn select_all(&mut self) {
        let ids: Vec<ObjectId> = self
            .graph
            .objects()
            .iter()
            .filter(|o| o.flags.selectable)
            .map(SceneObject::id)
            .collect();
        self.selection.select_many(ids);
    }

    pub fn delete_selected(&mut self) -> usize {
        self.delete_selected_at(Instant::now())
    }

    /// Remove the selected objects. Returns how many were removed.
    pub fn delete_selected_at(&mut self, now: Instant) -> usize {
        let removed = self
            .selection
            .ids()
            .to_vec()
            .into_iter()
            .filter(|id| self.graph.remove(*id).is_some())
            .count();
        self.selection.clear();
        self.guides.clear();
        self.commit(now);
        removed
    }

    /// Copy the selected objects to the clipboard. Returns how many.
    pub fn copy_selected(&mut self) -> usize {
        let objects: Vec<SceneObject> = self
            .selection
            .ids()
            .iter()
            .filter_map(|id| self.graph.get(*id).cloned())
            .collect();
        if objects.is_empty() {
            return 0;
        }
        let count = objects.len();
        self.clipboard.set(objects);
        count
    }

    pub fn cut(&mut self) -> usize {
        self.cut_at(Instant::now())
    }

    pub fn cut_at(&mut self, now: Instant) -> usize {
        if self.copy_selected() == 0 {
            return 0;
        }
        self.delete_selected_at(now)
    }

    pub fn paste(&mut self) -> Vec<ObjectId> {
        self.paste_at(Instant::now())
    }

    /// Paste the clipboard with fresh ids. Each repeated paste is offset a
    /// little further so copies do not stack exactly.
    pub fn paste_at(&mut self, now: Instant) -> Vec<ObjectId> {
        if self.clipboard.is_empty() {
            return Vec::new();
        }
        self.clipboard.pastes += 1;
        let step = self.config.paste_offset * self.clipboard.pastes as f64;
        let copies = self.clipboard.objects.clone();
        self.insert_copies(copies, Vec2::new(step, step), now)
    }

    pub fn duplicate_selected(&mut self) -> Vec<ObjectId> {
        self.duplicate_selected_at(Instant::now())
    }

    pub fn duplicate_selected_at(&mut self, now: Instant) -> Vec<ObjectId> {
        let copies: Vec<SceneObject> = self
            .selection
            .ids()
            .iter()
            .filter_map(|id| self.graph.get(*id).cloned())
            .collect();
        let offset = self.config.paste_offset;
        self.insert_copies(copies, Vec2::new(offset, offset), now)
    }

    fn insert_copies(&mut self, copies: Vec<SceneObject>, offset: Vec2, now: Instant) -> Vec<ObjectId> {
        let ids: Vec<ObjectId> = copies
            .into_iter()
            .map(|mut object| {
                object.regenerate_ids();
                object.translate(offset);
                self.insert_object(object)
            })
            .collect();
        if !ids.is_empty() {
            self.selection.select_many(ids.iter().copied());
            self.commit(now);
        }
        ids
    }

    pub fn group_selected(&mut self) -> Option<ObjectId> {
        self.group_selected_at(Instant::now())
    }

    pub fn group_selected_at(&mut self, now: Instant) -> Option<ObjectId> {
        let id = self.graph.group(self.selection.ids())?;
        self.selection.select(id);
        self.commit(now);
        Some(id)
    }

    pub fn ungroup_selected(&mut self) -> Option<Vec<ObjectId>> {
        self.ungroup_selected_at(Instant::now())
    }

    /// Dissolve the selected generic groups. Sticky notes stay intact.
    pub fn ungroup_selected_at(&mut self, now: Instant) -> Option<Vec<ObjectId>> {
        let mut released = Vec::new();
        for id in self.selection.ids().to_vec() {
            if let Some(children) = self.graph.ungroup(id) {
                released.extend(children);
            }
        }
        if released.is_empty() {
            return None;
        }
        self.selection.select_many(released.iter().copied());
        self.commit(now);
        Some(released)
    }

    /// Apply `f` to each selected object and commit if any changed.
    fn modify_selected(&mut self, now: Instant, mut f: impl FnMut(&mut SceneObject) -> bool) -> bool {
        let mut changed = false;
        for id in self.selection.ids().to_vec() {
            let Some(object) = self.graph.get(id) else {
                continue;
            };
            let mut updated = object.clone();
            if f(&mut updated) && updated != *object {
                self.graph.modify(id, |o| *o = updated);
                changed = true;
            }
        }
        if changed {
            self.commit(now);
        }
        changed
    }

    pub fn set_fill_color(&mut self, color: Rgba) -> bool {
        self.set_fill_color_at(color, Instant::now())
    }

    /// Fill the selection. Sticky notes recolor their background. With
    /// nothing selected, this becomes the fill for new shapes.
    pub fn set_fill_color_at(&mut self, color: Rgba, now: Instant) -> bool {
        if self.selection.is_empty() {
            self.tools.shape_fill = color;
            return false;
        }
        self.modify_selected(now, |object| {
            object.set_fill(Some(color));
            true
        })
    }

    pub fn set_stroke_color(&mut self, color: Rgba) -> bool {
        self.set_stroke_color_at(color, Instant::now())
    }

    pub fn set_stroke_color_at(&mut self, color: Rgba, now: Instant) -> bool {
        if self.selection.is_empty() {
            self.tools.brush.color = color;
            return false;
        }
        self.modify_selected(now, |object| {
            object.set_stroke(Some(color));
            true
        })
    }

    pub fn set_font_size(&mut self, size: f64) -> bool {
        self.set_font_size_at(size, Instant::now())
    }

    /// Resize text of selected text boxes and sticky notes. Also the size
    /// used for new text.
    pub fn set_font_size_at(&mut self, size: f64, now: Instant) -> bool {
        if !(size.is_finite() && size > 0.0) {
            return false;
        }
        self.tools.font_size = size;
        self.modify_selected(now, |object| {
            let Some(meta) = object.text_meta_mut() else {
                return false;
            };
            meta.font_size = size;
            remeasure_text(object);
            true
        })
    }

    pub fn set_sticky_color(&mut self, color: StickyColor) -> bool {
        self.set_sticky_color_at(color, Instant::now())
    }

    /// Recolor selected sticky notes. Also the color for new notes.
    pub fn set_sticky_color_at(&mut self, color: StickyColor, now: Instant) -> bool {
        self.tools.sticky_color = Some(color);
        self.modify_selected(now, |object| match &mut object.kind {
            ObjectKind::StickyNote(note) => {
                note.set_color(color);
                true
            }
            _ => false,
        })
    }

    pub fn bring_to_front(&mut self) -> bool {
        self.bring_to_front_at(Instant::now())
    }

    pub fn bring_to_front_at(&mut self, now: Instant) -> bool {
        let mut changed = false;
        for id in self.selection.ids().to_vec() {
            changed |= self.graph.bring_to_front(id);
        }
        if changed {
            self.commit(now);
        }
        changed
    }

    pub fn send_to_back(&mut self) -> bool {
        self.send_to_back_at(Instant::now())
    }

    pub fn send_to_back_at(&mut self, now: Instant) -> bool {
        let mut changed = false;
        // Reverse keeps the selection's relative order at the back.
        for id in self.selection.ids().to_vec().into_iter().rev() {
            changed |= self.graph.send_to_back(id);
        }
        if changed {
            self.commit(now);
        }
        changed
    }
}
