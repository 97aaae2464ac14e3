//! The active selection and what toolbars read from it.

use crate::canvas::SceneGraph;
use crate::shapes::{ObjectId, ObjectKind, Rgba, StickyColor};
use kurbo::Rect;

/// Selected object ids in selection order. The first id is the primary
/// object when dragging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ObjectId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    pub fn primary(&self) -> Option<ObjectId> {
        self.ids.first().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    /// Replace the selection with a single object.
    pub fn select(&mut self, id: ObjectId) {
        self.ids.clear();
        self.ids.push(id);
    }

    pub fn select_many(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        self.ids.clear();
        for id in ids {
            self.add(id);
        }
    }

    pub fn add(&mut self, id: ObjectId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    /// Add if absent, remove if present.
    pub fn toggle(&mut self, id: ObjectId) {
        if let Some(index) = self.ids.iter().position(|&s| s == id) {
            self.ids.remove(index);
        } else {
            self.ids.push(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids that no longer exist in the graph.
    pub fn retain_existing(&mut self, graph: &SceneGraph) {
        self.ids.retain(|id| graph.contains(*id));
    }
}

/// Derived selection state for presentation components.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionSummary {
    pub count: usize,
    /// Kind label when every selected object has the same kind.
    pub kind: Option<&'static str>,
    /// Fill shared by every selected object.
    pub fill: Option<Rgba>,
    /// Font size shared by every selected text-bearing object.
    pub font_size: Option<f64>,
    /// Color shared by every selected sticky note.
    pub sticky_color: Option<StickyColor>,
    pub bounds: Option<Rect>,
}

impl SelectionSummary {
    pub fn from_graph(selection: &Selection, graph: &SceneGraph) -> Self {
        let objects: Vec<_> = selection.ids().iter().filter_map(|id| graph.get(*id)).collect();
        if objects.is_empty() {
            return Self::default();
        }

        fn shared<T: PartialEq + Copy>(mut values: impl Iterator<Item = Option<T>>) -> Option<T> {
            let first = values.next()??;
            values.all(|v| v == Some(first)).then_some(first)
        }

        let fill_of = |kind: &ObjectKind, fill: Option<Rgba>| match kind {
            ObjectKind::StickyNote(note) => note.background().and_then(|bg| bg.style.fill),
            _ => fill,
        };

        Self {
            count: objects.len(),
            kind: shared(objects.iter().map(|o| Some(o.kind.label()))),
            fill: shared(objects.iter().map(|o| fill_of(&o.kind, o.style.fill))),
            font_size: shared(objects.iter().map(|o| o.text_meta().map(|m| m.font_size))),
            sticky_color: shared(objects.iter().map(|o| match &o.kind {
                ObjectKind::StickyNote(note) => Some(note.color),
                _ => None,
            })),
            bounds: objects.iter().map(|o| o.bounds()).reduce(|a, b| a.union(b)),
        }
    }

    pub fn has_text(&self) -> bool {
        self.font_size.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{SceneObject, StickyNote};
    use kurbo::Point;
    use uuid::Uuid;

    #[test]
    fn test_select_add_toggle() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut selection = Selection::new();
        selection.select(a);
        selection.add(b);
        selection.add(b);
        assert_eq!(selection.ids(), &[a, b]);
        selection.toggle(a);
        assert_eq!(selection.ids(), &[b]);
        assert_eq!(selection.primary(), Some(b));
        selection.clear();
        assert!(selection.is_empty());
    }

    #[test]
    fn test_retain_existing() {
        let mut graph = SceneGraph::new();
        let id = graph.add(SceneObject::rectangle(Rect::new(0.0, 0.0, 1.0, 1.0), Rgba::black()));
        let mut selection = Selection::new();
        selection.select_many([id, Uuid::new_v4()]);
        selection.retain_existing(&graph);
        assert_eq!(selection.ids(), &[id]);
    }

    #[test]
    fn test_summary_shared_values() {
        let mut graph = SceneGraph::new();
        let a = graph.add(SceneObject::sticky_note(StickyNote::new(Point::ZERO, StickyColor::Green, "a")));
        let b = graph.add(SceneObject::sticky_note(StickyNote::new(
            Point::new(300.0, 0.0),
            StickyColor::Green,
            "b",
        )));
        let mut selection = Selection::new();
        selection.select_many([a, b]);

        let summary = SelectionSummary::from_graph(&selection, &graph);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.kind, Some("sticky-note"));
        assert_eq!(summary.sticky_color, Some(StickyColor::Green));
        assert_eq!(summary.fill, Some(StickyColor::Green.fill()));
        assert!(summary.has_text());
        assert_eq!(summary.bounds, Some(Rect::new(0.0, 0.0, 500.0, 200.0)));
    }

    #[test]
    fn test_summary_mixed_kinds() {
        let mut graph = SceneGraph::new();
        let a = graph.add(SceneObject::rectangle(Rect::new(0.0, 0.0, 1.0, 1.0), Rgba::black()));
        let b = graph.add(SceneObject::circle(Point::ZERO, 5.0, Rgba::white()));
        let mut selection = Selection::new();
        selection.select_many([a, b]);
        let summary = SelectionSummary::from_graph(&selection, &graph);
        assert_eq!(summary.kind, None);
        assert_eq!(summary.fill, None);
        assert!(!summary.has_text());
        assert_eq!(SelectionSummary::from_graph(&Selection::new(), &graph), SelectionSummary::default());
    }
}
