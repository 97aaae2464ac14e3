//! The scene graph: every object on the canvas, in z-order.

use crate::shapes::{ObjectId, ObjectKind, SceneObject};
use kurbo::{Point, Rect};

/// A change recorded by a mutating graph operation, drained by the editor's
/// commit step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneChange {
    Added(ObjectId),
    Removed(ObjectId),
    Modified(ObjectId),
    /// The whole graph was swapped (load, undo, redo).
    Replaced,
}

/// Ordered collection of scene objects. Index 0 is the back-most object.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    objects: Vec<SceneObject>,
    changes: Vec<SceneChange>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph holding `objects` with no pending changes.
    pub fn from_objects(objects: Vec<SceneObject>) -> Self {
        Self {
            objects,
            changes: Vec::new(),
        }
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.iter().map(SceneObject::id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id() == id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    /// Mutable access. Records the object as modified.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        let index = self.index_of(id)?;
        self.changes.push(SceneChange::Modified(id));
        self.objects.get_mut(index)
    }

    /// Apply `f` to an object. Returns false when the id is unknown.
    pub fn modify(&mut self, id: ObjectId, f: impl FnOnce(&mut SceneObject)) -> bool {
        match self.get_mut(id) {
            Some(object) => {
                f(object);
                true
            }
            None => false,
        }
    }

    /// Add an object on top of everything else.
    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id();
        self.objects.push(object);
        self.changes.push(SceneChange::Added(id));
        id
    }

    /// Insert at a z-index, clamped to the current length.
    pub fn insert_at(&mut self, index: usize, object: SceneObject) -> ObjectId {
        let id = object.id();
        let index = index.min(self.objects.len());
        self.objects.insert(index, object);
        self.changes.push(SceneChange::Added(id));
        id
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.index_of(id)?;
        self.changes.push(SceneChange::Removed(id));
        Some(self.objects.remove(index))
    }

    /// Swap in a whole new set of objects. Used by load, undo and redo.
    pub fn replace_all(&mut self, objects: Vec<SceneObject>) {
        self.objects = objects;
        self.changes.push(SceneChange::Replaced);
    }

    pub fn clear(&mut self) {
        if !self.objects.is_empty() {
            self.replace_all(Vec::new());
        }
    }

    /// Move an object to the top of the z-order.
    pub fn bring_to_front(&mut self, id: ObjectId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if index + 1 == self.objects.len() {
            return false;
        }
        let object = self.objects.remove(index);
        self.objects.push(object);
        self.changes.push(SceneChange::Modified(id));
        true
    }

    /// Move an object to the bottom of the z-order.
    pub fn send_to_back(&mut self, id: ObjectId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if index == 0 {
            return false;
        }
        let object = self.objects.remove(index);
        self.objects.insert(0, object);
        self.changes.push(SceneChange::Modified(id));
        true
    }

    /// Move an object one layer towards the front.
    pub fn bring_forward(&mut self, id: ObjectId) -> bool {
        match self.index_of(id) {
            Some(index) if index + 1 < self.objects.len() => {
                self.objects.swap(index, index + 1);
                self.changes.push(SceneChange::Modified(id));
                true
            }
            _ => false,
        }
    }

    /// Move an object one layer towards the back.
    pub fn send_backward(&mut self, id: ObjectId) -> bool {
        match self.index_of(id) {
            Some(index) if index > 0 => {
                self.objects.swap(index, index - 1);
                self.changes.push(SceneChange::Modified(id));
                true
            }
            _ => false,
        }
    }

    /// Bounding box of all objects.
    pub fn bounds(&self) -> Option<Rect> {
        self.objects
            .iter()
            .map(SceneObject::bounds)
            .reduce(|acc, b| acc.union(b))
    }

    /// Bounds of every object except `excluded`, in z-order. Snap targets.
    pub fn bounds_except(&self, excluded: &[ObjectId]) -> Vec<Rect> {
        self.objects
            .iter()
            .filter(|o| !excluded.contains(&o.id()))
            .map(SceneObject::bounds)
            .collect()
    }

    /// Evented objects under a point, front to back.
    pub fn objects_at_point(&self, point: Point, tolerance: f64) -> Vec<ObjectId> {
        self.objects
            .iter()
            .rev()
            .filter(|o| o.flags.evented && o.hit_test(point, tolerance))
            .map(SceneObject::id)
            .collect()
    }

    /// Selectable objects intersecting a rectangle, in z-order.
    pub fn objects_in_rect(&self, rect: Rect) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|o| o.flags.selectable && o.intersects_rect(rect))
            .map(SceneObject::id)
            .collect()
    }

    /// Set selectable/evented on every object. Interaction state only, so
    /// no change is recorded.
    pub fn set_interactivity(&mut self, selectable: bool, evented: bool) {
        for object in &mut self.objects {
            object.set_interactivity(selectable, evented);
        }
    }

    /// Combine objects into a generic group placed at the front-most member's
    /// z-index. Needs at least two known ids.
    pub fn group(&mut self, ids: &[ObjectId]) -> Option<ObjectId> {
        let mut indices: Vec<usize> = ids.iter().filter_map(|id| self.index_of(*id)).collect();
        indices.sort_unstable();
        indices.dedup();
        if indices.len() < 2 {
            return None;
        }

        let front = indices[indices.len() - 1];
        let insert_at = front + 1 - indices.len();
        let mut children = Vec::with_capacity(indices.len());
        for index in indices.into_iter().rev() {
            let child = self.objects.remove(index);
            self.changes.push(SceneChange::Removed(child.id()));
            children.push(child);
        }
        children.reverse();

        Some(self.insert_at(insert_at, SceneObject::group(children)))
    }

    /// Dissolve a generic group, putting its children back at its z-index.
    pub fn ungroup(&mut self, id: ObjectId) -> Option<Vec<ObjectId>> {
        let index = self.index_of(id)?;
        if !matches!(self.objects[index].kind, ObjectKind::Group { .. }) {
            return None;
        }
        let group = self.remove(id)?;
        let ObjectKind::Group { children } = group.kind else {
            return None;
        };
        let mut ids = Vec::with_capacity(children.len());
        for (offset, child) in children.into_iter().enumerate() {
            ids.push(self.insert_at(index + offset, child));
        }
        Some(ids)
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Drain the changes recorded since the last call.
    pub fn take_changes(&mut self) -> Vec<SceneChange> {
        std::mem::take(&mut self.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Rgba;

    fn rect_at(x: f64, y: f64) -> SceneObject {
        SceneObject::rectangle(Rect::new(x, y, x + 100.0, y + 100.0), Rgba::black())
    }

    #[test]
    fn test_add_and_remove() {
        let mut graph = SceneGraph::new();
        let id = graph.add(rect_at(0.0, 0.0));
        assert_eq!(graph.len(), 1);
        assert!(graph.remove(id).is_some());
        assert!(graph.is_empty());
        assert_eq!(
            graph.take_changes(),
            vec![SceneChange::Added(id), SceneChange::Removed(id)]
        );
        assert!(!graph.has_pending_changes());
    }

    #[test]
    fn test_z_order() {
        let mut graph = SceneGraph::new();
        let a = graph.add(rect_at(0.0, 0.0));
        let b = graph.add(rect_at(0.0, 0.0));
        let c = graph.add(rect_at(0.0, 0.0));

        assert!(graph.send_to_back(c));
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec![c, a, b]);
        assert!(graph.bring_to_front(c));
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec![a, b, c]);
        assert!(!graph.bring_to_front(c));
        assert!(graph.send_backward(c));
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec![a, c, b]);
        assert!(graph.bring_forward(a));
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec![c, a, b]);
    }

    #[test]
    fn test_objects_at_point_front_to_back() {
        let mut graph = SceneGraph::new();
        let back = graph.add(rect_at(0.0, 0.0));
        let front = graph.add(rect_at(50.0, 50.0));
        assert_eq!(graph.objects_at_point(Point::new(75.0, 75.0), 0.0), vec![front, back]);
        assert_eq!(graph.objects_at_point(Point::new(10.0, 10.0), 0.0), vec![back]);
        assert!(graph.objects_at_point(Point::new(500.0, 500.0), 0.0).is_empty());
    }

    #[test]
    fn test_interactivity_is_not_a_change() {
        let mut graph = SceneGraph::new();
        graph.add(rect_at(0.0, 0.0));
        graph.take_changes();
        graph.set_interactivity(false, false);
        assert!(!graph.has_pending_changes());
        assert!(graph.objects_at_point(Point::new(10.0, 10.0), 0.0).is_empty());
        assert!(graph.objects_in_rect(Rect::new(0.0, 0.0, 500.0, 500.0)).is_empty());
    }

    #[test]
    fn test_bounds_except() {
        let mut graph = SceneGraph::new();
        let a = graph.add(rect_at(0.0, 0.0));
        graph.add(rect_at(200.0, 0.0));
        let others = graph.bounds_except(&[a]);
        assert_eq!(others, vec![Rect::new(200.0, 0.0, 300.0, 100.0)]);
        assert_eq!(graph.bounds(), Some(Rect::new(0.0, 0.0, 300.0, 100.0)));
    }

    #[test]
    fn test_group_and_ungroup() {
        let mut graph = SceneGraph::new();
        let a = graph.add(rect_at(0.0, 0.0));
        let b = graph.add(rect_at(200.0, 0.0));
        let c = graph.add(rect_at(400.0, 0.0));

        let group = graph.group(&[a, b]).unwrap();
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec![group, c]);
        assert_eq!(graph.get(group).unwrap().bounds(), Rect::new(0.0, 0.0, 300.0, 100.0));

        let children = graph.ungroup(group).unwrap();
        assert_eq!(children, vec![a, b]);
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec![a, b, c]);
        assert!(graph.ungroup(c).is_none());
        assert!(graph.group(&[c]).is_none());
    }

    #[test]
    fn test_modify_records_change() {
        let mut graph = SceneGraph::new();
        let id = graph.add(rect_at(0.0, 0.0));
        graph.take_changes();
        assert!(graph.modify(id, |o| o.set_fill(Some(Rgba::white()))));
        assert_eq!(graph.take_changes(), vec![SceneChange::Modified(id)]);
        assert!(!graph.modify(uuid::Uuid::new_v4(), |_| {}));
    }
}
