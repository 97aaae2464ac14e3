//! Snapshot-based undo/redo.

use crate::record::{decode_scene_strict, encode_scene};
use crate::shapes::SceneObject;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use thiserror::Error;

/// Maximum number of undo snapshots kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("snapshot is malformed: {0}")]
    MalformedSnapshot(#[source] serde_json::Error),
}

/// Serialized scene state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(String);

impl Snapshot {
    pub fn capture(objects: &[SceneObject]) -> Result<Self, HistoryError> {
        encode_scene(objects).map(Self).map_err(HistoryError::Serialize)
    }

    pub fn restore(&self) -> Result<Vec<SceneObject>, HistoryError> {
        decode_scene_strict(&self.0).map_err(HistoryError::MalformedSnapshot)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn from_raw(json: impl Into<String>) -> Self {
        Self(json.into())
    }
}

/// Undo and redo stacks. The top of the undo stack is the current state, so
/// undo needs at least two entries.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: Vec<Snapshot>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Record the current state. Clears redo and evicts the oldest entries
    /// beyond the limit.
    pub fn push_snapshot(&mut self, objects: &[SceneObject]) -> Result<(), HistoryError> {
        let snapshot = Snapshot::capture(objects)?;
        self.push(snapshot);
        Ok(())
    }

    fn push(&mut self, snapshot: Snapshot) {
        self.undo_stack.push_back(snapshot);
        self.redo_stack.clear();
        while self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
    }

    /// Step back. Returns the objects to restore, or `None` if there is
    /// nothing to undo. On error both stacks are left untouched.
    pub fn undo(&mut self) -> Result<Option<Vec<SceneObject>>, HistoryError> {
        let len = self.undo_stack.len();
        if len < 2 {
            log::info!("Nothing to undo");
            return Ok(None);
        }
        let restored = self.undo_stack[len - 2].restore()?;
        if let Some(top) = self.undo_stack.pop_back() {
            self.redo_stack.push(top);
        }
        log::debug!("Undo: {} snapshots left", self.undo_stack.len());
        Ok(Some(restored))
    }

    /// Step forward. Returns the objects to restore, or `None` if there is
    /// nothing to redo. On error both stacks are left untouched.
    pub fn redo(&mut self) -> Result<Option<Vec<SceneObject>>, HistoryError> {
        let Some(top) = self.redo_stack.last() else {
            log::info!("Nothing to redo");
            return Ok(None);
        };
        let restored = top.restore()?;
        if let Some(top) = self.redo_stack.pop() {
            self.undo_stack.push_back(top);
        }
        log::debug!("Redo: {} snapshots left to redo", self.redo_stack.len());
        Ok(Some(restored))
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() >= 2
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.undo_stack.back()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Start over with `objects` as the only state.
    pub fn reset(&mut self, objects: &[SceneObject]) -> Result<(), HistoryError> {
        self.clear();
        self.push_snapshot(objects)
    }

    #[cfg(test)]
    pub(crate) fn push_raw(&mut self, snapshot: Snapshot) {
        self.push(snapshot);
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

/// Decides whether graph changes become history entries.
///
/// Restoring a snapshot rewrites the graph, and those rewrites must not be
/// recorded again. Holding a [`SuppressGuard`] turns recording off until the
/// guard drops, including on early return.
#[derive(Debug, Clone, Default)]
pub struct RecordGate {
    depth: Rc<Cell<usize>>,
}

impl RecordGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suppress(&self) -> SuppressGuard {
        self.depth.set(self.depth.get() + 1);
        SuppressGuard {
            depth: Rc::clone(&self.depth),
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.depth.get() > 0
    }
}

/// Scoped suppression handed out by [`RecordGate::suppress`].
#[derive(Debug)]
#[must_use = "recording resumes as soon as the guard is dropped"]
pub struct SuppressGuard {
    depth: Rc<Cell<usize>>,
}

impl Drop for SuppressGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Rgba;
    use kurbo::Rect;

    fn scene(n: usize) -> Vec<SceneObject> {
        (0..n)
            .map(|i| {
                let x = i as f64 * 10.0;
                SceneObject::rectangle(Rect::new(x, 0.0, x + 5.0, 5.0), Rgba::black())
            })
            .collect()
    }

    #[test]
    fn test_undo_redo_inverse() {
        let mut history = History::default();
        let s0 = scene(0);
        let s1 = scene(1);
        let s2 = scene(2);
        history.push_snapshot(&s0).unwrap();
        history.push_snapshot(&s1).unwrap();
        history.push_snapshot(&s2).unwrap();

        assert_eq!(history.undo().unwrap(), Some(s1.clone()));
        assert_eq!(history.undo().unwrap(), Some(s0.clone()));
        assert_eq!(history.undo().unwrap(), None);

        assert_eq!(history.redo().unwrap(), Some(s1));
        assert_eq!(history.redo().unwrap(), Some(s2.clone()));
        assert_eq!(history.redo().unwrap(), None);
        assert_eq!(history.current(), Some(&Snapshot::capture(&s2).unwrap()));
    }

    #[test]
    fn test_push_invalidates_redo() {
        let mut history = History::default();
        history.push_snapshot(&scene(0)).unwrap();
        history.push_snapshot(&scene(1)).unwrap();
        history.undo().unwrap();
        assert!(history.can_redo());

        history.push_snapshot(&scene(3)).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.redo().unwrap(), None);
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let mut history = History::default();
        for i in 0..60 {
            history.push_snapshot(&scene(i)).unwrap();
        }
        assert_eq!(history.len(), DEFAULT_HISTORY_LIMIT);

        let mut undos = 0;
        while history.undo().unwrap().is_some() {
            undos += 1;
        }
        assert_eq!(undos, DEFAULT_HISTORY_LIMIT - 1);
        // The oldest ten were evicted.
        assert_eq!(history.current(), Some(&Snapshot::capture(&scene(10)).unwrap()));
    }

    #[test]
    fn test_undo_needs_two_snapshots() {
        let mut history = History::default();
        assert!(!history.can_undo());
        history.push_snapshot(&scene(1)).unwrap();
        assert!(!history.can_undo());
        assert_eq!(history.undo().unwrap(), None);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_malformed_snapshot_leaves_stacks() {
        let mut history = History::default();
        history.push_raw(Snapshot::from_raw("{broken"));
        history.push_snapshot(&scene(1)).unwrap();

        let err = history.undo().unwrap_err();
        assert!(matches!(err, HistoryError::MalformedSnapshot(_)));
        assert_eq!(history.len(), 2);
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn test_reset() {
        let mut history = History::default();
        history.push_snapshot(&scene(1)).unwrap();
        history.push_snapshot(&scene(2)).unwrap();
        history.undo().unwrap();
        history.reset(&scene(0)).unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_record_gate_nesting() {
        let gate = RecordGate::new();
        assert!(!gate.is_suppressed());
        {
            let _outer = gate.suppress();
            {
                let _inner = gate.suppress();
                assert!(gate.is_suppressed());
            }
            assert!(gate.is_suppressed());
        }
        assert!(!gate.is_suppressed());
    }

    #[test]
    fn test_record_gate_released_on_early_return() {
        fn fails(gate: &RecordGate) -> Result<(), &'static str> {
            let _guard = gate.suppress();
            Err("boom")
        }
        let gate = RecordGate::new();
        assert!(fails(&gate).is_err());
        assert!(!gate.is_suppressed());
    }
}
