//! Snapping of dragged objects to the grid and to other objects.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GRID_SIZE: f64 = 5.0;
pub const MIN_GRID_SIZE: f64 = 5.0;
pub const MAX_GRID_SIZE: f64 = 100.0;
/// Distance (world units) under which edges and centers snap together.
pub const DEFAULT_SNAP_DISTANCE: f64 = 10.0;

/// Which snapping sources are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapMode {
    None,
    Grid,
    Objects,
    #[default]
    All,
}

impl SnapMode {
    /// Cycle to the next snap mode.
    pub fn next(self) -> Self {
        match self {
            SnapMode::None => SnapMode::Grid,
            SnapMode::Grid => SnapMode::Objects,
            SnapMode::Objects => SnapMode::All,
            SnapMode::All => SnapMode::None,
        }
    }

    pub fn snaps_to_grid(self) -> bool {
        matches!(self, SnapMode::Grid | SnapMode::All)
    }

    pub fn snaps_to_objects(self) -> bool {
        matches!(self, SnapMode::Objects | SnapMode::All)
    }
}

/// How a match is chosen when several reference lines are in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapStrategy {
    /// First match in fixed priority order, scanning objects back to front.
    #[default]
    FirstInPriority,
    /// Smallest distance over every candidate; ties keep priority order.
    Closest,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapConfig {
    pub grid_enabled: bool,
    pub grid_size: f64,
    pub object_snap_enabled: bool,
    pub snap_distance: f64,
    pub strategy: SnapStrategy,
}

impl SnapConfig {
    pub fn new(grid_enabled: bool, grid_size: f64, object_snap_enabled: bool) -> Self {
        Self {
            grid_enabled,
            grid_size: clamp_grid_size(grid_size),
            object_snap_enabled,
            ..Self::default()
        }
    }

    pub fn set_grid_size(&mut self, size: f64) {
        self.grid_size = clamp_grid_size(size);
    }

    /// Clamp fields that may have come from an unvalidated source.
    pub fn normalized(mut self) -> Self {
        self.grid_size = clamp_grid_size(self.grid_size);
        if !self.snap_distance.is_finite() || self.snap_distance < 0.0 {
            self.snap_distance = DEFAULT_SNAP_DISTANCE;
        }
        self
    }

    pub fn mode(&self) -> SnapMode {
        match (self.grid_enabled, self.object_snap_enabled) {
            (false, false) => SnapMode::None,
            (true, false) => SnapMode::Grid,
            (false, true) => SnapMode::Objects,
            (true, true) => SnapMode::All,
        }
    }

    pub fn set_mode(&mut self, mode: SnapMode) {
        self.grid_enabled = mode.snaps_to_grid();
        self.object_snap_enabled = mode.snaps_to_objects();
    }

    pub fn cycle_mode(&mut self) {
        self.set_mode(self.mode().next());
    }
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            grid_enabled: true,
            grid_size: DEFAULT_GRID_SIZE,
            object_snap_enabled: true,
            snap_distance: DEFAULT_SNAP_DISTANCE,
            strategy: SnapStrategy::default(),
        }
    }
}

fn clamp_grid_size(size: f64) -> f64 {
    if size.is_finite() {
        size.clamp(MIN_GRID_SIZE, MAX_GRID_SIZE)
    } else {
        DEFAULT_GRID_SIZE
    }
}

/// Round a value to the nearest multiple of `size`.
pub fn snap_to_grid(value: f64, size: f64) -> f64 {
    if size <= 0.0 {
        return value;
    }
    (value / size).round() * size
}

/// Snap both coordinates of a point to the grid.
pub fn snap_point_to_grid(point: Point, size: f64) -> Point {
    Point::new(snap_to_grid(point.x, size), snap_to_grid(point.y, size))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideOrientation {
    /// A vertical line at an x coordinate.
    Vertical,
    /// A horizontal line at a y coordinate.
    Horizontal,
}

/// An alignment line shown while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapGuide {
    pub orientation: GuideOrientation,
    pub coordinate: f64,
}

impl SnapGuide {
    pub fn vertical(x: f64) -> Self {
        Self {
            orientation: GuideOrientation::Vertical,
            coordinate: x,
        }
    }

    pub fn horizontal(y: f64) -> Self {
        Self {
            orientation: GuideOrientation::Horizontal,
            coordinate: y,
        }
    }
}

/// Result of [`snap_position`].
#[derive(Debug, Clone, PartialEq)]
pub struct SnapOutcome {
    pub position: Point,
    pub guides: Vec<SnapGuide>,
    pub snapped_x: bool,
    pub snapped_y: bool,
}

impl SnapOutcome {
    pub fn none(position: Point) -> Self {
        Self {
            position,
            guides: Vec::new(),
            snapped_x: false,
            snapped_y: false,
        }
    }

    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }
}

/// A reference line along one axis: left/top, center, right/bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Start,
    End,
    Center,
}

/// (moving edge, target edge) pairs in the order they are tried.
const PRIORITY: [(Edge, Edge); 9] = [
    (Edge::Start, Edge::Start),
    (Edge::Start, Edge::End),
    (Edge::Start, Edge::Center),
    (Edge::End, Edge::Start),
    (Edge::End, Edge::End),
    (Edge::End, Edge::Center),
    (Edge::Center, Edge::Start),
    (Edge::Center, Edge::End),
    (Edge::Center, Edge::Center),
];

#[derive(Debug, Clone, Copy)]
struct Span {
    start: f64,
    end: f64,
}

impl Span {
    fn at(&self, edge: Edge) -> f64 {
        match edge {
            Edge::Start => self.start,
            Edge::End => self.end,
            Edge::Center => (self.start + self.end) / 2.0,
        }
    }
}

/// A successful axis snap: shift to apply and where the guide goes.
#[derive(Debug, Clone, Copy)]
struct AxisSnap {
    shift: f64,
    guide: f64,
}

fn snap_axis(moving: Span, others: &[Span], distance: f64, strategy: SnapStrategy) -> Option<AxisSnap> {
    let mut best: Option<(f64, AxisSnap)> = None;
    for other in others {
        for (moving_edge, target_edge) in PRIORITY {
            let from = moving.at(moving_edge);
            let to = other.at(target_edge);
            let gap = (to - from).abs();
            if gap >= distance {
                continue;
            }
            let found = AxisSnap {
                shift: to - from,
                guide: to,
            };
            match strategy {
                SnapStrategy::FirstInPriority => return Some(found),
                SnapStrategy::Closest => {
                    if best.is_none_or(|(best_gap, _)| gap < best_gap) {
                        best = Some((gap, found));
                    }
                }
            }
        }
    }
    best.map(|(_, found)| found)
}

/// Snap a dragged object.
///
/// `moving` is the object's bounding box when placed at `candidate`, the
/// proposed top-left position. `others` are the bounds of every other object
/// in z-order. Object snapping runs first, per axis; grid snapping is then
/// applied to the adjusted position.
pub fn snap_position(moving: Rect, candidate: Point, others: &[Rect], config: &SnapConfig) -> SnapOutcome {
    let mut outcome = SnapOutcome::none(candidate);

    if config.object_snap_enabled && !others.is_empty() {
        let xs: Vec<Span> = others.iter().map(|r| Span { start: r.x0, end: r.x1 }).collect();
        let ys: Vec<Span> = others.iter().map(|r| Span { start: r.y0, end: r.y1 }).collect();
        let moving_x = Span { start: moving.x0, end: moving.x1 };
        let moving_y = Span { start: moving.y0, end: moving.y1 };

        let mut shift = Vec2::ZERO;
        if let Some(snap) = snap_axis(moving_x, &xs, config.snap_distance, config.strategy) {
            shift.x = snap.shift;
            outcome.snapped_x = true;
            outcome.guides.push(SnapGuide::vertical(snap.guide));
        }
        if let Some(snap) = snap_axis(moving_y, &ys, config.snap_distance, config.strategy) {
            shift.y = snap.shift;
            outcome.snapped_y = true;
            outcome.guides.push(SnapGuide::horizontal(snap.guide));
        }
        outcome.position += shift;
    }

    if config.grid_enabled {
        outcome.position = snap_point_to_grid(outcome.position, config.grid_size);
    }

    outcome
}
