//! Freehand brush strokes.

use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// How a stroke composites onto what is below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompositeMode {
    /// Normal painting.
    #[default]
    #[serde(rename = "source-over")]
    SourceOver,
    /// Erasing: the stroke removes underlying pixels.
    #[serde(rename = "destination-out")]
    DestinationOut,
}

impl CompositeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositeMode::SourceOver => "source-over",
            CompositeMode::DestinationOut => "destination-out",
        }
    }

    /// Unknown operation names fall back to normal painting.
    pub fn parse(name: &str) -> Self {
        match name {
            "destination-out" => CompositeMode::DestinationOut,
            _ => CompositeMode::SourceOver,
        }
    }
}

/// A polyline in world coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FreehandPath {
    pub points: Vec<Point>,
    pub composite: CompositeMode,
}

impl FreehandPath {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            composite: CompositeMode::SourceOver,
        }
    }

    pub fn with_composite(mut self, composite: CompositeMode) -> Self {
        self.composite = composite;
        self
    }

    pub fn push(&mut self, point: Point) {
        // Consecutive duplicates add nothing to the stroke.
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_eraser(&self) -> bool {
        self.composite == CompositeMode::DestinationOut
    }

    pub fn bounds(&self) -> Rect {
        let mut iter = self.points.iter();
        let Some(first) = iter.next() else {
            return Rect::ZERO;
        };
        iter.fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p))
    }

    pub fn translate(&mut self, delta: Vec2) {
        for point in &mut self.points {
            *point += delta;
        }
    }

    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut iter = self.points.iter();
        if let Some(first) = iter.next() {
            path.move_to(*first);
            for point in iter {
                path.line_to(*point);
            }
        }
        path
    }

    /// Drop points that deviate less than `tolerance` from the stroke.
    pub fn simplify(&mut self, tolerance: f64) {
        if self.points.len() >= 3 {
            self.points = rdp_simplify(&self.points, tolerance);
        }
    }
}

/// Ramer-Douglas-Peucker line simplification.
fn rdp_simplify(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let last = points[points.len() - 1];

    let (max_index, max_dist) = points[1..points.len() - 1]
        .iter()
        .enumerate()
        .map(|(i, p)| (i + 1, perpendicular_distance(*p, first, last)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

    if max_dist > tolerance {
        let mut left = rdp_simplify(&points[..=max_index], tolerance);
        let right = rdp_simplify(&points[max_index..], tolerance);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

fn perpendicular_distance(point: Point, start: Point, end: Point) -> f64 {
    let line = end - start;
    let len = line.hypot();
    if len < f64::EPSILON {
        return point.distance(start);
    }
    (point - start).cross(line).abs() / len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_skips_duplicates() {
        let mut path = FreehandPath::default();
        path.push(Point::new(1.0, 1.0));
        path.push(Point::new(1.0, 1.0));
        path.push(Point::new(2.0, 1.0));
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_bounds() {
        let path = FreehandPath::new(vec![
            Point::new(10.0, 20.0),
            Point::new(50.0, 5.0),
            Point::new(30.0, 40.0),
        ]);
        assert_eq!(path.bounds(), Rect::new(10.0, 5.0, 50.0, 40.0));
        assert_eq!(FreehandPath::default().bounds(), Rect::ZERO);
    }

    #[test]
    fn test_simplify_collinear() {
        let mut path = FreehandPath::new((0..10).map(|i| Point::new(i as f64, 0.0)).collect());
        path.simplify(0.5);
        assert_eq!(path.points, vec![Point::new(0.0, 0.0), Point::new(9.0, 0.0)]);
    }

    #[test]
    fn test_simplify_keeps_corner() {
        let mut path = FreehandPath::new(vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ]);
        path.simplify(0.5);
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_composite_names() {
        assert_eq!(CompositeMode::parse("destination-out"), CompositeMode::DestinationOut);
        assert_eq!(CompositeMode::parse("multiply"), CompositeMode::SourceOver);
        assert_eq!(CompositeMode::DestinationOut.as_str(), "destination-out");
    }
}
