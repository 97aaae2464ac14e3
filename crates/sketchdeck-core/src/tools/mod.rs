//! Tools and the per-gesture state they carry between pointer events.

use crate::shapes::{CompositeMode, FreehandPath, ObjectId, Rgba, StickyColor};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shapes smaller than this (in world units) on either axis are discarded.
pub const MIN_SHAPE_SIZE: f64 = 1.0;

/// Generate a well-mixed seed from a global counter.
/// Works on every target, including WASM, without a time source.
pub(crate) fn generate_tool_seed() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};

    static SEED_COUNTER: AtomicU32 = AtomicU32::new(1);

    let counter = SEED_COUNTER.fetch_add(1, Ordering::Relaxed);

    // splitmix32-style finalizer
    let mut x = counter.wrapping_mul(0x9E3779B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EBCA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2AE35);
    x ^= x >> 16;
    x
}

/// Available tools. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    #[default]
    Select,
    Pan,
    Draw,
    Rectangle,
    Circle,
    Text,
    StickyNote,
}

impl ToolKind {
    pub const ALL: [ToolKind; 7] = [
        ToolKind::Select,
        ToolKind::Pan,
        ToolKind::Draw,
        ToolKind::Rectangle,
        ToolKind::Circle,
        ToolKind::Text,
        ToolKind::StickyNote,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Select => "select",
            ToolKind::Pan => "pan",
            ToolKind::Draw => "draw",
            ToolKind::Rectangle => "rectangle",
            ToolKind::Circle => "circle",
            ToolKind::Text => "text",
            ToolKind::StickyNote => "sticky-note",
        }
    }

    /// `(selectable, evented)` for every object while this tool is active.
    pub fn object_interactivity(&self) -> (bool, bool) {
        match self {
            ToolKind::Draw => (false, false),
            ToolKind::Pan => (false, true),
            ToolKind::Select
            | ToolKind::Rectangle
            | ToolKind::Circle
            | ToolKind::Text
            | ToolKind::StickyNote => (true, true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushMode {
    #[default]
    Draw,
    Erase,
}

/// Freehand brush settings, applied at the start of every stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Brush {
    pub width: f64,
    pub color: Rgba,
    pub mode: BrushMode,
}

impl Brush {
    /// Color the stroke is painted with. Erasing paints transparent.
    pub fn stroke_color(&self) -> Rgba {
        match self.mode {
            BrushMode::Draw => self.color,
            BrushMode::Erase => Rgba::transparent(),
        }
    }

    pub fn composite(&self) -> CompositeMode {
        match self.mode {
            BrushMode::Draw => CompositeMode::SourceOver,
            BrushMode::Erase => CompositeMode::DestinationOut,
        }
    }
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            width: 4.0,
            color: Rgba::black(),
            mode: BrushMode::Draw,
        }
    }
}

/// Chooses a color for a sticky note when none was picked explicitly.
pub type StickyColorChooser = Box<dyn FnMut() -> StickyColor>;
/// Looks up the natural pixel size of an image source.
pub type ImageSizeProbe = Box<dyn Fn(&str) -> Option<(f64, f64)>>;

/// Injected factories used when tools create objects.
pub struct ToolFactories {
    pub sticky_color: StickyColorChooser,
    pub image_size: ImageSizeProbe,
}

impl ToolFactories {
    /// Always pick the same sticky color. Handy for deterministic callers.
    pub fn fixed_sticky_color(color: StickyColor) -> Self {
        Self {
            sticky_color: Box::new(move || color),
            ..Self::default()
        }
    }
}

impl Default for ToolFactories {
    fn default() -> Self {
        Self {
            sticky_color: Box::new(|| StickyColor::from_seed(generate_tool_seed())),
            image_size: Box::new(|_| None),
        }
    }
}

impl fmt::Debug for ToolFactories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolFactories").finish_non_exhaustive()
    }
}

/// What the current pointer gesture is doing.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    /// Marquee selection from an empty spot.
    RubberBand { start: Point, current: Point },
    /// Moving the selection. `origins` are the pre-drag positions.
    Drag {
        primary: ObjectId,
        start: Point,
        origins: Vec<(ObjectId, Point)>,
        moved: bool,
    },
    /// Viewport pan, tracked in screen coordinates.
    Pan { last: Point },
    /// Sizing a freshly inserted rectangle or circle.
    Shape { id: ObjectId, anchor: Point },
    /// Collecting a freehand stroke.
    Stroke { path: FreehandPath },
    /// Two-finger pan, tracked in screen coordinates.
    TouchPan { last_center: Point },
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }
}

/// Marquee rectangle being dragged out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRect {
    pub start: Point,
    pub current: Point,
}

impl SelectionRect {
    pub fn to_rect(&self) -> Rect {
        Rect::from_points(self.start, self.current)
    }
}

/// Rectangle spanned by a drag, normalized to its min corner.
pub fn rect_from_drag(anchor: Point, pointer: Point) -> Rect {
    Rect::from_points(anchor, pointer)
}

/// Circle spanned by a drag: `(top_left, radius)`. The diameter is the drag
/// distance and the bounding box starts at the anchor.
pub fn circle_from_drag(anchor: Point, pointer: Point) -> (Point, f64) {
    (anchor, anchor.distance(pointer) / 2.0)
}

pub fn is_degenerate(size: Vec2) -> bool {
    size.x.abs() < MIN_SHAPE_SIZE || size.y.abs() < MIN_SHAPE_SIZE
}

/// Holds the active tool and the settings tools create objects with.
#[derive(Debug)]
pub struct ToolManager {
    current: ToolKind,
    pub gesture: Gesture,
    pub brush: Brush,
    /// Explicit sticky color; `None` defers to the injected chooser.
    pub sticky_color: Option<StickyColor>,
    /// Fill for new rectangles and circles.
    pub shape_fill: Rgba,
    /// Color for new text boxes.
    pub text_color: Rgba,
    pub font_size: f64,
    pub factories: ToolFactories,
}

impl ToolManager {
    pub fn new(factories: ToolFactories) -> Self {
        Self {
            current: ToolKind::default(),
            gesture: Gesture::Idle,
            brush: Brush::default(),
            sticky_color: None,
            shape_fill: Rgba::rgb(0x93, 0xc5, 0xfd),
            text_color: Rgba::rgb(0x11, 0x18, 0x27),
            font_size: crate::shapes::DEFAULT_FONT_SIZE,
            factories,
        }
    }

    pub fn current(&self) -> ToolKind {
        self.current
    }

    /// Switch tools, dropping any in-flight gesture. Returns the gesture that
    /// was interrupted so the caller can clean up after it.
    pub fn set_tool(&mut self, tool: ToolKind) -> Gesture {
        self.current = tool;
        std::mem::take(&mut self.gesture)
    }

    /// Color for the next sticky note.
    pub fn next_sticky_color(&mut self) -> StickyColor {
        match self.sticky_color {
            Some(color) => color,
            None => (self.factories.sticky_color)(),
        }
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new(ToolFactories::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tool() {
        let tools = ToolManager::default();
        assert_eq!(tools.current(), ToolKind::Select);
        assert!(tools.gesture.is_idle());
    }

    #[test]
    fn test_set_tool_drops_gesture() {
        let mut tools = ToolManager::default();
        tools.gesture = Gesture::Pan { last: Point::ZERO };
        let interrupted = tools.set_tool(ToolKind::Draw);
        assert_eq!(interrupted, Gesture::Pan { last: Point::ZERO });
        assert!(tools.gesture.is_idle());
        assert_eq!(tools.current(), ToolKind::Draw);
    }

    #[test]
    fn test_interactivity_per_tool() {
        assert_eq!(ToolKind::Draw.object_interactivity(), (false, false));
        assert_eq!(ToolKind::Pan.object_interactivity(), (false, true));
        assert_eq!(ToolKind::Select.object_interactivity(), (true, true));
        assert_eq!(ToolKind::StickyNote.object_interactivity(), (true, true));
    }

    #[test]
    fn test_eraser_brush() {
        let brush = Brush {
            mode: BrushMode::Erase,
            ..Brush::default()
        };
        assert!(brush.stroke_color().is_transparent());
        assert_eq!(brush.composite(), CompositeMode::DestinationOut);
        assert_eq!(Brush::default().composite(), CompositeMode::SourceOver);
    }

    #[test]
    fn test_sticky_color_choice() {
        let mut tools = ToolManager::new(ToolFactories::fixed_sticky_color(StickyColor::Orange));
        assert_eq!(tools.next_sticky_color(), StickyColor::Orange);
        tools.sticky_color = Some(StickyColor::Pink);
        assert_eq!(tools.next_sticky_color(), StickyColor::Pink);
    }

    #[test]
    fn test_default_chooser_stays_in_palette() {
        let mut tools = ToolManager::default();
        for _ in 0..20 {
            assert!(StickyColor::ALL.contains(&tools.next_sticky_color()));
        }
    }

    #[test]
    fn test_drag_geometry() {
        let rect = rect_from_drag(Point::new(110.0, 60.0), Point::new(10.0, 10.0));
        assert_eq!(rect, Rect::new(10.0, 10.0, 110.0, 60.0));

        let (origin, radius) = circle_from_drag(Point::new(0.0, 0.0), Point::new(30.0, 40.0));
        assert_eq!(origin, Point::ZERO);
        assert_eq!(radius, 25.0);

        assert!(is_degenerate(Vec2::new(0.5, 10.0)));
        assert!(!is_degenerate(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_selection_rect() {
        let marquee = SelectionRect {
            start: Point::new(50.0, 50.0),
            current: Point::new(0.0, 100.0),
        };
        assert_eq!(marquee.to_rect(), Rect::new(0.0, 50.0, 50.0, 100.0));
    }
}
