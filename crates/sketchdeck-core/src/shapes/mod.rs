//! Scene objects placed on the canvas.

mod freehand;
mod image;
mod sticky;
mod text;

pub use freehand::{CompositeMode, FreehandPath};
pub use image::{fit_within, ImageSource};
pub use sticky::{StickyColor, StickyNote, STICKY_SIZE};
pub use text::{TextAlign, TextMeta, DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE};

use kurbo::{Affine, Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for scene objects.
pub type ObjectId = Uuid;

/// RGBA8 color. Serializes as `#rrggbb`, or `#rrggbbaa` when not opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`. `transparent` is accepted too.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("transparent") {
            return Some(Self::transparent());
        }
        let hex = s.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
                Some(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => Some(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Some(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for Rgba {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<Rgba> for String {
    fn from(color: Rgba) -> Self {
        color.to_string()
    }
}

impl From<Color> for Rgba {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<Rgba> for Color {
    fn from(color: Rgba) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Drop shadow parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shadow {
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub color: Rgba,
}

/// Placement of an object. `position` is the unrotated top-left corner and
/// `rotation` is in degrees around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Geometry {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            position,
            width,
            height,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.origin(), rect.width(), rect.height())
    }

    pub fn transform(&self) -> Affine {
        Affine::translate(self.position.to_vec2())
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }

    /// Axis-aligned bounding box in world coordinates.
    pub fn bounds(&self) -> Rect {
        let local = Rect::new(0.0, 0.0, self.width, self.height);
        if self.rotation == 0.0 {
            let scaled = Rect::new(0.0, 0.0, self.width * self.scale_x, self.height * self.scale_y);
            return scaled.abs() + self.position.to_vec2();
        }
        self.transform().transform_rect_bbox(local)
    }

    pub fn scaled_width(&self) -> f64 {
        self.width * self.scale_x
    }

    pub fn scaled_height(&self) -> f64 {
        self.height * self.scale_y
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(Point::ZERO, 0.0, 0.0)
    }
}

/// Visual style of an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectStyle {
    pub fill: Option<Rgba>,
    pub stroke: Option<Rgba>,
    pub stroke_width: f64,
    pub shadow: Option<Shadow>,
}

impl ObjectStyle {
    pub fn filled(fill: Rgba) -> Self {
        Self {
            fill: Some(fill),
            ..Self::default()
        }
    }

    pub fn stroked(stroke: Rgba, width: f64) -> Self {
        Self {
            fill: None,
            stroke: Some(stroke),
            stroke_width: width,
            shadow: None,
        }
    }

    /// Fill as a peniko color.
    pub fn fill_color(&self) -> Option<Color> {
        self.fill.map(Into::into)
    }

    /// Stroke as a peniko color.
    pub fn stroke_color(&self) -> Option<Color> {
        self.stroke.map(Into::into)
    }
}

impl Default for ObjectStyle {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_width: 1.0,
            shadow: None,
        }
    }
}

/// Interaction and lock flags. Only the lock flags are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditableFlags {
    pub selectable: bool,
    pub evented: bool,
    pub lock_scaling: bool,
    pub lock_rotation: bool,
}

impl Default for EditableFlags {
    fn default() -> Self {
        Self {
            selectable: true,
            evented: true,
            lock_scaling: false,
            lock_rotation: false,
        }
    }
}

/// Kind-specific payload of a scene object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Image(ImageSource),
    Rectangle,
    Circle { radius: f64 },
    FreehandPath(FreehandPath),
    TextBox(TextMeta),
    StickyNote(StickyNote),
    Group { children: Vec<SceneObject> },
}

impl ObjectKind {
    /// Short name used in logs and selection summaries.
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::Image(_) => "image",
            ObjectKind::Rectangle => "rectangle",
            ObjectKind::Circle { .. } => "circle",
            ObjectKind::FreehandPath(_) => "path",
            ObjectKind::TextBox(_) => "text",
            ObjectKind::StickyNote(_) => "sticky-note",
            ObjectKind::Group { .. } => "group",
        }
    }
}

/// A node in the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub(crate) id: ObjectId,
    pub name: Option<String>,
    pub kind: ObjectKind,
    pub geometry: Geometry,
    pub style: ObjectStyle,
    pub flags: EditableFlags,
}

impl SceneObject {
    pub fn new(kind: ObjectKind, geometry: Geometry) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            kind,
            geometry,
            style: ObjectStyle::default(),
            flags: EditableFlags::default(),
        }
    }

    pub fn rectangle(rect: Rect, fill: Rgba) -> Self {
        Self::new(ObjectKind::Rectangle, Geometry::from_rect(rect)).with_style(ObjectStyle::filled(fill))
    }

    /// A circle whose bounding box starts at `position`.
    pub fn circle(position: Point, radius: f64, fill: Rgba) -> Self {
        let radius = radius.abs();
        Self::new(
            ObjectKind::Circle { radius },
            Geometry::new(position, radius * 2.0, radius * 2.0),
        )
        .with_style(ObjectStyle::filled(fill))
    }

    pub fn image(position: Point, width: f64, height: f64, src: impl Into<String>) -> Self {
        Self::new(
            ObjectKind::Image(ImageSource::new(src)),
            Geometry::new(position, width, height),
        )
    }

    pub fn text_box(position: Point, meta: TextMeta, color: Rgba) -> Self {
        let (width, height) = meta.measure();
        Self::new(ObjectKind::TextBox(meta), Geometry::new(position, width, height))
            .with_style(ObjectStyle::filled(color))
    }

    pub fn freehand(path: FreehandPath, stroke: Rgba, width: f64) -> Self {
        let geometry = Geometry::from_rect(path.bounds());
        Self::new(ObjectKind::FreehandPath(path), geometry).with_style(ObjectStyle::stroked(stroke, width))
    }

    pub fn sticky_note(note: StickyNote) -> Self {
        let geometry = Geometry::from_rect(note.bounds());
        Self::new(ObjectKind::StickyNote(note), geometry)
    }

    pub fn group(children: Vec<SceneObject>) -> Self {
        let geometry = Geometry::from_rect(union_bounds(&children));
        Self::new(ObjectKind::Group { children }, geometry)
    }

    pub(crate) fn with_id(mut self, id: ObjectId) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_style(mut self, style: ObjectStyle) -> Self {
        self.style = style;
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn position(&self) -> Point {
        self.geometry.position
    }

    /// World-space bounding box.
    pub fn bounds(&self) -> Rect {
        match &self.kind {
            ObjectKind::StickyNote(note) => note.bounds(),
            ObjectKind::Group { children } if !children.is_empty() => union_bounds(children),
            _ => self.geometry.bounds(),
        }
    }

    pub fn children(&self) -> &[SceneObject] {
        match &self.kind {
            ObjectKind::StickyNote(note) => note.children(),
            ObjectKind::Group { children } => children,
            _ => &[],
        }
    }

    pub fn is_text_like(&self) -> bool {
        matches!(self.kind, ObjectKind::TextBox(_) | ObjectKind::StickyNote(_))
    }

    /// Check if a world-space point hits this object.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match &self.kind {
            ObjectKind::Circle { radius } => {
                let r = radius * self.geometry.scale_x.abs().max(self.geometry.scale_y.abs());
                let center = self.bounds().center();
                center.distance(point) <= r + tolerance
            }
            ObjectKind::FreehandPath(path) => {
                let reach = tolerance + self.style.stroke_width / 2.0;
                if path.points.len() == 1 {
                    return path.points[0].distance(point) <= reach;
                }
                point_to_polyline_dist(point, &path.points) <= reach
            }
            ObjectKind::Group { children } => children.iter().any(|c| c.hit_test(point, tolerance)),
            _ => self.bounds().inflate(tolerance, tolerance).contains(point),
        }
    }

    pub fn intersects_rect(&self, rect: Rect) -> bool {
        let bounds = self.bounds();
        rect.intersect(bounds.inflate(1.0, 1.0)).area() > 0.0
    }

    /// Move the object and everything it owns by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        self.geometry.position += delta;
        match &mut self.kind {
            ObjectKind::FreehandPath(path) => path.translate(delta),
            ObjectKind::StickyNote(note) => {
                for child in note.children_mut() {
                    child.translate(delta);
                }
            }
            ObjectKind::Group { children } => {
                for child in children {
                    child.translate(delta);
                }
            }
            ObjectKind::Image(_)
            | ObjectKind::Rectangle
            | ObjectKind::Circle { .. }
            | ObjectKind::TextBox(_) => {}
        }
    }

    pub fn set_position(&mut self, position: Point) {
        let delta = position - self.geometry.position;
        self.translate(delta);
    }

    /// Set the fill. Sticky notes recolor their background child.
    pub fn set_fill(&mut self, fill: Option<Rgba>) {
        match &mut self.kind {
            ObjectKind::StickyNote(note) => note.set_background_fill(fill),
            ObjectKind::Group { children } => {
                for child in children {
                    child.set_fill(fill);
                }
            }
            _ => self.style.fill = fill,
        }
    }

    pub fn set_stroke(&mut self, stroke: Option<Rgba>) {
        match &mut self.kind {
            ObjectKind::Group { children } => {
                for child in children {
                    child.set_stroke(stroke);
                }
            }
            _ => self.style.stroke = stroke,
        }
    }

    /// Text metadata, for text boxes and the text child of sticky notes.
    pub fn text_meta(&self) -> Option<&TextMeta> {
        match &self.kind {
            ObjectKind::TextBox(meta) => Some(meta),
            ObjectKind::StickyNote(note) => note.text_meta(),
            _ => None,
        }
    }

    pub fn text_meta_mut(&mut self) -> Option<&mut TextMeta> {
        match &mut self.kind {
            ObjectKind::TextBox(meta) => Some(meta),
            ObjectKind::StickyNote(note) => note.text_meta_mut(),
            _ => None,
        }
    }

    /// Assign fresh ids to this object and all of its descendants.
    pub fn regenerate_ids(&mut self) {
        self.id = Uuid::new_v4();
        match &mut self.kind {
            ObjectKind::StickyNote(note) => {
                for child in note.children_mut() {
                    child.regenerate_ids();
                }
            }
            ObjectKind::Group { children } => {
                for child in children {
                    child.regenerate_ids();
                }
            }
            _ => {}
        }
    }

    /// Recompute geometry derived from owned content (paths, groups, text).
    pub fn refresh_geometry(&mut self) {
        let derived = match &self.kind {
            ObjectKind::FreehandPath(path) if !path.points.is_empty() => Some(path.bounds()),
            ObjectKind::StickyNote(note) => Some(note.bounds()),
            ObjectKind::Group { children } if !children.is_empty() => Some(union_bounds(children)),
            _ => None,
        };
        if let Some(rect) = derived {
            self.geometry.position = rect.origin();
            self.geometry.width = rect.width();
            self.geometry.height = rect.height();
            self.geometry.scale_x = 1.0;
            self.geometry.scale_y = 1.0;
        }
    }

    pub(crate) fn set_interactivity(&mut self, selectable: bool, evented: bool) {
        self.flags.selectable = selectable;
        self.flags.evented = evented;
    }
}

/// Union of the bounds of a list of objects, or `Rect::ZERO` when empty.
pub fn union_bounds(objects: &[SceneObject]) -> Rect {
    let mut iter = objects.iter();
    let Some(first) = iter.next() else {
        return Rect::ZERO;
    };
    iter.fold(first.bounds(), |acc, obj| acc.union(obj.bounds()))
}

/// Distance from a point to a line segment (a to b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    point.distance(a + seg * t)
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}
