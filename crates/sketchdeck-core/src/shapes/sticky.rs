//! Sticky notes: a colored background with a text child.

use super::{Geometry, ObjectKind, ObjectStyle, Rgba, SceneObject, Shadow, TextMeta};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

pub const STICKY_SIZE: f64 = 200.0;
pub const STICKY_PADDING: f64 = 16.0;
pub const STICKY_FONT_SIZE: f64 = 20.0;
const STICKY_TEXT_COLOR: Rgba = Rgba::rgb(0x1f, 0x29, 0x37);

/// The fixed sticky-note palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickyColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Orange,
    Pink,
    Purple,
}

impl StickyColor {
    pub const ALL: [StickyColor; 6] = [
        StickyColor::Yellow,
        StickyColor::Green,
        StickyColor::Blue,
        StickyColor::Orange,
        StickyColor::Pink,
        StickyColor::Purple,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StickyColor::Yellow => "yellow",
            StickyColor::Green => "green",
            StickyColor::Blue => "blue",
            StickyColor::Orange => "orange",
            StickyColor::Pink => "pink",
            StickyColor::Purple => "purple",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Background fill for this palette entry.
    pub fn fill(&self) -> Rgba {
        match self {
            StickyColor::Yellow => Rgba::rgb(0xfe, 0xf0, 0x8a),
            StickyColor::Green => Rgba::rgb(0xbb, 0xf7, 0xd0),
            StickyColor::Blue => Rgba::rgb(0xbf, 0xdb, 0xfe),
            StickyColor::Orange => Rgba::rgb(0xfe, 0xd7, 0xaa),
            StickyColor::Pink => Rgba::rgb(0xfb, 0xcf, 0xe8),
            StickyColor::Purple => Rgba::rgb(0xe9, 0xd5, 0xff),
        }
    }

    /// Palette entry whose fill matches exactly.
    pub fn from_fill(fill: Rgba) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.fill() == fill)
    }

    /// Palette entry picked from an arbitrary seed.
    pub fn from_seed(seed: u32) -> Self {
        Self::ALL[seed as usize % Self::ALL.len()]
    }
}

/// A grouped note. Always owns exactly one background rectangle and one text
/// box; both are located by kind, never by position in `children`.
#[derive(Debug, Clone, PartialEq)]
pub struct StickyNote {
    pub color: StickyColor,
    children: Vec<SceneObject>,
}

impl StickyNote {
    /// A new note with its top-left corner at `position`.
    pub fn new(position: Point, color: StickyColor, text: impl Into<String>) -> Self {
        let background = SceneObject::new(
            ObjectKind::Rectangle,
            Geometry::new(position, STICKY_SIZE, STICKY_SIZE),
        )
        .with_style(ObjectStyle {
            fill: Some(color.fill()),
            stroke: None,
            stroke_width: 0.0,
            shadow: Some(Shadow {
                blur: 8.0,
                offset_x: 0.0,
                offset_y: 2.0,
                color: Rgba::new(0, 0, 0, 0x26),
            }),
        });

        let meta = TextMeta::new(text).with_font_size(STICKY_FONT_SIZE);
        let inner = STICKY_SIZE - STICKY_PADDING * 2.0;
        let (_, height) = meta.measure();
        let text_position = Point::new(position.x + STICKY_PADDING, position.y + STICKY_PADDING);
        let text = SceneObject::new(ObjectKind::TextBox(meta), Geometry::new(text_position, inner, height))
            .with_style(ObjectStyle::filled(STICKY_TEXT_COLOR));

        Self {
            color,
            children: vec![background, text],
        }
    }

    /// Build a note from existing children. Returns `None` unless there is
    /// exactly one rectangle and one text box.
    pub fn from_children(children: Vec<SceneObject>, color: StickyColor) -> Option<Self> {
        if !Self::is_well_formed(&children) {
            return None;
        }
        Some(Self { color, children })
    }

    /// Structural check used when recognizing untagged groups.
    pub fn is_well_formed(children: &[SceneObject]) -> bool {
        let rects = children
            .iter()
            .filter(|c| matches!(c.kind, ObjectKind::Rectangle))
            .count();
        let texts = children
            .iter()
            .filter(|c| matches!(c.kind, ObjectKind::TextBox(_)))
            .count();
        children.len() == 2 && rects == 1 && texts == 1
    }

    pub fn children(&self) -> &[SceneObject] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [SceneObject] {
        &mut self.children
    }

    pub fn background(&self) -> Option<&SceneObject> {
        self.children.iter().find(|c| matches!(c.kind, ObjectKind::Rectangle))
    }

    pub fn background_mut(&mut self) -> Option<&mut SceneObject> {
        self.children
            .iter_mut()
            .find(|c| matches!(c.kind, ObjectKind::Rectangle))
    }

    pub fn text_object(&self) -> Option<&SceneObject> {
        self.children.iter().find(|c| matches!(c.kind, ObjectKind::TextBox(_)))
    }

    pub fn text_meta(&self) -> Option<&TextMeta> {
        self.children.iter().find_map(|c| match &c.kind {
            ObjectKind::TextBox(meta) => Some(meta),
            _ => None,
        })
    }

    pub fn text_meta_mut(&mut self) -> Option<&mut TextMeta> {
        self.children.iter_mut().find_map(|c| match &mut c.kind {
            ObjectKind::TextBox(meta) => Some(meta),
            _ => None,
        })
    }

    pub fn set_color(&mut self, color: StickyColor) {
        self.color = color;
        self.set_background_fill(Some(color.fill()));
    }

    pub(crate) fn set_background_fill(&mut self, fill: Option<Rgba>) {
        if let Some(background) = self.background_mut() {
            background.style.fill = fill;
        }
        if let Some(color) = fill.and_then(StickyColor::from_fill) {
            self.color = color;
        }
    }

    /// Resize the text child after its content or font changed. The width
    /// stays at the note's inner width; only the height follows the text.
    pub fn remeasure_text(&mut self) {
        let Some(text) = self
            .children
            .iter_mut()
            .find(|c| matches!(c.kind, ObjectKind::TextBox(_)))
        else {
            return;
        };
        if let ObjectKind::TextBox(meta) = &text.kind {
            let (_, height) = meta.measure();
            text.geometry.height = height;
        }
    }

    pub fn bounds(&self) -> Rect {
        self.background()
            .map(SceneObject::bounds)
            .unwrap_or_else(|| super::union_bounds(&self.children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_note_structure() {
        let note = StickyNote::new(Point::new(40.0, 60.0), StickyColor::Green, "todo");
        assert!(StickyNote::is_well_formed(note.children()));
        assert_eq!(note.background().unwrap().style.fill, Some(StickyColor::Green.fill()));
        assert_eq!(note.text_meta().unwrap().text, "todo");
        assert_eq!(note.bounds(), Rect::new(40.0, 60.0, 240.0, 260.0));
    }

    #[test]
    fn test_children_found_by_kind_not_index() {
        let note = StickyNote::new(Point::ZERO, StickyColor::Pink, "x");
        let mut children = note.children().to_vec();
        children.reverse();
        let mut note = StickyNote::from_children(children, StickyColor::Pink).unwrap();
        note.set_color(StickyColor::Purple);
        assert_eq!(note.background().unwrap().style.fill, Some(StickyColor::Purple.fill()));
        assert_eq!(note.text_meta().unwrap().text, "x");
    }

    #[test]
    fn test_remeasure_text_child() {
        let mut note = StickyNote::new(Point::ZERO, StickyColor::Yellow, "one");
        let single = note.text_object().unwrap().geometry.height;
        let width = note.text_object().unwrap().geometry.width;

        note.text_meta_mut().unwrap().text = "one\ntwo\nthree".to_string();
        note.remeasure_text();
        let text = note.text_object().unwrap();
        assert!((text.geometry.height - single * 3.0).abs() < 1e-9);
        assert_eq!(text.geometry.width, width);
        assert_eq!(note.bounds(), Rect::new(0.0, 0.0, STICKY_SIZE, STICKY_SIZE));
    }

    #[test]
    fn test_malformed_children_rejected() {
        let rect = SceneObject::rectangle(Rect::new(0.0, 0.0, 10.0, 10.0), Rgba::black());
        assert!(StickyNote::from_children(vec![rect.clone()], StickyColor::Yellow).is_none());
        assert!(StickyNote::from_children(vec![rect.clone(), rect], StickyColor::Yellow).is_none());
    }

    #[test]
    fn test_palette_lookup() {
        for color in StickyColor::ALL {
            assert_eq!(StickyColor::from_name(color.name()), Some(color));
            assert_eq!(StickyColor::from_fill(color.fill()), Some(color));
        }
        assert_eq!(StickyColor::from_name("teal"), None);
        assert_eq!(StickyColor::from_seed(7), StickyColor::Green);
    }
}
