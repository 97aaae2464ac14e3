//! Text box content and metrics.

use serde::{Deserialize, Serialize};

pub const DEFAULT_FONT_SIZE: f64 = 24.0;
pub const DEFAULT_FONT_FAMILY: &str = "Inter";

/// Horizontal alignment of text lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Content and typography of an editable text object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMeta {
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    pub alignment: TextAlign,
}

impl TextMeta {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            alignment: TextAlign::default(),
        }
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    pub fn with_alignment(mut self, alignment: TextAlign) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn line_count(&self) -> usize {
        let lines = self.text.lines().count().max(1);
        if self.text.ends_with('\n') { lines + 1 } else { lines }
    }

    /// Approximate (width, height) of the laid out text.
    ///
    /// Widths are estimated from character count; an empty box still reserves
    /// room for a caret.
    pub fn measure(&self) -> (f64, f64) {
        let widest = self
            .text
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        let width = (widest as f64 * self.font_size * 0.55).max(self.font_size);
        let height = self.line_count() as f64 * self.font_size * 1.2;
        (width, height)
    }
}

impl Default for TextMeta {
    fn default() -> Self {
        Self::new("")
    }
}
