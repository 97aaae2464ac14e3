//! Editor settings.

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::shapes::DEFAULT_FONT_SIZE;
use crate::snap::SnapConfig;
use crate::storage::DEFAULT_SAVE_DEBOUNCE_MS;
use crate::thumbnail::{DEFAULT_THUMBNAIL_MAX_SIDE, DEFAULT_THUMBNAIL_SCALE};
use crate::tools::Brush;
use serde::{Deserialize, Serialize};

/// Offset applied to each successive paste of the same clipboard contents.
pub const DEFAULT_PASTE_OFFSET: f64 = 20.0;

/// Every field has a default, so partial JSON files are valid configs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub snap: SnapConfig,
    pub history_limit: usize,
    pub autosave_debounce_ms: u64,
    pub thumbnail_scale: f64,
    pub thumbnail_max_side: u32,
    pub paste_offset: f64,
    pub brush: Brush,
    pub font_size: f64,
}

impl EditorConfig {
    /// Parse a config, clamping out-of-range values.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    pub fn normalized(mut self) -> Self {
        self.snap = self.snap.normalized();
        self.history_limit = self.history_limit.max(1);
        if !(self.thumbnail_scale.is_finite() && self.thumbnail_scale > 0.0) {
            self.thumbnail_scale = DEFAULT_THUMBNAIL_SCALE;
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            self.font_size = DEFAULT_FONT_SIZE;
        }
        self
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap: SnapConfig::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            autosave_debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
            thumbnail_scale: DEFAULT_THUMBNAIL_SCALE,
            thumbnail_max_side: DEFAULT_THUMBNAIL_MAX_SIDE,
            paste_offset: DEFAULT_PASTE_OFFSET,
            brush: Brush::default(),
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snap::MIN_GRID_SIZE;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EditorConfig::from_json(r#"{ "historyLimit": 10 }"#).unwrap();
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.autosave_debounce_ms, 2000);
        assert_eq!(config.snap, SnapConfig::default());
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let config = EditorConfig::from_json(
            r#"{ "historyLimit": 0, "thumbnailScale": -1.0, "snap": { "gridSize": 1.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.history_limit, 1);
        assert_eq!(config.thumbnail_scale, DEFAULT_THUMBNAIL_SCALE);
        assert_eq!(config.snap.grid_size, MIN_GRID_SIZE);
    }

    #[test]
    fn test_invalid_json() {
        assert!(EditorConfig::from_json("not json").is_err());
    }
}
