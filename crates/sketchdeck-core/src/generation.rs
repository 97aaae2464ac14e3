//! Results handed back by the image generation services.
//!
//! The services themselves live outside this crate. The editor only receives
//! a finished result (or an error) and inserts it as an image object.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Side length used when a result reports no size and none can be probed.
pub const FALLBACK_IMAGE_SIZE: f64 = 512.0;
/// Generated images are scaled down to fit this box on insertion.
pub const MAX_INSERTED_IMAGE_SIZE: f64 = 800.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    #[default]
    Variation,
    Restyle,
    Fusion,
}

impl GenerationKind {
    pub fn label(&self) -> &'static str {
        match self {
            GenerationKind::Variation => "Image variation",
            GenerationKind::Restyle => "Restyle",
            GenerationKind::Fusion => "Image fusion",
        }
    }
}

/// A finished generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    #[serde(default)]
    pub kind: GenerationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl GeneratedImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: GenerationKind::default(),
            width: None,
            height: None,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_kind(mut self, kind: GenerationKind) -> Self {
        self.kind = kind;
        self
    }

    /// Reported size, if both sides are positive.
    pub fn size(&self) -> Option<(f64, f64)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Some((w, h)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("{} request failed: {}", .0.label(), .1)]
    Request(GenerationKind, String),
    #[error("{} returned no image", .0.label())]
    EmptyResult(GenerationKind),
}
