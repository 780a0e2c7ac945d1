//! Contract for the low-level recognition primitives.
//!
//! Template matching, word detection, region growing and template loading
//! are supplied by an external engine. The extractors only depend on this
//! trait, so tests substitute a scripted implementation.

use image::RgbaImage;
use thiserror::Error;

use crate::geometry::{Point, Rect};

/// A single word reported by the word detector, with its bounding box in
/// source-image pixel coordinates. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedWord {
    pub text: String,
    pub rect: Rect,
}

impl DetectedWord {
    pub fn new(text: impl Into<String>, rect: Rect) -> Self {
        Self {
            text: text.into(),
            rect,
        }
    }
}

/// Result of a template-matching pass. Lower score = better fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateMatch {
    pub rect: Rect,
    pub score: f32,
}

/// Layout hint for the word detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectMode {
    /// Multi-line block of text.
    #[default]
    Block,
    /// Single line, e.g. a label strip or a price band.
    SingleLine,
}

/// Errors surfaced by the recognition primitives.
///
/// `MissingAsset` is distinguished so callers can report "unsupported
/// resolution or wrong focus" to the user instead of treating it as a bug.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("recognition asset not found: {path}")]
    MissingAsset { path: String },
    #[error("word detection failed: {0}")]
    Detection(String),
    #[error("recognition engine error: {0}")]
    Engine(String),
}

pub type VisionResult<T> = Result<T, VisionError>;

/// The fixed-contract recognition primitives consumed by the extractors.
pub trait Vision {
    /// Finds the best placement of `template` inside `image`.
    /// Lower score = better match.
    fn match_template(&self, image: &RgbaImage, template: &RgbaImage) -> TemplateMatch;

    /// Detects words and their bounding boxes. May legitimately return an
    /// empty list; may fail on corrupt input, which callers degrade to
    /// "no words this frame".
    fn detect_words(&self, image: &RgbaImage, mode: DetectMode) -> VisionResult<Vec<DetectedWord>>;

    /// Flood-fills from `seed` over color-similar pixels and returns the
    /// bounding box of the grown region.
    fn grow_region(&self, image: &RgbaImage, seed: Point, tolerance: u8) -> Rect;

    /// Loads a recognition template from disk. Fails with
    /// [`VisionError::MissingAsset`] when no asset exists for the requested
    /// path (typically an unsupported resolution).
    fn load_template(&self, path: &str) -> VisionResult<RgbaImage>;
}

/// Joins detected words into a single string, space separated.
pub fn join_words(words: &[DetectedWord]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
