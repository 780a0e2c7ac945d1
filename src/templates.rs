//! Per-resolution recognition templates.
//!
//! Template bitmaps are shipped per supported resolution. The cache is an
//! owned object injected into each extractor that needs it; nothing here
//! is process-global.

use std::collections::HashMap;

use image::RgbaImage;

use crate::vision::Vision;

/// Population anchor icon in the top bar.
pub const ANCHOR_ICON: &str = "population_icon";
/// Red cap mark shown on offers whose purchasable quantity is exhausted.
pub const CAP_MARK_ICON: &str = "offer_cap_mark";

/// Resolution label derived from the screenshot dimensions, e.g. "1920x1080".
pub fn resolution_label(width: u32, height: u32) -> String {
    format!("{width}x{height}")
}

fn asset_path(resolution: &str, name: &str) -> String {
    format!("assets/{resolution}/{name}.png")
}

/// Resolution-keyed cache for recognition templates.
///
/// Persists across frames and rebinds only when the observed resolution
/// label changes. A failed load is not cached, so the next lookup retries
/// instead of pinning the failure.
#[derive(Default)]
pub struct TemplateCache {
    resolution: Option<String>,
    images: HashMap<String, RgbaImage>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The template `name` for `resolution`, (re)loaded on a label change.
    /// `None` means the asset is missing for this resolution — a
    /// user-actionable condition (wrong focus or unsupported resolution)
    /// that callers report through their sentinel results.
    pub fn get<V: Vision>(
        &mut self,
        vision: &V,
        resolution: &str,
        name: &str,
    ) -> Option<&RgbaImage> {
        if self.resolution.as_deref() != Some(resolution) {
            tracing::debug!("detected resolution: {resolution}");
            self.images.clear();
            self.resolution = Some(resolution.to_string());
        }
        if !self.images.contains_key(name) {
            match vision.load_template(&asset_path(resolution, name)) {
                Ok(template) => {
                    self.images.insert(name.to_string(), template);
                }
                Err(err) => {
                    tracing::warn!(
                        "failed to load template {name}: {err}. \
                         Make sure the game is focused and runs at a supported resolution"
                    );
                    return None;
                }
            }
        }
        self.images.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};
    use crate::vision::{DetectMode, DetectedWord, TemplateMatch, VisionError, VisionResult};
    use std::cell::Cell;

    struct FakeVision {
        known_resolution: &'static str,
        loads: Cell<u32>,
    }

    impl Vision for FakeVision {
        fn match_template(&self, _: &RgbaImage, _: &RgbaImage) -> TemplateMatch {
            TemplateMatch {
                rect: Rect::NOT_FOUND,
                score: f32::MAX,
            }
        }

        fn detect_words(&self, _: &RgbaImage, _: DetectMode) -> VisionResult<Vec<DetectedWord>> {
            Ok(Vec::new())
        }

        fn grow_region(&self, _: &RgbaImage, _: Point, _: u8) -> Rect {
            Rect::NOT_FOUND
        }

        fn load_template(&self, path: &str) -> VisionResult<RgbaImage> {
            self.loads.set(self.loads.get() + 1);
            if path.contains(self.known_resolution) {
                Ok(RgbaImage::new(8, 8))
            } else {
                Err(VisionError::MissingAsset { path: path.into() })
            }
        }
    }

    #[test]
    fn test_loads_once_per_resolution() {
        let vision = FakeVision {
            known_resolution: "1920x1080",
            loads: Cell::new(0),
        };
        let mut cache = TemplateCache::new();

        assert!(cache.get(&vision, "1920x1080", ANCHOR_ICON).is_some());
        assert!(cache.get(&vision, "1920x1080", ANCHOR_ICON).is_some());
        assert_eq!(vision.loads.get(), 1);

        // A second template is its own load, then cached as well.
        assert!(cache.get(&vision, "1920x1080", CAP_MARK_ICON).is_some());
        assert!(cache.get(&vision, "1920x1080", CAP_MARK_ICON).is_some());
        assert_eq!(vision.loads.get(), 2);
    }

    #[test]
    fn test_rebinds_on_resolution_change() {
        let vision = FakeVision {
            known_resolution: "x",
            loads: Cell::new(0),
        };
        let mut cache = TemplateCache::new();

        assert!(cache.get(&vision, "1920x1080", ANCHOR_ICON).is_some());
        assert!(cache.get(&vision, "2560x1440", ANCHOR_ICON).is_some());
        assert!(cache.get(&vision, "2560x1440", ANCHOR_ICON).is_some());
        assert_eq!(vision.loads.get(), 2);
    }

    #[test]
    fn test_missing_asset_retries_next_lookup() {
        let vision = FakeVision {
            known_resolution: "1920x1080",
            loads: Cell::new(0),
        };
        let mut cache = TemplateCache::new();

        assert!(cache.get(&vision, "3840x2160", ANCHOR_ICON).is_none());
        assert!(cache.get(&vision, "3840x2160", ANCHOR_ICON).is_none());
        // Each lookup retried the load instead of caching the failure.
        assert_eq!(vision.loads.get(), 2);

        assert!(cache.get(&vision, "1920x1080", ANCHOR_ICON).is_some());
    }

    #[test]
    fn test_resolution_label() {
        assert_eq!(resolution_label(1920, 1080), "1920x1080");
    }
}
