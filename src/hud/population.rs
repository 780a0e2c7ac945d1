use std::collections::BTreeMap;

use image::{DynamicImage, RgbaImage};

use crate::correlate;
use crate::dictionary::DictionarySet;
use crate::geometry::{Rect, RelativeRect};
use crate::preprocess;
use crate::reconcile;
use crate::templates::{self, TemplateCache};
use crate::vision::{DetectMode, Vision, join_words};

/// Label served when the anchor icon sits in the aggregated-view position.
pub const ALL_LOCATIONS: &str = "All Islands";

/// Template-match scores below this count as a found anchor icon.
const ANCHOR_FIT_THRESHOLD: f32 = 20_000.0;

/// Anchor icons left of this fraction of the screenshot width belong to
/// the aggregated view, which has no single location name.
const AGGREGATED_VIEW_BOUNDARY: f32 = 0.3;

/// Minimap label strip, relative to the full screenshot.
const LOCATION_LABEL_REGION: RelativeRect = RelativeRect::new(0.0036, 0.6641, 0.115, 0.0245);

const LABEL_BINARIZE_THRESHOLD: u8 = 190;

/// Extracts per-category population counts and the selected location name
/// from the current frame.
///
/// All queries are recomputed per frame; `update` replaces the screenshot
/// and invalidates the frame caches (anchor-icon rect, location name). The
/// template cache is injected at construction and persists across frames.
pub struct PopulationExtractor<V: Vision> {
    vision: V,
    dictionaries: DictionarySet,
    templates: TemplateCache,
    language: String,
    screenshot: RgbaImage,
    anchor_icon: Option<Rect>,
    selected_location: Option<String>,
}

impl<V: Vision> PopulationExtractor<V> {
    pub fn new(vision: V, dictionaries: DictionarySet, templates: TemplateCache) -> Self {
        Self {
            vision,
            dictionaries,
            templates,
            language: String::from("english"),
            screenshot: RgbaImage::new(0, 0),
            anchor_icon: None,
            selected_location: None,
        }
    }

    /// Starts a new frame: replaces the screenshot, switches the active
    /// dictionary language and clears all frame caches.
    pub fn update(&mut self, language: &str, screenshot: RgbaImage) {
        self.language = language.to_string();
        self.screenshot = screenshot;
        self.anchor_icon = None;
        self.selected_location = None;
    }

    /// Locates the population anchor icon in the top half of the screenshot.
    ///
    /// The result is cached for the frame. Returns [`Rect::NOT_FOUND`] when
    /// the template for the observed resolution cannot be loaded or the
    /// best match fails the fit threshold; both mean the game is not
    /// focused or runs at an unsupported resolution, which the caller
    /// reports to the user instead of failing.
    pub fn find_anchor_icon(&mut self) -> Rect {
        if let Some(cached) = self.anchor_icon {
            return cached;
        }

        let (width, height) = self.screenshot.dimensions();
        let resolution = templates::resolution_label(width, height);

        let Some(template) =
            self.templates
                .get(&self.vision, &resolution, templates::ANCHOR_ICON)
        else {
            self.anchor_icon = Some(Rect::NOT_FOUND);
            return Rect::NOT_FOUND;
        };

        // The icon always sits in the top bar; matching the lower half
        // only risks false positives.
        let top_half = preprocess::crop_rect(
            &self.screenshot,
            &Rect::new(0, 0, width as i32, (height / 2) as i32),
        );
        let result = self.vision.match_template(&top_half, template);

        let rect = if result.score < ANCHOR_FIT_THRESHOLD {
            result.rect
        } else {
            tracing::debug!("anchor icon not found (score {})", result.score);
            Rect::NOT_FOUND
        };
        self.anchor_icon = Some(rect);
        rect
    }

    /// Per-category population counts for the current frame.
    ///
    /// Empty when the anchor icon is missing, the grown label region is
    /// empty, or no dictionary label correlates. Whenever at least one
    /// count was read, every remaining category id of the active
    /// dictionary is present with 0.
    pub fn population(&mut self) -> BTreeMap<u32, u32> {
        let anchor = self.find_anchor_icon();
        if anchor.is_empty() {
            return BTreeMap::new();
        }

        let region =
            self.vision
                .grow_region(&self.screenshot, anchor.bottom_right(), 0);
        if region.is_empty() {
            return BTreeMap::new();
        }

        let popup = preprocess::crop_rect(&self.screenshot, &region);
        let popup = preprocess::emphasize_text(&popup);

        let words = match self.vision.detect_words(&popup, DetectMode::Block) {
            Ok(words) => words,
            Err(err) => {
                tracing::warn!("word detection failed on population popup: {err}");
                Vec::new()
            }
        };

        let dictionary = self.dictionaries.get(&self.language);
        let labels = &dictionary.population_groups;
        let matches = correlate::correlate(&words, labels);

        let mut counts = BTreeMap::new();
        for m in &matches {
            let Some(candidate) = reconcile::find_value_candidate(&words, m.word) else {
                continue;
            };

            let number_crop = preprocess::crop_rect(&popup, &candidate.region);
            let from_string = reconcile::number_from_string(&candidate.digits);
            let from_region = reconcile::number_from_region(&self.vision, &number_crop);
            let count = reconcile::reconcile(from_string, from_region);

            if count == 0 {
                // Known miss for single-digit counts; the frame simply
                // carries no value for this category.
                tracing::debug!("no readable count for category {}", m.id);
                continue;
            }

            tracing::debug!("category {}: {count}", m.id);
            counts.insert(m.id, count);
        }

        if counts.is_empty() {
            return counts;
        }
        for &id in labels.keys() {
            counts.entry(id).or_insert(0);
        }
        counts
    }

    /// Name of the currently selected location, cached for the frame.
    ///
    /// Empty when the anchor icon is missing. When the icon sits left of
    /// 30 % of the screenshot width the view aggregates every location and
    /// the fixed [`ALL_LOCATIONS`] label is returned; otherwise the
    /// minimap label strip is read.
    pub fn selected_location(&mut self) -> String {
        if let Some(cached) = &self.selected_location {
            return cached.clone();
        }

        let anchor = self.find_anchor_icon();
        if anchor.is_empty() {
            return String::new();
        }

        let width = self.screenshot.width();
        if (anchor.x as f32) < AGGREGATED_VIEW_BOUNDARY * width as f32 {
            self.selected_location = Some(ALL_LOCATIONS.to_string());
            return ALL_LOCATIONS.to_string();
        }

        let strip = preprocess::crop_relative(&self.screenshot, &LOCATION_LABEL_REGION);
        let strip = preprocess::binarize(&strip, LABEL_BINARIZE_THRESHOLD, true);
        let strip = DynamicImage::ImageLuma8(strip).to_rgba8();

        let words = match self.vision.detect_words(&strip, DetectMode::SingleLine) {
            Ok(words) => words,
            Err(err) => {
                tracing::warn!("word detection failed on location label: {err}");
                Vec::new()
            }
        };

        let name = join_words(&words);
        if !name.is_empty() {
            self.selected_location = Some(name.clone());
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use crate::geometry::Point;
    use crate::vision::{DetectedWord, TemplateMatch, VisionError, VisionResult};
    use std::cell::Cell;
    use std::collections::HashMap;

    struct ScriptedVision {
        known_resolution: &'static str,
        anchor: TemplateMatch,
        grown_region: Rect,
        block_words: Vec<DetectedWord>,
        line_words: Vec<DetectedWord>,
        fail_detection: bool,
        template_loads: Cell<u32>,
    }

    impl Default for ScriptedVision {
        fn default() -> Self {
            Self {
                known_resolution: "320x200",
                anchor: TemplateMatch {
                    rect: Rect::new(150, 10, 20, 20),
                    score: 5_000.0,
                },
                grown_region: Rect::new(100, 40, 180, 100),
                block_words: Vec::new(),
                line_words: Vec::new(),
                fail_detection: false,
                template_loads: Cell::new(0),
            }
        }
    }

    impl Vision for ScriptedVision {
        fn match_template(&self, _: &RgbaImage, _: &RgbaImage) -> TemplateMatch {
            self.anchor
        }

        fn detect_words(&self, _: &RgbaImage, mode: DetectMode) -> VisionResult<Vec<DetectedWord>> {
            if self.fail_detection {
                return Err(VisionError::Detection("corrupt input".into()));
            }
            Ok(match mode {
                DetectMode::Block => self.block_words.clone(),
                DetectMode::SingleLine => self.line_words.clone(),
            })
        }

        fn grow_region(&self, _: &RgbaImage, _: Point, _: u8) -> Rect {
            self.grown_region
        }

        fn load_template(&self, path: &str) -> VisionResult<RgbaImage> {
            self.template_loads.set(self.template_loads.get() + 1);
            if path.contains(self.known_resolution) {
                Ok(RgbaImage::new(8, 8))
            } else {
                Err(VisionError::MissingAsset { path: path.into() })
            }
        }
    }

    fn dictionaries(entries: &[(u32, &str)]) -> DictionarySet {
        let dict = Dictionary {
            population_groups: entries.iter().map(|(id, s)| (*id, s.to_string())).collect(),
            ui_labels: BTreeMap::new(),
        };
        DictionarySet::new(HashMap::from([(String::from("english"), dict)]))
    }

    fn extractor(
        vision: ScriptedVision,
        entries: &[(u32, &str)],
    ) -> PopulationExtractor<ScriptedVision> {
        let mut e =
            PopulationExtractor::new(vision, dictionaries(entries), TemplateCache::new());
        e.update("english", RgbaImage::new(320, 200));
        e
    }

    fn word(text: &str, x: i32, y: i32, w: i32) -> DetectedWord {
        DetectedWord::new(text, Rect::new(x, y, w, 12))
    }

    #[test]
    fn test_population_end_to_end() {
        let vision = ScriptedVision {
            block_words: vec![word("Fisherman's", 10, 20, 60), word("1,234", 90, 21, 30)],
            line_words: vec![word("1234", 0, 0, 30)],
            ..Default::default()
        };
        let mut e = extractor(vision, &[(3, "Fishermen")]);

        let counts = e.population();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get(&3), Some(&1234));
    }

    #[test]
    fn test_population_pads_unmatched_categories_with_zero() {
        let vision = ScriptedVision {
            block_words: vec![word("Farmers", 10, 20, 60), word("850", 90, 21, 30)],
            line_words: vec![word("850", 0, 0, 30)],
            ..Default::default()
        };
        let mut e = extractor(vision, &[(1, "Farmers"), (2, "Workers"), (5, "Artisans")]);

        let counts = e.population();
        let keys: Vec<u32> = counts.keys().copied().collect();
        assert_eq!(keys, vec![1, 2, 5], "key set equals the full dictionary");
        assert_eq!(counts[&1], 850);
        assert_eq!(counts[&2], 0);
        assert_eq!(counts[&5], 0);
    }

    #[test]
    fn test_population_empty_when_no_words() {
        let vision = ScriptedVision::default();
        let mut e = extractor(vision, &[(1, "Farmers")]);
        assert!(e.population().is_empty());
    }

    #[test]
    fn test_population_empty_on_detector_failure() {
        let vision = ScriptedVision {
            fail_detection: true,
            ..Default::default()
        };
        let mut e = extractor(vision, &[(1, "Farmers")]);
        assert!(e.population().is_empty());
    }

    #[test]
    fn test_population_empty_when_region_does_not_grow() {
        let vision = ScriptedVision {
            grown_region: Rect::NOT_FOUND,
            block_words: vec![word("Farmers", 10, 20, 60), word("850", 90, 21, 30)],
            ..Default::default()
        };
        let mut e = extractor(vision, &[(1, "Farmers")]);
        assert!(e.population().is_empty());
    }

    #[test]
    fn test_anchor_sentinel_when_template_missing() {
        let vision = ScriptedVision {
            known_resolution: "1920x1080",
            ..Default::default()
        };
        let mut e = extractor(vision, &[(1, "Farmers")]);

        assert_eq!(e.find_anchor_icon(), Rect::NOT_FOUND);
        assert_eq!(e.find_anchor_icon(), Rect::NOT_FOUND);
        // Cached for the frame: the load was attempted once, not per call.
        assert_eq!(e.vision.template_loads.get(), 1);
        assert!(e.population().is_empty());
        assert_eq!(e.selected_location(), "");

        // Next frame retries and keeps degrading.
        e.update("english", RgbaImage::new(320, 200));
        assert_eq!(e.find_anchor_icon(), Rect::NOT_FOUND);
        assert_eq!(e.vision.template_loads.get(), 2);
    }

    #[test]
    fn test_anchor_sentinel_when_fit_fails() {
        let vision = ScriptedVision {
            anchor: TemplateMatch {
                rect: Rect::new(150, 10, 20, 20),
                score: 60_000.0,
            },
            ..Default::default()
        };
        let mut e = extractor(vision, &[(1, "Farmers")]);
        assert_eq!(e.find_anchor_icon(), Rect::NOT_FOUND);
    }

    #[test]
    fn test_selected_location_aggregated_view() {
        // Anchor left of 30% of the 320 px screenshot width.
        let vision = ScriptedVision {
            anchor: TemplateMatch {
                rect: Rect::new(50, 10, 20, 20),
                score: 5_000.0,
            },
            ..Default::default()
        };
        let mut e = extractor(vision, &[(1, "Farmers")]);
        assert_eq!(e.selected_location(), ALL_LOCATIONS);
    }

    #[test]
    fn test_selected_location_reads_minimap_label() {
        let vision = ScriptedVision {
            line_words: vec![word("Crown", 0, 0, 30), word("Falls", 35, 0, 30)],
            ..Default::default()
        };
        let mut e = extractor(vision, &[(1, "Farmers")]);
        assert_eq!(e.selected_location(), "Crown Falls");
        // Served from the frame cache on repeat queries.
        assert_eq!(e.selected_location(), "Crown Falls");
    }
}
