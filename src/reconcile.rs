//! Numeric reconciliation over two noisy channels.
//!
//! A count next to a matched label is observed twice: as the digit
//! characters of the detected words, and as a re-detection of the unified
//! pixel region those words cover. The word splitter tends to drop digits;
//! the region pass tends to hallucinate them. The reconciliation rule keeps
//! the string reading unless the region reading has strictly more digits.

use image::RgbaImage;

use crate::geometry::Rect;
use crate::vision::{DetectMode, DetectedWord, Vision};

/// Two word boxes sit on the same text baseline when the sums of their
/// top and bottom edge coordinates differ by less than this many pixels.
const BASELINE_TOLERANCE: i32 = 8;

/// Digit string and unified pixel region for one value read.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCandidate {
    pub digits: String,
    pub region: Rect,
}

/// Collects the value words belonging to `label`: words on the same
/// baseline, starting strictly right of the label's left edge, excluding
/// the label itself and any ratio marker containing `"0/"`.
///
/// Digit characters are concatenated in word order; bounding boxes are
/// unioned and expanded by one pixel to compensate for tight detector
/// boxes. Returns `None` when no value word is found.
pub fn find_value_candidate(
    words: &[DetectedWord],
    label: &DetectedWord,
) -> Option<ValueCandidate> {
    let label_edges = label.rect.y + label.rect.bottom_right().y;

    let mut digits = String::new();
    let mut region = Rect::NOT_FOUND;

    for word in words {
        if word == label {
            continue;
        }
        let edges = word.rect.y + word.rect.bottom_right().y;
        if (edges - label_edges).abs() < BASELINE_TOLERANCE
            && word.rect.x > label.rect.x
            && !word.text.contains("0/")
        {
            digits.extend(word.text.chars().filter(|c| c.is_ascii_digit()));
            region = region.union(&word.rect);
        }
    }

    if region.is_empty() {
        return None;
    }

    Some(ValueCandidate {
        digits,
        region: region.expanded(1),
    })
}

/// Parses a digit string into a count. Empty or unparseable input is 0,
/// the "value not determined" sentinel.
pub fn number_from_string(digits: &str) -> u32 {
    let digits: String = digits.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<u32>().unwrap_or(0)
}

/// Re-detects a cropped pixel region as a single number.
///
/// Runs single-line word detection over the crop and parses the digit
/// characters. Detector failures degrade to 0.
pub fn number_from_region<V: Vision>(vision: &V, region: &RgbaImage) -> u32 {
    let words = match vision.detect_words(region, DetectMode::SingleLine) {
        Ok(words) => words,
        Err(err) => {
            tracing::warn!("word detection failed on number region: {err}");
            return 0;
        }
    };
    let digits: String = words
        .iter()
        .flat_map(|w| w.text.chars())
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().unwrap_or(0)
}

fn magnitude(n: u32) -> Option<u32> {
    if n == 0 { None } else { Some(n.ilog10()) }
}

/// Resolves one count from the two channel readings.
///
/// The string reading wins unless the region reading carries strictly more
/// digits, in which case the region pass recovered digits the word splitter
/// missed and the larger value is taken. A reading of 0 has no magnitude
/// and never outranks the other channel.
pub fn reconcile(from_string: u32, from_region: u32) -> u32 {
    let region_within_string = match (magnitude(from_region), magnitude(from_string)) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(r), Some(s)) => r <= s,
    };

    if region_within_string {
        from_string
    } else {
        from_string.max(from_region)
    }
}
