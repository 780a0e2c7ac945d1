//! Fuzzy correlation between detected words and dictionary labels.
//!
//! OCR output is noisy, so labels are paired by normalized longest-common-
//! subsequence similarity. Assignment is greedy over all (word, entry)
//! pairs in decreasing similarity order, each word and each entry consumed
//! at most once.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashSet};

use crate::vision::DetectedWord;

/// Minimum similarity for a pair to count as a match.
const SIMILARITY_THRESHOLD: f32 = 0.66;

/// Length of the longest common subsequence of `a` and `b`, in characters.
pub fn lcs_length(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // One-row DP, prev holds the diagonal value.
    let mut row = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut prev = 0;
        for (j, cb) in b.iter().enumerate() {
            let tmp = row[j + 1];
            row[j + 1] = if ca == cb {
                prev + 1
            } else {
                row[j + 1].max(row[j])
            };
            prev = tmp;
        }
    }
    row[b.len()]
}

/// Normalized similarity in [0, 1]: `lcs / max(len)`.
/// Identical nonempty strings score 1; anything against "" scores 0.
pub fn similarity(a: &str, b: &str) -> f32 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    lcs_length(a, b) as f32 / longest as f32
}

/// A detected word paired with the dictionary entry it was assigned to.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationMatch<'a> {
    pub similarity: f32,
    pub id: u32,
    pub word: &'a DetectedWord,
}

#[derive(Debug)]
struct ScoredPair {
    similarity: f32,
    id: u32,
    word_index: usize,
}

impl PartialEq for ScoredPair {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredPair {}

impl PartialOrd for ScoredPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredPair {
    fn cmp(&self, other: &Self) -> Ordering {
        // Equal similarities compare Equal; pop order among ties is
        // unspecified and callers must not rely on it.
        self.similarity.total_cmp(&other.similarity)
    }
}

/// Greedily assigns detected words to dictionary entries, one-to-one.
///
/// Every (word, entry) pair is scored and pushed onto a max-heap. Pairs are
/// popped in decreasing similarity order; a pair is accepted when its
/// similarity exceeds the threshold and neither its word nor its entry id
/// has been consumed. Popping stops at the first pair at or below the
/// threshold: scores only decrease from there, so no later pair can
/// qualify.
pub fn correlate<'a>(
    words: &'a [DetectedWord],
    labels: &BTreeMap<u32, String>,
) -> Vec<CorrelationMatch<'a>> {
    let mut heap = BinaryHeap::with_capacity(words.len() * labels.len());
    for (word_index, word) in words.iter().enumerate() {
        for (&id, label) in labels {
            heap.push(ScoredPair {
                similarity: similarity(&word.text, label),
                id,
                word_index,
            });
        }
    }

    let mut matched_ids: HashSet<u32> = HashSet::new();
    let mut matched_words: HashSet<usize> = HashSet::new();
    let mut matches = Vec::new();

    while let Some(pair) = heap.pop() {
        if pair.similarity <= SIMILARITY_THRESHOLD {
            break;
        }
        if matched_ids.contains(&pair.id) || matched_words.contains(&pair.word_index) {
            continue;
        }
        matched_ids.insert(pair.id);
        matched_words.insert(pair.word_index);
        matches.push(CorrelationMatch {
            similarity: pair.similarity,
            id: pair.id,
            word: &words[pair.word_index],
        });
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn word(text: &str, x: i32) -> DetectedWord {
        DetectedWord::new(text, Rect::new(x, 100, 60, 14))
    }

    fn labels(entries: &[(u32, &str)]) -> BTreeMap<u32, String> {
        entries.iter().map(|(id, s)| (*id, s.to_string())).collect()
    }

    #[test]
    fn test_similarity_identity() {
        for s in ["Farmers", "a", "Obreros"] {
            assert_eq!(similarity(s, s), 1.0);
        }
    }

    #[test]
    fn test_similarity_empty_is_zero() {
        assert_eq!(similarity("Farmers", ""), 0.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn test_similarity_in_unit_range() {
        let pairs = [
            ("Farmers", "Fanners"),
            ("Workers", "Workers"),
            ("abc", "xyz"),
            ("Engineers", "Engjneers"),
        ];
        for (a, b) in pairs {
            let s = similarity(a, b);
            assert!((0.0..=1.0).contains(&s), "similarity({a}, {b}) = {s}");
        }
    }

    #[test]
    fn test_lcs_length() {
        assert_eq!(lcs_length("Farmers", "Fanners"), 5);
        assert_eq!(lcs_length("abc", "abc"), 3);
        assert_eq!(lcs_length("abc", "xyz"), 0);
        assert_eq!(lcs_length("", "abc"), 0);
    }

    #[test]
    fn test_correlate_matches_misread_label() {
        // OCR misread "Farmers" as "Fanners"; still well above the threshold.
        let words = vec![word("Fanners", 10), word("1,234", 90)];
        let matches = correlate(&words, &labels(&[(1, "Farmers")]));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, 1);
        assert_eq!(matches[0].word.text, "Fanners");
    }

    #[test]
    fn test_correlate_rejects_below_threshold() {
        let words = vec![word("xqzw", 10)];
        let matches = correlate(&words, &labels(&[(1, "Farmers")]));
        assert!(matches.is_empty());
    }

    #[test]
    fn test_correlate_no_duplicate_ids_or_words() {
        // Two words compete for "Workers"; two entries compete for one word.
        let words = vec![word("Workers", 10), word("Worker5", 200), word("Artisans", 400)];
        let dict = labels(&[(2, "Workers"), (3, "Artisans"), (4, "Workers cap")]);
        let matches = correlate(&words, &dict);

        let mut ids: Vec<u32> = matches.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), matches.len(), "dictionary ids must be unique");

        let mut texts: Vec<&str> = matches.iter().map(|m| m.word.text.as_str()).collect();
        texts.sort_unstable();
        texts.dedup();
        assert_eq!(texts.len(), matches.len(), "source words must be unique");

        for m in &matches {
            assert!(m.similarity > SIMILARITY_THRESHOLD);
        }
    }

    #[test]
    fn test_correlate_prefers_higher_similarity() {
        // The exact word must win the entry over the garbled one.
        let words = vec![word("Workxrs", 10), word("Workers", 200)];
        let matches = correlate(&words, &labels(&[(2, "Workers")]));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].word.text, "Workers");
        assert_eq!(matches[0].similarity, 1.0);
    }

    #[test]
    fn test_correlate_empty_inputs() {
        assert!(correlate(&[], &labels(&[(1, "Farmers")])).is_empty());
        let words = vec![word("Farmers", 10)];
        assert!(correlate(&words, &BTreeMap::new()).is_empty());
    }
}
