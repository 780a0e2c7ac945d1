//! Label dictionaries, one per language.
//!
//! Loaded from JSON at startup. Population group labels are correlated
//! against OCR output; UI labels confirm fixed panel strings such as
//! tooltip headings.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// `ui_labels` id of the reroll tooltip heading.
pub const UI_REROLL_HEADING: u32 = 1;
/// `ui_labels` id of the buy-limit tooltip heading.
pub const UI_BUY_LIMIT_HEADING: u32 = 2;

/// Label tables for one language.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dictionary {
    /// Population category id → display label.
    pub population_groups: BTreeMap<u32, String>,
    /// Fixed UI string id → display label (tooltip headings etc.).
    #[serde(default)]
    pub ui_labels: BTreeMap<u32, String>,
}

/// All loaded dictionaries, keyed by language name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DictionarySet {
    languages: HashMap<String, Dictionary>,
}

impl DictionarySet {
    pub fn new(languages: HashMap<String, Dictionary>) -> Self {
        Self { languages }
    }

    /// Loads dictionaries from a JSON file of the shape
    /// `{"languages": {"english": {"population_groups": {...}, ...}}}`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dictionary file {}", path.display()))?;
        let set: DictionarySet = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse dictionary file {}", path.display()))?;
        tracing::debug!(
            "loaded dictionaries for {} languages",
            set.languages.len()
        );
        Ok(set)
    }

    pub fn has_language(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }

    /// Tables for `language`, or an empty dictionary for unknown languages
    /// (extraction then degrades to zero matches).
    pub fn get(&self, language: &str) -> Dictionary {
        self.languages.get(language).cloned().unwrap_or_else(|| {
            tracing::warn!("no dictionary for language {language:?}");
            Dictionary::default()
        })
    }
}
