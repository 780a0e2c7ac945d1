//! Turns raw screen captures of the running game into structured,
//! queryable state: per-category population counts for the stats
//! aggregator, and a model of the trading panel (offers, prices, limits,
//! button positions) for the automated-input component.
//!
//! The pipeline is single-threaded and snapshot-based: a frame starts when
//! a new screenshot is pushed via `update`, queries then lazily recompute
//! and cache their results for that frame only. Anything unreadable
//! degrades to an empty or zero sentinel instead of failing; the low-level
//! template matcher and word detector are consumed through the
//! [`vision::Vision`] contract.

pub mod correlate;
pub mod dictionary;
pub mod geometry;
pub mod hud;
pub mod preprocess;
pub mod reconcile;
pub mod templates;
pub mod trading;
pub mod vision;

pub use dictionary::{Dictionary, DictionarySet};
pub use geometry::{Point, Rect, RelativePoint, RelativeRect};
pub use hud::{ALL_LOCATIONS, PopulationExtractor};
pub use templates::TemplateCache;
pub use trading::{Item, ItemLibrary, Offering, PanelMode, TradingPanelModel};
pub use vision::{DetectMode, DetectedWord, TemplateMatch, Vision, VisionError};
