//! HUD statistics extraction.
//!
//! Reads the population counters shown next to the anchor icon at the top
//! of the screen, and the currently selected location from the minimap
//! label.

pub mod population;

pub use population::{ALL_LOCATIONS, PopulationExtractor};
