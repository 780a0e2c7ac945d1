//! Trading panel state model.
//!
//! Reconstructs the offer grid, prices, limits and button positions of the
//! trading panel from the current frame. The panel has two layouts: a
//! lightweight Preview and the full Open panel. Which one is showing is
//! derived from pixel probes on every call; no mode is ever stored, so a
//! query can never act on a stale mode.

pub mod layout;

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::OnceLock;

use image::{Rgba, RgbaImage};
use regex::Regex;

use crate::correlate;
use crate::dictionary::{self, DictionarySet};
use crate::geometry::{Point, Rect, RelativePoint, RelativeRect};
use crate::preprocess;
use crate::reconcile;
use crate::templates::{self, TemplateCache};
use crate::vision::{DetectMode, Vision};

use layout::PanelLayout;

/// Words accepted as part of a price: digits with optional separators.
const PRICE_PATTERN: &str = r"^(\d+[,.])*\d+$";

/// Template-match scores below this count as a present cap mark.
const CAP_MARK_FIT_THRESHOLD: f32 = 20_000.0;

fn price_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PRICE_PATTERN).expect("price pattern is valid"))
}

/// A catalog entry the icon matcher can resolve an offer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: u32,
    pub name: String,
    /// Base selling price before any modification.
    pub price: u32,
    /// Price modification in percent contributed while the offer is capped.
    pub discount_percent: i32,
}

/// External item-icon matcher. Candidates are ordered best first.
pub trait ItemLibrary {
    fn candidates(&self, cargo: &RgbaImage) -> Vec<Rc<Item>>;
    fn by_id(&self, id: u32) -> Option<Rc<Item>>;
}

/// One resolvable offer slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Offering {
    /// Slot ordinal, row-major over the offer grid.
    pub index: u32,
    /// Slot bounds in screenshot pixels.
    pub rect: Rect,
    pub price: u32,
    pub item_candidates: Vec<Rc<Item>>,
}

/// Which panel layout is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMode {
    Closed,
    Preview,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    /// Slot region still shows the plain panel backdrop; contents are
    /// animating in.
    Unloaded,
    /// Rendered slot without an offer.
    Empty,
    Populated,
}

/// Stateless-read model of the trading panel.
///
/// Every accessor recomputes from the current screenshot; the only state
/// besides the frame buffer are the per-slot price and cargo-image caches,
/// which exist to avoid redundant cropping and OCR across repeated queries
/// against the same frame and are cleared on `update`.
pub struct TradingPanelModel<V: Vision, L: ItemLibrary> {
    vision: V,
    items: L,
    dictionaries: DictionarySet,
    templates: TemplateCache,
    language: String,
    screenshot: RgbaImage,
    price_cache: HashMap<u32, u32>,
    cargo_cache: HashMap<u32, RgbaImage>,
}

fn color_close(a: Rgba<u8>, b: Rgba<u8>) -> bool {
    (0..3).all(|c| (a[c] as i32 - b[c] as i32).abs() <= layout::COLOR_TOLERANCE)
}

impl<V: Vision, L: ItemLibrary> TradingPanelModel<V, L> {
    pub fn new(vision: V, items: L, dictionaries: DictionarySet, templates: TemplateCache) -> Self {
        Self {
            vision,
            items,
            dictionaries,
            templates,
            language: String::from("english"),
            screenshot: RgbaImage::new(0, 0),
            price_cache: HashMap::new(),
            cargo_cache: HashMap::new(),
        }
    }

    /// Starts a new frame: replaces the screenshot, switches the active
    /// dictionary language and clears the per-slot caches.
    pub fn update(&mut self, language: &str, screenshot: RgbaImage) {
        self.language = language.to_string();
        self.screenshot = screenshot;
        self.price_cache.clear();
        self.cargo_cache.clear();
    }

    fn pixel(&self, at: Point) -> Option<Rgba<u8>> {
        let (w, h) = self.screenshot.dimensions();
        if at.x < 0 || at.y < 0 || at.x >= w as i32 || at.y >= h as i32 {
            return None;
        }
        Some(*self.screenshot.get_pixel(at.x as u32, at.y as u32))
    }

    fn probe(&self, at: RelativePoint, reference: Rgba<u8>) -> bool {
        let (w, h) = self.screenshot.dimensions();
        self.probe_abs(at.to_absolute(w, h), reference)
    }

    fn probe_abs(&self, at: Point, reference: Rgba<u8>) -> bool {
        self.pixel(at).is_some_and(|px| color_close(px, reference))
    }

    /// Derives the showing layout from the panel chrome probes.
    pub fn mode(&self) -> PanelMode {
        if self.probe(layout::PROBE_OPEN_FRAME, layout::FRAME_BROWN)
            && self.probe(layout::PROBE_OPEN_BACKGROUND, layout::BACKGROUND_PANEL)
        {
            return PanelMode::Open;
        }
        if self.probe(layout::PROBE_PREVIEW_FRAME, layout::FRAME_BROWN)
            && self.probe(layout::PROBE_PREVIEW_BACKGROUND, layout::BACKGROUND_MARINE_BLUE)
        {
            return PanelMode::Preview;
        }
        PanelMode::Closed
    }

    pub fn is_open(&self) -> bool {
        self.mode() == PanelMode::Open
    }

    fn active_layout(&self) -> Option<&'static PanelLayout> {
        match self.mode() {
            PanelMode::Open => Some(if self.has_buy_limit() {
                &layout::OPEN_WITH_COUNTER
            } else {
                &layout::OPEN
            }),
            PanelMode::Preview => Some(&layout::PREVIEW),
            PanelMode::Closed => None,
        }
    }

    /// Whether the trader enforces a buy limit; detected from the counter
    /// strip that shifts the offer grid down.
    pub fn has_buy_limit(&self) -> bool {
        self.mode() == PanelMode::Open
            && self.probe(layout::PROBE_BUY_LIMIT_COUNTER, layout::BACKGROUND_SAND_DARK)
    }

    pub fn has_reroll(&self) -> bool {
        let Some(table) = self.active_layout() else {
            return false;
        };
        let center = table.reroll_button.center();
        self.probe(center, layout::BACKGROUND_GREEN_BRIGHT)
            || self.probe(center, layout::BACKGROUND_GREEN_DARK)
    }

    /// Open panel: whether the trade can be executed. Preview: whether the
    /// open-panel button is available.
    pub fn can_buy(&self) -> bool {
        let Some(table) = self.active_layout() else {
            return false;
        };
        let center = table.execute_button.center();
        self.probe(center, layout::BACKGROUND_GREEN_BRIGHT)
            || self.probe(center, layout::BACKGROUND_GREEN_DARK)
    }

    /// Whether the offer at `index` can be added to the cart.
    /// False in every other case, including Preview and Closed.
    pub fn can_buy_at(&self, index: u32) -> bool {
        if self.mode() != PanelMode::Open || self.is_ship_full() {
            return false;
        }
        match self.slot_absolute(index) {
            Some(rect) => self.classify_slot(&rect) == SlotState::Populated,
            None => false,
        }
    }

    pub fn is_ship_full(&self) -> bool {
        self.probe(layout::PIXEL_SHIP_FULL, layout::RED_ICON)
    }

    /// Slot bounds in window fractions; `None` when the panel is closed or
    /// the index is outside the grid.
    pub fn slot_relative(&self, index: u32) -> Option<RelativeRect> {
        if index >= layout::COUNT_ROWS * layout::COUNT_COLS {
            return None;
        }
        let pane = self.active_layout()?.offerings;
        let col = index % layout::COUNT_COLS;
        let row = index / layout::COUNT_COLS;
        let width = pane.width / layout::COUNT_COLS as f32;
        let height = pane.height / layout::COUNT_ROWS as f32;
        Some(RelativeRect::new(
            pane.x + col as f32 * width,
            pane.y + row as f32 * height,
            width,
            height,
        ))
    }

    /// Slot bounds in screenshot pixels.
    pub fn slot_absolute(&self, index: u32) -> Option<Rect> {
        self.slot_relative(index)
            .map(|rect| self.to_window_absolute(&rect))
    }

    pub fn to_window_absolute(&self, rect: &RelativeRect) -> Rect {
        let (w, h) = self.screenshot.dimensions();
        rect.to_absolute(w, h)
    }

    pub fn to_window_relative(&self, rect: &Rect) -> RelativeRect {
        let (w, h) = self.screenshot.dimensions();
        rect.to_relative(w, h)
    }

    fn classify_slot(&self, rect: &Rect) -> SlotState {
        let samples: Vec<Rgba<u8>> = layout::SLOT_SAMPLES
            .iter()
            .filter_map(|p| self.pixel(rect.point_at(p)))
            .collect();
        if samples.is_empty()
            || samples
                .iter()
                .all(|px| layout::UNLOADED_BACKDROP.iter().any(|c| color_close(*px, *c)))
        {
            return SlotState::Unloaded;
        }
        if samples
            .iter()
            .all(|px| layout::EMPTY_SLOT_BACKDROP.iter().any(|c| color_close(*px, *c)))
        {
            return SlotState::Empty;
        }
        SlotState::Populated
    }

    /// All currently resolvable offers.
    ///
    /// With `abort_if_not_loaded`, an empty vec is returned as soon as any
    /// slot still shows the plain backdrop: the panel animates items in,
    /// and a partial read would go stale immediately. Callers retry on the
    /// next frame.
    pub fn offerings(&mut self, abort_if_not_loaded: bool) -> Vec<Offering> {
        if self.active_layout().is_none() {
            return Vec::new();
        }

        let total = layout::COUNT_ROWS * layout::COUNT_COLS;
        let mut classified = Vec::with_capacity(total as usize);
        for index in 0..total {
            let Some(rect) = self.slot_absolute(index) else {
                return Vec::new();
            };
            let state = self.classify_slot(&rect);
            if abort_if_not_loaded && state == SlotState::Unloaded {
                tracing::debug!("slot {index} not yet loaded, aborting offer read");
                return Vec::new();
            }
            classified.push((index, rect, state));
        }

        let mut offers = Vec::new();
        for (index, rect, state) in classified {
            if state != SlotState::Populated {
                continue;
            }
            let price = self.price_for_slot(index, &rect);
            let cargo = self.cargo_for_slot(index, &rect);
            let item_candidates = self.items.candidates(&cargo);
            offers.push(Offering {
                index,
                rect,
                price,
                item_candidates,
            });
        }
        offers
    }

    /// Whether the cap mark icon renders in the slot's cap corner.
    fn slot_capped(&mut self, slot: &Rect) -> bool {
        let (w, h) = self.screenshot.dimensions();
        let resolution = templates::resolution_label(w, h);
        let Some(icon) = self
            .templates
            .get(&self.vision, &resolution, templates::CAP_MARK_ICON)
        else {
            return false;
        };
        let corner = preprocess::crop_rect(&self.screenshot, &slot.sub_rect(&layout::SLOT_CAP_REGION));
        let result = self.vision.match_template(&corner, icon);
        result.score < CAP_MARK_FIT_THRESHOLD
    }

    /// Indices of populated slots flagged capped by the cap mark icon.
    pub fn capped_slots(&mut self) -> Vec<u32> {
        let mut capped = Vec::new();
        for index in 0..layout::COUNT_ROWS * layout::COUNT_COLS {
            let Some(rect) = self.slot_absolute(index) else {
                continue;
            };
            if self.classify_slot(&rect) == SlotState::Populated && self.slot_capped(&rect) {
                capped.push(index);
            }
        }
        capped
    }

    /// Total price modification in percent introduced by capped offers.
    pub fn price_modification(&mut self) -> i32 {
        let mut total = 0;
        for index in self.capped_slots() {
            let Some(rect) = self.slot_absolute(index) else {
                continue;
            };
            let cargo = self.cargo_for_slot(index, &rect);
            if let Some(item) = self.items.candidates(&cargo).first() {
                tracing::debug!("slot {index} capped by item {}", item.id);
                total += item.discount_percent;
            }
        }
        total
    }

    /// Whether `selling_price` equals the expected post-modification price
    /// of catalog entry `id`.
    pub fn check_price(&self, id: u32, selling_price: u32, price_modification_percent: i32) -> bool {
        let Some(item) = self.items.by_id(id) else {
            return false;
        };
        let expected =
            (item.price as i64 * (100 + price_modification_percent) as i64 + 50) / 100;
        expected == selling_price as i64
    }

    /// Cost of the next reroll, or 0 while the reroll tooltip is not open.
    pub fn reroll_cost(&self) -> u32 {
        if !self.tooltip_open(&layout::PANE_TOOLTIP_REROLL_HEADING, dictionary::UI_REROLL_HEADING) {
            return 0;
        }
        let band = preprocess::crop_relative(&self.screenshot, &layout::PANE_TOOLTIP_REROLL_PRICE);
        self.read_number(&band)
    }

    /// Remaining buy limit, or 0 while the limit tooltip is not open.
    pub fn buy_limit(&self) -> u32 {
        if !self.tooltip_open(&layout::PANE_TOOLTIP_LIMIT_HEADING, dictionary::UI_BUY_LIMIT_HEADING)
        {
            return 0;
        }
        let band = preprocess::crop_relative(&self.screenshot, &layout::PANE_TOOLTIP_LIMIT_VALUE);
        self.read_number(&band)
    }

    /// Execute button (Open) or open-panel button (Preview), in window
    /// fractions for the input component.
    pub fn execute_button(&self) -> Option<RelativeRect> {
        self.active_layout().map(|table| table.execute_button)
    }

    pub fn reroll_button(&self) -> Option<RelativeRect> {
        self.active_layout().map(|table| table.reroll_button)
    }

    /// Confirms a tooltip is open by correlating its heading strip against
    /// the fixed UI label `label_id`.
    fn tooltip_open(&self, heading: &RelativeRect, label_id: u32) -> bool {
        let crop = preprocess::crop_relative(&self.screenshot, heading);
        let words = match self.vision.detect_words(&crop, DetectMode::SingleLine) {
            Ok(words) => words,
            Err(err) => {
                tracing::warn!("word detection failed on tooltip heading: {err}");
                return false;
            }
        };
        let dict = self.dictionaries.get(&self.language);
        correlate::correlate(&words, &dict.ui_labels)
            .iter()
            .any(|m| m.id == label_id)
    }

    fn price_for_slot(&mut self, index: u32, slot: &Rect) -> u32 {
        if let Some(&price) = self.price_cache.get(&index) {
            return price;
        }
        let band = preprocess::crop_rect(&self.screenshot, &slot.sub_rect(&layout::SLOT_PRICE));
        let price = self.read_number(&band);
        self.price_cache.insert(index, price);
        price
    }

    fn cargo_for_slot(&mut self, index: u32, slot: &Rect) -> RgbaImage {
        if let Some(cached) = self.cargo_cache.get(&index) {
            return cached.clone();
        }
        let crop = preprocess::crop_rect(&self.screenshot, &slot.sub_rect(&layout::SLOT_ICON));
        self.cargo_cache.insert(index, crop.clone());
        crop
    }

    /// Reads a number from a cropped band through both channels: the
    /// digit characters of price-shaped words and a re-detection of the
    /// band itself.
    fn read_number(&self, band: &RgbaImage) -> u32 {
        let words = match self.vision.detect_words(band, DetectMode::SingleLine) {
            Ok(words) => words,
            Err(err) => {
                tracing::warn!("word detection failed on number band: {err}");
                return 0;
            }
        };
        let digits: String = words
            .iter()
            .filter(|w| price_regex().is_match(&w.text))
            .flat_map(|w| w.text.chars())
            .filter(|c| c.is_ascii_digit())
            .collect();
        let from_string = reconcile::number_from_string(&digits);
        let from_region = reconcile::number_from_region(&self.vision, band);
        reconcile::reconcile(from_string, from_region)
    }
}
