//! Layout constants for the trading panel.
//!
//! All regions are window fractions so they hold across resolutions.
//! Reference colors are sampled from the rendered panel chrome; probes
//! compare against them with a small per-channel tolerance.

use image::Rgba;

use crate::geometry::{RelativePoint, RelativeRect};

/// Per-channel tolerance for probe color comparisons.
pub const COLOR_TOLERANCE: i32 = 12;

pub const BACKGROUND_MARINE_BLUE: Rgba<u8> = Rgba([31, 45, 64, 255]);
pub const BACKGROUND_SAND_DARK: Rgba<u8> = Rgba([181, 156, 124, 255]);
pub const BACKGROUND_SAND_BRIGHT: Rgba<u8> = Rgba([213, 193, 162, 255]);
pub const BACKGROUND_GREY_BRIGHT: Rgba<u8> = Rgba([158, 158, 158, 255]);
pub const BACKGROUND_GREY_DARK: Rgba<u8> = Rgba([66, 66, 66, 255]);
pub const BACKGROUND_GREEN_BRIGHT: Rgba<u8> = Rgba([106, 168, 79, 255]);
pub const BACKGROUND_GREEN_DARK: Rgba<u8> = Rgba([56, 118, 29, 255]);
pub const BACKGROUND_CARGO_SLOT: Rgba<u8> = Rgba([109, 94, 74, 255]);
pub const BACKGROUND_PANEL: Rgba<u8> = Rgba([23, 27, 33, 255]);
pub const FRAME_BROWN: Rgba<u8> = Rgba([96, 72, 48, 255]);
pub const RED_ICON: Rgba<u8> = Rgba([182, 46, 38, 255]);

/// Backdrop colors of a slot whose contents have not rendered yet.
pub const UNLOADED_BACKDROP: [Rgba<u8>; 2] = [BACKGROUND_PANEL, BACKGROUND_MARINE_BLUE];

/// Backdrop colors of a rendered but empty slot.
pub const EMPTY_SLOT_BACKDROP: [Rgba<u8>; 5] = [
    BACKGROUND_CARGO_SLOT,
    BACKGROUND_SAND_DARK,
    BACKGROUND_SAND_BRIGHT,
    BACKGROUND_GREY_BRIGHT,
    BACKGROUND_GREY_DARK,
];

pub const COUNT_ROWS: u32 = 2;
pub const COUNT_COLS: u32 = 3;

/// Layout-constant table for one panel mode.
#[derive(Debug, Clone, Copy)]
pub struct PanelLayout {
    /// Grid of offer slots.
    pub offerings: RelativeRect,
    /// Execute button (Open) or the open-panel button (Preview).
    pub execute_button: RelativeRect,
    pub reroll_button: RelativeRect,
}

pub const OPEN: PanelLayout = PanelLayout {
    offerings: RelativeRect::new(0.30, 0.30, 0.36, 0.36),
    execute_button: RelativeRect::new(0.55, 0.78, 0.10, 0.05),
    reroll_button: RelativeRect::new(0.33, 0.78, 0.06, 0.05),
};

/// Open panel with the buy-limit counter strip above the grid; the grid
/// sits lower by the strip height.
pub const OPEN_WITH_COUNTER: PanelLayout = PanelLayout {
    offerings: RelativeRect::new(0.30, 0.33, 0.36, 0.36),
    execute_button: OPEN.execute_button,
    reroll_button: OPEN.reroll_button,
};

pub const PREVIEW: PanelLayout = PanelLayout {
    offerings: RelativeRect::new(0.36, 0.40, 0.27, 0.27),
    execute_button: RelativeRect::new(0.47, 0.72, 0.10, 0.05),
    reroll_button: RelativeRect::new(0.40, 0.72, 0.05, 0.05),
};

// Background probes sit in the gap between the offer grid and the button
// row, so slot contents never repaint them.
pub const PROBE_OPEN_FRAME: RelativePoint = RelativePoint::new(0.295, 0.245);
pub const PROBE_OPEN_BACKGROUND: RelativePoint = RelativePoint::new(0.50, 0.70);
pub const PROBE_PREVIEW_FRAME: RelativePoint = RelativePoint::new(0.355, 0.38);
pub const PROBE_PREVIEW_BACKGROUND: RelativePoint = RelativePoint::new(0.50, 0.70);

/// Counter strip backdrop, present only when the trader enforces a buy limit.
pub const PROBE_BUY_LIMIT_COUNTER: RelativePoint = RelativePoint::new(0.48, 0.315);

/// Turns red when the ship cargo is full.
pub const PIXEL_SHIP_FULL: RelativePoint = RelativePoint::new(0.85, 0.87);

/// Price band inside one slot.
pub const SLOT_PRICE: RelativeRect = RelativeRect::new(0.10, 0.76, 0.55, 0.20);
/// Item icon inside one slot.
pub const SLOT_ICON: RelativeRect = RelativeRect::new(0.22, 0.10, 0.56, 0.56);
/// Corner of one slot where the cap mark icon renders when the offer is
/// capped.
pub const SLOT_CAP_REGION: RelativeRect = RelativeRect::new(0.78, 0.04, 0.18, 0.18);

/// Sample points used to classify a slot's contents.
pub const SLOT_SAMPLES: [RelativePoint; 5] = [
    RelativePoint::new(0.5, 0.5),
    RelativePoint::new(0.3, 0.3),
    RelativePoint::new(0.7, 0.3),
    RelativePoint::new(0.3, 0.7),
    RelativePoint::new(0.7, 0.7),
];

pub const PANE_TOOLTIP_REROLL_HEADING: RelativeRect = RelativeRect::new(0.62, 0.70, 0.16, 0.03);
pub const PANE_TOOLTIP_REROLL_PRICE: RelativeRect = RelativeRect::new(0.62, 0.735, 0.16, 0.035);
pub const PANE_TOOLTIP_LIMIT_HEADING: RelativeRect = RelativeRect::new(0.40, 0.24, 0.16, 0.03);
pub const PANE_TOOLTIP_LIMIT_VALUE: RelativeRect = RelativeRect::new(0.40, 0.275, 0.16, 0.035);
