//! Fixed logical-canvas geometry.
//!
//! Every content-coupled number lives here so alternate layouts can override them through
//! configuration. Values are in logical units of the 1350x1350 canvas unless noted otherwise.

use crate::foundation::core::{LOGICAL_CANVAS_SIZE, Rect, Rgba8};

/// Vertical midline of the logical canvas.
const CANVAS_MID_X: f64 = LOGICAL_CANVAS_SIZE as f64 / 2.0;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
/// Full layout configuration used by the composer.
pub struct LayoutConfig {
    pub colors: Palette,
    pub logo_left: LogoSlot,
    pub logo_right: LogoSlot,
    pub uplines: UplineRow,
    pub achiever: PhotoSlot,
    pub mentor: PhotoSlot,
    pub block: BlockLayout,
    pub band: BandLayout,
    pub sticker: StickerDefaults,
    pub name: NameRule,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            colors: Palette::default(),
            logo_left: LogoSlot {
                x: 40.0,
                y: 36.0,
                width: 220.0,
                max_height: 150.0,
            },
            logo_right: LogoSlot {
                x: 1090.0,
                y: 36.0,
                width: 220.0,
                max_height: 150.0,
            },
            uplines: UplineRow::default(),
            achiever: PhotoSlot {
                rect: Rect::new(60.0, 250.0, 660.0, 1000.0),
                corner_radius: 32.0,
            },
            mentor: PhotoSlot {
                rect: Rect::new(1030.0, 780.0, 1290.0, 1080.0),
                corner_radius: 24.0,
            },
            block: BlockLayout::default(),
            band: BandLayout::default(),
            sticker: StickerDefaults::default(),
            name: NameRule::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Solid fill drawn under everything.
    pub background: Rgba8,
    pub text: Rgba8,
    pub accent: Rgba8,
    /// Avatar placeholder circles.
    pub placeholder: Rgba8,
    /// Semi-transparent contact band.
    pub band: Rgba8,
    pub muted_text: Rgba8,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgba8::rgb(0x1b, 0x1f, 0x3b),
            text: Rgba8::rgb(0xff, 0xff, 0xff),
            accent: Rgba8::rgb(0xf5, 0xc5, 0x42),
            placeholder: Rgba8::rgb(0x5b, 0x63, 0x8a),
            band: Rgba8::rgba(0x00, 0x00, 0x00, 0xa0),
            muted_text: Rgba8::rgb(0xd8, 0xdc, 0xf0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Width-locked logo placement; height follows the source aspect ratio.
pub struct LogoSlot {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    /// Tall logos are clamped to this height (width shrinks to keep the aspect).
    pub max_height: f64,
}

impl LogoSlot {
    /// Destination rect for a source of `aspect` (width / height).
    pub fn rect_for_aspect(&self, aspect: f64) -> Rect {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        let mut w = self.width;
        let mut h = w / aspect;
        if h > self.max_height {
            h = self.max_height;
            w = h * aspect;
        }
        // Right-aligned slots keep their outer edge fixed.
        let x = if self.x + self.width / 2.0 > CANVAS_MID_X {
            self.x + self.width - w
        } else {
            self.x
        };
        Rect::new(x, self.y, x + w, self.y + h)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UplineRow {
    pub center_y: f64,
    pub diameter: f64,
    /// Center-to-center distance between neighbours.
    pub spacing: f64,
    pub name_offset_y: f64,
    pub name_size: f32,
}

impl Default for UplineRow {
    fn default() -> Self {
        Self {
            center_y: 104.0,
            diameter: 104.0,
            spacing: 128.0,
            name_offset_y: 76.0,
            name_size: 20.0,
        }
    }
}

impl UplineRow {
    /// Centers for `count` avatars, evenly spaced around the canvas midline.
    pub fn centers(&self, count: usize) -> Vec<(f64, f64)> {
        let mid = (count as f64 - 1.0) / 2.0;
        (0..count)
            .map(|i| (CANVAS_MID_X + (i as f64 - mid) * self.spacing, self.center_y))
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PhotoSlot {
    pub rect: Rect,
    pub corner_radius: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
/// Category block column.
pub struct BlockLayout {
    pub center_x: f64,
    /// Column center for layouts without the achiever photo.
    pub wide_center_x: f64,
    pub max_width: f64,
    pub wide_max_width: f64,
    pub icon_center_y: f64,
    pub icon_radius: f64,
    pub congrats_rect: Rect,
    pub heading_y: f64,
    pub heading_size: f32,
    pub name_y: f64,
    pub first_line_y: f64,
    pub line_gap: f64,
    pub line_size: f32,
    pub quote_size: f32,
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self {
            center_x: 1000.0,
            wide_center_x: CANVAS_MID_X,
            max_width: 600.0,
            wide_max_width: 1100.0,
            icon_center_y: 310.0,
            icon_radius: 48.0,
            congrats_rect: Rect::new(760.0, 380.0, 1240.0, 520.0),
            heading_y: 570.0,
            heading_size: 44.0,
            name_y: 650.0,
            first_line_y: 730.0,
            line_gap: 56.0,
            line_size: 30.0,
            quote_size: 38.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
/// Bottom contact/profile band.
pub struct BandLayout {
    pub rect: Rect,
    pub padding_x: f64,
    pub mobile_size: f32,
    pub profile_name_size: f32,
    pub profile_rank_size: f32,
}

impl Default for BandLayout {
    fn default() -> Self {
        Self {
            rect: Rect::new(0.0, 1220.0, 1350.0, 1350.0),
            padding_x: 60.0,
            mobile_size: 40.0,
            profile_name_size: 36.0,
            profile_rank_size: 26.0,
        }
    }
}

/// Legacy sticker center X (percent). Baked into existing content; do not round.
pub const DEFAULT_STICKER_POSITION_X: f64 = 77.0;
/// Legacy sticker center Y (percent).
pub const DEFAULT_STICKER_POSITION_Y: f64 = 62.0;
/// Legacy sticker scale multiplier.
pub const DEFAULT_STICKER_SCALE: f64 = 9.3;
/// Legacy sticker rotation (degrees).
pub const DEFAULT_STICKER_ROTATION_DEG: f64 = 0.0;
/// Side of the unscaled sticker square.
pub const STICKER_BASE_SIZE: f64 = 145.0;

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
/// Values applied to sticker fields that were left unspecified.
pub struct StickerDefaults {
    pub position_x: f64,
    pub position_y: f64,
    pub scale: f64,
    pub rotation_deg: f64,
    pub base_size: f64,
}

impl Default for StickerDefaults {
    fn default() -> Self {
        Self {
            position_x: DEFAULT_STICKER_POSITION_X,
            position_y: DEFAULT_STICKER_POSITION_Y,
            scale: DEFAULT_STICKER_SCALE,
            rotation_deg: DEFAULT_STICKER_ROTATION_DEG,
            base_size: STICKER_BASE_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
/// Achiever-name truncation and length-tiered font sizing.
pub struct NameRule {
    /// Names longer than this many characters are cut and suffixed with `ellipsis`.
    pub max_chars: usize,
    pub ellipsis: String,
    /// `(longer_than, size)` pairs checked in order.
    pub tiers: Vec<(usize, f32)>,
    /// Size when no tier matches.
    pub base_size: f32,
}

impl Default for NameRule {
    fn default() -> Self {
        Self {
            max_chars: 20,
            ellipsis: "...".to_string(),
            tiers: vec![(18, 36.0), (14, 42.0), (10, 48.0)],
            base_size: 54.0,
        }
    }
}

impl NameRule {
    /// Cut to `max_chars` characters and append the ellipsis when longer.
    pub fn truncate(&self, name: &str) -> String {
        if name.chars().count() <= self.max_chars {
            return name.to_string();
        }
        let mut out: String = name.chars().take(self.max_chars).collect();
        out.push_str(&self.ellipsis);
        out
    }

    /// Font size for an already-truncated name.
    pub fn font_size(&self, truncated: &str) -> f32 {
        let len = truncated.chars().count();
        self.tiers
            .iter()
            .find(|(longer_than, _)| len > *longer_than)
            .map(|(_, size)| *size)
            .unwrap_or(self.base_size)
    }

    /// Truncation always happens before sizing.
    pub fn apply(&self, name: &str) -> (String, f32) {
        let truncated = self.truncate(name);
        let size = self.font_size(&truncated);
        (truncated, size)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/layout.rs"]
mod tests;
