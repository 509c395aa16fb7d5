use crate::foundation::error::{BannerError, BannerResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Side length of the logical canvas. All placement math happens in this space.
pub const LOGICAL_CANVAS_SIZE: u32 = 1350;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// The fixed 1350x1350 logical canvas.
    pub const LOGICAL: Canvas = Canvas {
        width: LOGICAL_CANVAS_SIZE,
        height: LOGICAL_CANVAS_SIZE,
    };

    pub fn new(width: u32, height: u32) -> BannerResult<Self> {
        if width == 0 || height == 0 {
            return Err(BannerError::validation("canvas dimensions must be > 0"));
        }
        Ok(Self { width, height })
    }

    pub fn square(side: u32) -> BannerResult<Self> {
        Self::new(side, side)
    }

    pub fn bounds(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Affine mapping logical canvas units onto this canvas.
    pub fn logical_to_target(self) -> Affine {
        let logical = f64::from(LOGICAL_CANVAS_SIZE);
        Affine::scale_non_uniform(
            f64::from(self.width) / logical,
            f64::from(self.height) / logical,
        )
    }
}

/// Convert a percentage in `[0, 100]` of the logical canvas side into logical units.
pub fn percent_to_logical(percent: f64) -> f64 {
    percent / 100.0 * f64::from(LOGICAL_CANVAS_SIZE)
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn transparent() -> Self {
        Self::rgba(0, 0, 0, 0)
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(s: &str) -> BannerResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 && hex.len() != 8 {
            return Err(BannerError::validation(format!("invalid hex color '{s}'")));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| BannerError::validation(format!("invalid hex color '{s}'")))
        };
        let a = if hex.len() == 8 { byte(6)? } else { 255 };
        Ok(Self::rgba(byte(0)?, byte(2)?, byte(4)?, a))
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_premul(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }
}

impl From<[u8; 4]> for Rgba8 {
    fn from(v: [u8; 4]) -> Self {
        Self::rgba(v[0], v[1], v[2], v[3])
    }
}

impl From<Rgba8> for [u8; 4] {
    fn from(c: Rgba8) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

/// Rotation about a center followed by uniform scale, as used by stickers and slots.
pub fn rotate_scale_about(center: Point, rotation_deg: f64, scale: f64) -> Affine {
    Affine::translate(center.to_vec2())
        * Affine::rotate(rotation_deg.to_radians())
        * Affine::scale(scale)
        * Affine::translate(-center.to_vec2())
}

/// Horizontal mirror around the vertical center line of `rect`.
pub fn mirror_x_within(rect: Rect) -> Affine {
    let cx = rect.center().x;
    Affine::translate(Vec2::new(cx, 0.0))
        * Affine::scale_non_uniform(-1.0, 1.0)
        * Affine::translate(Vec2::new(-cx, 0.0))
}
