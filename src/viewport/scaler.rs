use crate::foundation::core::{Affine, LOGICAL_CANVAS_SIZE, Point};

/// Scale factor mapping the logical canvas onto a container `width_px` wide.
///
/// Zero, negative and non-finite widths yield `0.0`, which callers treat as "do not render".
pub fn compute_scale(width_px: f64) -> f64 {
    if width_px.is_finite() && width_px > 0.0 {
        width_px / f64::from(LOGICAL_CANVAS_SIZE)
    } else {
        0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
/// Derived description of where a composition is displayed. Never authoritative for layout.
pub struct RenderTarget {
    pub logical_width: u32,
    pub logical_height: u32,
    pub scale: f64,
    pub device_pixel_ratio: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// On-screen box showing the logical canvas. The box is square; its height is its width.
pub struct Viewport {
    width_px: f64,
    scale: f64,
    device_pixel_ratio: Option<f64>,
}

impl Viewport {
    pub fn new(container_width_px: f64) -> Self {
        Self {
            width_px: container_width_px,
            scale: compute_scale(container_width_px),
            device_pixel_ratio: None,
        }
    }

    pub fn with_device_pixel_ratio(mut self, dpr: f64) -> Self {
        self.device_pixel_ratio = (dpr.is_finite() && dpr > 0.0).then_some(dpr);
        self
    }

    /// Observe a container resize. Returns whether the scale changed.
    pub fn resize(&mut self, container_width_px: f64) -> bool {
        let scale = compute_scale(container_width_px);
        let changed = scale != self.scale;
        self.width_px = container_width_px;
        self.scale = scale;
        if changed {
            tracing::trace!(width_px = container_width_px, scale, "viewport resized");
        }
        changed
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_renderable(&self) -> bool {
        self.scale > 0.0
    }

    pub fn render_target(&self) -> RenderTarget {
        RenderTarget {
            logical_width: LOGICAL_CANVAS_SIZE,
            logical_height: LOGICAL_CANVAS_SIZE,
            scale: self.scale,
            device_pixel_ratio: self.device_pixel_ratio,
        }
    }

    /// Whole-scene transform from logical units to CSS-style pixels.
    pub fn to_affine(&self) -> Option<Affine> {
        self.is_renderable().then(|| Affine::scale(self.scale))
    }

    /// Side of the backing pixel buffer, accounting for the device pixel ratio.
    pub fn backing_pixels(&self) -> Option<u32> {
        if !self.is_renderable() {
            return None;
        }
        let px = (self.width_px * self.device_pixel_ratio.unwrap_or(1.0)).round();
        (px >= 1.0 && px <= f64::from(u32::MAX)).then_some(px as u32)
    }

    pub fn logical_to_screen(&self, p: Point) -> Option<Point> {
        self.to_affine().map(|a| a * p)
    }

    pub fn screen_to_logical(&self, p: Point) -> Option<Point> {
        self.is_renderable()
            .then(|| Point::new(p.x / self.scale, p.y / self.scale))
    }

    /// Convert a pointer movement in screen pixels into a percent-of-canvas delta, the unit
    /// slot transforms are stored in.
    pub fn screen_delta_to_percent(&self, dx_px: f64, dy_px: f64) -> Option<(f64, f64)> {
        if !self.is_renderable() {
            return None;
        }
        let to_pct = |d: f64| d / self.scale / f64::from(LOGICAL_CANVAS_SIZE) * 100.0;
        Some((to_pct(dx_px), to_pct(dy_px)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/viewport/scaler.rs"]
mod tests;
