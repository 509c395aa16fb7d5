use std::{io::Cursor, path::Path};

use crate::{
    assets::loader::LoadedAssets,
    compile::plan::BannerPlan,
    foundation::core::{Canvas, LOGICAL_CANVAS_SIZE, Rgba8},
    foundation::error::{BannerError, BannerResult},
    foundation::math::mul_alpha,
    render::{RenderBackend, RenderSettings, create_backend},
};

/// Quality used for JPEG exports unless configured otherwise.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Side of the capture-path export.
pub const CAPTURE_EXPORT_SIZE: u32 = 1080;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Target resolution of an export.
pub enum ExportProfile {
    /// 1350x1350, one pixel per logical unit.
    Native,
    /// 1080x1080.
    Capture,
    Custom { width: u32, height: u32 },
}

impl ExportProfile {
    pub fn size(self) -> (u32, u32) {
        match self {
            ExportProfile::Native => (LOGICAL_CANVAS_SIZE, LOGICAL_CANVAS_SIZE),
            ExportProfile::Capture => (CAPTURE_EXPORT_SIZE, CAPTURE_EXPORT_SIZE),
            ExportProfile::Custom { width, height } => (width, height),
        }
    }

    /// Parse `native`, `capture` or `WxH`.
    pub fn parse(s: &str) -> BannerResult<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "native" => return Ok(Self::Native),
            "capture" => return Ok(Self::Capture),
            _ => {}
        }
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| BannerError::validation(format!("unknown export profile '{s}'")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| BannerError::validation(format!("unknown export profile '{s}'")))
        };
        Ok(Self::Custom {
            width: parse(w)?,
            height: parse(h)?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Jpeg { quality: u8 },
    Png,
}

impl ExportFormat {
    /// Pick a format from a file extension. Anything other than `.png` is JPEG.
    pub fn for_path(path: &Path, jpeg_quality: u8) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("png") => ExportFormat::Png,
            _ => ExportFormat::Jpeg {
                quality: jpeg_quality,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Opaque straight-alpha RGBA8 pixels at the export resolution.
pub struct RasterBuffer {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

impl RasterBuffer {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.rgba8.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// Rasterizes plans at a fixed target size straight from logical coordinates.
pub struct Exporter {
    backend: Box<dyn RenderBackend>,
    background: Rgba8,
    jpeg_quality: u8,
}

impl Exporter {
    pub fn new(settings: &RenderSettings, background: Rgba8) -> Self {
        let mut settings = settings.clone();
        settings.clear_rgba = None;
        Self {
            backend: create_backend(&settings),
            background,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Render `plan` at `width`x`height` and flatten it over the background color.
    ///
    /// A failed export leaves `plan` and `assets` untouched; callers may retry.
    #[tracing::instrument(level = "debug", skip(self, plan, assets))]
    pub fn export(
        &mut self,
        plan: &BannerPlan,
        assets: &LoadedAssets,
        width: u32,
        height: u32,
    ) -> BannerResult<RasterBuffer> {
        let target = Canvas::new(width, height)
            .map_err(|e| BannerError::export(format!("invalid export size: {e}")))?;
        let frame = self
            .backend
            .render_plan(plan, assets, target)
            .map_err(|e| BannerError::export(format!("rasterize {width}x{height}: {e}")))?;

        let mut rgba8 = vec![0u8; frame.data.len()];
        flatten_to_opaque_rgba8(&mut rgba8, &frame.data, frame.premultiplied, self.background)?;

        tracing::info!(width, height, fingerprint = plan.fingerprint(), "banner exported");
        Ok(RasterBuffer {
            width: frame.width,
            height: frame.height,
            rgba8,
        })
    }

    pub fn export_profile(
        &mut self,
        plan: &BannerPlan,
        assets: &LoadedAssets,
        profile: ExportProfile,
    ) -> BannerResult<RasterBuffer> {
        let (w, h) = profile.size();
        self.export(plan, assets, w, h)
    }

    /// Encode an exported buffer into file bytes.
    pub fn encode(&self, raster: &RasterBuffer, format: ExportFormat) -> BannerResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(raster.width, raster.height, raster.rgba8.clone())
            .ok_or_else(|| BannerError::export("raster buffer length does not match its size"))?;

        let mut buf = Vec::new();
        match format {
            ExportFormat::Png => {
                image::DynamicImage::ImageRgba8(img)
                    .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                    .map_err(|e| BannerError::export(format!("png encode: {e}")))?;
            }
            ExportFormat::Jpeg { quality } => {
                let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut buf,
                    quality.clamp(1, 100),
                );
                rgb.write_with_encoder(encoder)
                    .map_err(|e| BannerError::export(format!("jpeg encode: {e}")))?;
            }
        }
        Ok(buf)
    }

    /// Export at `profile` and write the encoded image to `path`; the format follows the
    /// file extension.
    pub fn export_to_path(
        &mut self,
        plan: &BannerPlan,
        assets: &LoadedAssets,
        profile: ExportProfile,
        path: &Path,
    ) -> BannerResult<RasterBuffer> {
        let raster = self.export_profile(plan, assets, profile)?;
        let bytes = self.encode(&raster, ExportFormat::for_path(path, self.jpeg_quality))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                BannerError::export(format!("create dir '{}': {e}", parent.display()))
            })?;
        }
        std::fs::write(path, bytes)
            .map_err(|e| BannerError::export(format!("write '{}': {e}", path.display())))?;
        tracing::info!(path = %path.display(), "export written");
        Ok(raster)
    }
}

pub(crate) fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg: Rgba8,
) -> BannerResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(BannerError::export(
            "flatten expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = u16::from(bg.r);
    let bg_g = u16::from(bg.g);
    let bg_b = u16::from(bg.b);

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255 - a;
        let c = |v: u8| {
            let v = u16::from(v);
            if src_is_premul { v } else { mul_alpha(v, a) }
        };
        d[0] = (c(s[0]) + mul_alpha(bg_r, inv)).min(255) as u8;
        d[1] = (c(s[1]) + mul_alpha(bg_g, inv)).min(255) as u8;
        d[2] = (c(s[2]) + mul_alpha(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/export.rs"]
mod tests;
