use std::sync::{Arc, OnceLock};

use crate::{
    assets::loader::LoadedAssets,
    compile::plan::BannerPlan,
    foundation::core::{Canvas, Rgba8},
    foundation::error::{BannerError, BannerResult},
};

pub(crate) mod cpu;
pub(crate) mod export;
pub(crate) mod text;

#[derive(Clone, Debug)]
/// Rasterized frame. `premultiplied` tells how to read `data`.
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Straight-alpha RGBA8 pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        if !self.premultiplied || px[3] == 0 || px[3] == 255 {
            return Some([px[0], px[1], px[2], px[3]]);
        }
        let a = u16::from(px[3]);
        let unpremul = |c: u8| ((u16::from(c) * 255 + a / 2) / a).min(255) as u8;
        Some([unpremul(px[0]), unpremul(px[1]), unpremul(px[2]), px[3]])
    }
}

/// Backend that turns a logical plan into pixels at a target size.
pub trait RenderBackend {
    fn render_plan(
        &mut self,
        plan: &BannerPlan,
        assets: &LoadedAssets,
        target: Canvas,
    ) -> BannerResult<FrameRGBA>;
}

#[derive(Clone, Debug, Default)]
pub struct RenderSettings {
    /// Color the surface is cleared to before drawing.
    pub clear_rgba: Option<Rgba8>,
    /// Font used for every text op. Text is skipped when absent.
    pub font_bytes: Option<Arc<Vec<u8>>>,
}

/// Families tried before any generic sans-serif face.
const SANS_FALLBACKS: [&str; 6] = [
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Arial",
    "Helvetica",
    "Roboto",
];

impl RenderSettings {
    /// Read a font file for text rendering.
    pub fn with_font_file(mut self, path: &std::path::Path) -> BannerResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            BannerError::validation(format!(
                "read font '{}': {e}",
                path.display()
            ))
        })?;
        self.font_bytes = Some(Arc::new(bytes));
        Ok(self)
    }

    /// Use an installed sans-serif face when no font was given. Leaves text disabled only
    /// when the system has no usable font at all.
    pub fn with_system_font(mut self) -> Self {
        if self.font_bytes.is_none() {
            self.font_bytes = system_sans_font();
        }
        self
    }
}

/// First installed sans-serif face, loaded once per process.
pub(crate) fn system_sans_font() -> Option<Arc<Vec<u8>>> {
    static FONT: OnceLock<Option<Arc<Vec<u8>>>> = OnceLock::new();
    FONT.get_or_init(|| {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        let font = find_sans_face(&db)
            .and_then(|id| db.with_face_data(id, |data, _| Arc::new(data.to_vec())));
        match &font {
            Some(bytes) => tracing::debug!(bytes = bytes.len(), "using system sans-serif font"),
            None => tracing::warn!("no system font found; banner text will not be drawn"),
        }
        font
    })
    .clone()
}

fn find_sans_face(db: &usvg::fontdb::Database) -> Option<usvg::fontdb::ID> {
    use usvg::fontdb::{Family, Query};

    let mut families: Vec<Family<'_>> = SANS_FALLBACKS.iter().map(|&n| Family::Name(n)).collect();
    families.push(Family::SansSerif);
    let query = Query {
        families: &families,
        ..Query::default()
    };
    // Collections hold several faces; text layout registers only the first one.
    if let Some(id) = db
        .query(&query)
        .filter(|id| db.face(*id).is_some_and(|f| f.index == 0))
    {
        return Some(id);
    }

    let is_sans = |f: &usvg::fontdb::FaceInfo| {
        f.families
            .iter()
            .any(|(name, _)| name.contains("Sans") && !name.contains("Mono"))
    };
    db.faces()
        .find(|f| f.index == 0 && is_sans(f))
        .or_else(|| db.faces().find(|f| f.index == 0))
        .map(|f| f.id)
}

pub fn create_backend(settings: &RenderSettings) -> Box<dyn RenderBackend> {
    Box::new(cpu::CpuBackend::new(settings.clone()))
}
