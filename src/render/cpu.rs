use std::{collections::HashMap, sync::Arc};

use crate::{
    assets::loader::LoadedAssets,
    compile::plan::{BannerPlan, DrawOp},
    foundation::core::{Affine, BezPath, Canvas, Point, Rect, Vec2},
    foundation::error::{BannerError, BannerResult},
    render::{
        FrameRGBA, RenderBackend, RenderSettings,
        text::{TextBrush, TextLayoutEngine},
    },
};

/// Software rasterizer built on `vello_cpu`.
pub struct CpuBackend {
    settings: RenderSettings,
    image_cache: HashMap<String, vello_cpu::Image>,
    font: Option<vello_cpu::peniko::FontData>,
    text: Option<TextLayoutEngine>,
}

impl CpuBackend {
    pub fn new(settings: RenderSettings) -> Self {
        let (font, text) = match settings.font_bytes.as_deref() {
            Some(bytes) => match TextLayoutEngine::new(bytes) {
                Ok(engine) => {
                    tracing::debug!(family = engine.family_name(), "text font registered");
                    let font = vello_cpu::peniko::FontData::new(
                        vello_cpu::peniko::Blob::from(bytes.clone()),
                        0,
                    );
                    (Some(font), Some(engine))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "font bytes rejected, text will be skipped");
                    (None, None)
                }
            },
            None => (None, None),
        };
        Self {
            settings,
            image_cache: HashMap::new(),
            font,
            text,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn image_paint_for(
        &mut self,
        uri: &str,
        assets: &LoadedAssets,
    ) -> BannerResult<Option<vello_cpu::Image>> {
        if let Some(paint) = self.image_cache.get(uri) {
            return Ok(Some(paint.clone()));
        }
        let Some(img) = assets.image(uri) else {
            return Ok(None);
        };

        let pixmap =
            image_premul_bytes_to_pixmap(img.rgba8_premul.as_slice(), img.width, img.height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        self.image_cache.insert(uri.to_owned(), paint.clone());
        Ok(Some(paint))
    }
}

impl RenderBackend for CpuBackend {
    #[tracing::instrument(level = "debug", skip_all, fields(w = target.width, h = target.height, ops = plan.ops.len()))]
    fn render_plan(
        &mut self,
        plan: &BannerPlan,
        assets: &LoadedAssets,
        target: Canvas,
    ) -> BannerResult<FrameRGBA> {
        let width: u16 = target
            .width
            .try_into()
            .map_err(|_| BannerError::evaluation("surface width exceeds u16"))?;
        let height: u16 = target
            .height
            .try_into()
            .map_err(|_| BannerError::evaluation("surface height exceeds u16"))?;

        // Decoded pixmaps are only valid for the asset set they came from.
        self.image_cache.clear();

        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        let clear = self
            .settings
            .clear_rgba
            .map(|c| c.to_premul())
            .unwrap_or([0, 0, 0, 0]);
        clear_pixmap(&mut pixmap, clear);

        let scene = target.logical_to_target();
        let mut ctx = vello_cpu::RenderContext::new(width, height);
        for op in &plan.ops {
            draw_op(self, &mut ctx, op, scene, assets)?;
        }
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width: target.width,
            height: target.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, rgba: [u8; 4]) {
    let data = pixmap.data_as_u8_slice_mut();
    for px in data.chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

fn draw_op(
    backend: &mut CpuBackend,
    ctx: &mut vello_cpu::RenderContext,
    op: &DrawOp,
    scene: Affine,
    assets: &LoadedAssets,
) -> BannerResult<()> {
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

    match op {
        DrawOp::Fill {
            shape,
            color,
            transform,
            ..
        } => {
            ctx.set_transform(affine_to_cpu(scene * *transform));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                color.r, color.g, color.b, color.a,
            ));
            ctx.fill_path(&bezpath_to_cpu(&shape.to_path()));
            Ok(())
        }
        DrawOp::Image {
            uri,
            src,
            dest,
            clip,
            transform,
            ..
        } => {
            let Some(paint) = backend.image_paint_for(uri, assets)? else {
                tracing::debug!(uri = %uri, "image op without a loaded asset skipped");
                return Ok(());
            };
            if src.width() <= 0.0 || src.height() <= 0.0 || dest.area() <= 0.0 {
                return Ok(());
            }

            ctx.set_transform(affine_to_cpu(scene * *transform));
            if let Some(clip) = clip {
                ctx.push_clip_layer(&bezpath_to_cpu(&clip.to_path()));
            }
            ctx.set_paint(paint);
            ctx.set_paint_transform(affine_to_cpu(src_to_dest(*src, *dest)));
            ctx.fill_rect(&rect_to_cpu(*dest));
            if clip.is_some() {
                ctx.pop_layer();
            }
            Ok(())
        }
        DrawOp::Text {
            text,
            anchor,
            align,
            size,
            weight,
            color,
            max_width,
            ..
        } => {
            let (Some(engine), Some(font)) = (backend.text.as_mut(), backend.font.as_ref()) else {
                tracing::warn!(text = %text, "no font configured, text op skipped");
                return Ok(());
            };
            if text.trim().is_empty() {
                return Ok(());
            }

            let shaped = engine.layout_plain(
                text,
                *size,
                *weight,
                TextBrush::from(*color),
                *align,
                max_width.map(|w| w as f32),
            )?;
            let origin = Point::new(
                shaped.origin_x(anchor.x, *align),
                anchor.y - shaped.height() / 2.0,
            );
            ctx.set_transform(affine_to_cpu(
                scene * Affine::translate(origin.to_vec2()),
            ));

            for line in shaped.layout.lines() {
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };

                    let brush = run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        brush.r, brush.g, brush.b, brush.a,
                    ));

                    let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
            Ok(())
        }
    }
}

/// Paint transform placing the `src` pixel region of an image exactly over `dest`.
pub(crate) fn src_to_dest(src: Rect, dest: Rect) -> Affine {
    Affine::translate(Vec2::new(dest.x0, dest.y0))
        * Affine::scale_non_uniform(dest.width() / src.width(), dest.height() / src.height())
        * Affine::translate(Vec2::new(-src.x0, -src.y0))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> BannerResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| BannerError::evaluation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| BannerError::evaluation("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(BannerError::evaluation(
            "prepared image byte length mismatch",
        ));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
