use kurbo::Shape as _;

use crate::{
    assets::{PreparedImage, loader::LoadedAssets},
    compile::{category::push_category_block, layout::LayoutConfig},
    composition::model::{BannerDescriptor, MAX_UPLINES, StickerPlacement, present},
    foundation::core::{
        Affine, BezPath, Canvas, Point, Rect, Rgba8, mirror_x_within, percent_to_logical,
        rotate_scale_about,
    },
    foundation::math::Fingerprint,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Layer tag carried by every draw op, listed back to front.
pub enum Layer {
    BackgroundFill,
    BackgroundImage,
    LogoLeft,
    LogoRight,
    Uplines,
    Achiever,
    CategoryBlock,
    CongratsImage,
    Mentor,
    Stickers,
    ContactBand,
}

#[derive(Clone, Debug, PartialEq)]
/// Fill or clip geometry in logical units.
pub enum Shape {
    Rect(Rect),
    RoundedRect { rect: Rect, radius: f64 },
    Circle { center: Point, radius: f64 },
    Path(BezPath),
}

impl Shape {
    pub fn to_path(&self) -> BezPath {
        match self {
            Shape::Rect(r) => r.to_path(0.1),
            Shape::RoundedRect { rect, radius } => {
                kurbo::RoundedRect::from_rect(*rect, *radius).to_path(0.1)
            }
            Shape::Circle { center, radius } => kurbo::Circle::new(*center, *radius).to_path(0.1),
            Shape::Path(p) => p.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextAlign {
    Start,
    Center,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Clone, Debug, PartialEq)]
/// Draw operation against the logical canvas.
pub enum DrawOp {
    Fill {
        layer: Layer,
        shape: Shape,
        color: Rgba8,
        transform: Affine,
    },
    /// Draw the `src` pixel region of `uri` into `dest`, optionally clipped, then apply
    /// `transform`. The clip lives in the same pre-transform space as `dest`.
    Image {
        layer: Layer,
        uri: String,
        src: Rect,
        dest: Rect,
        clip: Option<Shape>,
        transform: Affine,
    },
    /// Text laid out inside an optional wrap width and aligned on `anchor`. The anchor's Y is the
    /// vertical center of the laid-out block; X is its start, center or end depending on `align`.
    Text {
        layer: Layer,
        text: String,
        anchor: Point,
        align: TextAlign,
        size: f32,
        weight: FontWeight,
        color: Rgba8,
        max_width: Option<f64>,
    },
}

impl DrawOp {
    pub fn layer(&self) -> Layer {
        match self {
            DrawOp::Fill { layer, .. } | DrawOp::Image { layer, .. } | DrawOp::Text { layer, .. } => {
                *layer
            }
        }
    }

    fn write_fingerprint(&self, h: &mut Fingerprint) {
        fn rect(h: &mut Fingerprint, r: &Rect) {
            h.f64s(&[r.x0, r.y0, r.x1, r.y1]);
        }
        fn shape(h: &mut Fingerprint, s: &Shape) {
            match s {
                Shape::Rect(r) => rect(h.tag(0), r),
                Shape::RoundedRect { rect: r, radius } => {
                    rect(h.tag(1), r);
                    h.f64s(&[*radius]);
                }
                Shape::Circle { center, radius } => {
                    h.tag(2).f64s(&[center.x, center.y, *radius]);
                }
                Shape::Path(p) => {
                    h.tag(3).str(&p.to_svg());
                }
            }
        }

        h.tag(self.layer() as u8);
        match self {
            DrawOp::Fill {
                shape: s,
                color,
                transform,
                ..
            } => {
                shape(h.tag(0), s);
                h.bytes(&<[u8; 4]>::from(*color))
                    .f64s(&transform.as_coeffs());
            }
            DrawOp::Image {
                uri,
                src,
                dest,
                clip,
                transform,
                ..
            } => {
                h.tag(1).str(uri);
                rect(h, src);
                rect(h, dest);
                if let Some(c) = clip {
                    shape(h, c);
                }
                h.f64s(&transform.as_coeffs());
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
                h.tag(2)
                    .str(text)
                    .f64s(&[anchor.x, anchor.y, f64::from(*size)])
                    .tag(*align as u8)
                    .tag(*weight as u8)
                    .bytes(&<[u8; 4]>::from(*color))
                    .f64s(&[max_width.unwrap_or(-1.0)]);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Ordered draw operations for one banner, back to front, in logical units.
pub struct BannerPlan {
    pub canvas: Canvas,
    pub ops: Vec<DrawOp>,
}

impl BannerPlan {
    /// Ops tagged with `layer`, in draw order.
    pub fn ops_for(&self, layer: Layer) -> impl Iterator<Item = &DrawOp> {
        self.ops.iter().filter(move |op| op.layer() == layer)
    }

    pub fn has_layer(&self, layer: Layer) -> bool {
        self.ops_for(layer).next().is_some()
    }

    /// Distinct layers in first-appearance order.
    pub fn layers(&self) -> Vec<Layer> {
        let mut out: Vec<Layer> = Vec::new();
        for op in &self.ops {
            if !out.contains(&op.layer()) {
                out.push(op.layer());
            }
        }
        out
    }

    /// Stable hash of every op; equal plans hash equal.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fingerprint::default();
        h.u64(u64::from(self.canvas.width))
            .u64(u64::from(self.canvas.height));
        for op in &self.ops {
            op.write_fingerprint(&mut h);
        }
        h.value()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
/// Slot-derived content merged into a composition.
pub struct SlotLayers {
    /// Active background slot; used only when the descriptor names no background.
    pub background: Option<String>,
    /// Active sticker slots, drawn after the descriptor's own stickers.
    pub stickers: Vec<StickerPlacement>,
}

impl SlotLayers {
    pub fn stickers(stickers: Vec<StickerPlacement>) -> Self {
        Self {
            background: None,
            stickers,
        }
    }
}

/// Compose with the default layout.
pub fn compose(
    descriptor: &BannerDescriptor,
    assets: &LoadedAssets,
    slots: &SlotLayers,
) -> BannerPlan {
    Composer::default().compose(descriptor, assets, slots)
}

#[derive(Clone, Debug, Default)]
/// Pure layout stage. Never fails: a missing or unresolved input omits its element.
pub struct Composer {
    pub layout: LayoutConfig,
}

impl Composer {
    pub fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(category = descriptor.category.as_str()))]
    pub fn compose(
        &self,
        descriptor: &BannerDescriptor,
        assets: &LoadedAssets,
        slots: &SlotLayers,
    ) -> BannerPlan {
        let layout = &self.layout;
        let refs = &descriptor.image_refs;
        let category = descriptor.category.known();
        let mut ops = Vec::new();

        ops.push(DrawOp::Fill {
            layer: Layer::BackgroundFill,
            shape: Shape::Rect(Canvas::LOGICAL.bounds()),
            color: layout.colors.background,
            transform: Affine::IDENTITY,
        });

        let background = present(&refs.background).or(slots.background.as_deref());
        if let Some((uri, img)) = resolve(assets, background) {
            let dest = Canvas::LOGICAL.bounds();
            ops.push(DrawOp::Image {
                layer: Layer::BackgroundImage,
                uri: uri.to_string(),
                src: cover_src(img, dest),
                dest,
                clip: None,
                transform: Affine::IDENTITY,
            });
        }

        for (layer, slot, uri) in [
            (Layer::LogoLeft, &layout.logo_left, &refs.logo_left),
            (Layer::LogoRight, &layout.logo_right, &refs.logo_right),
        ] {
            if let Some((uri, img)) = resolve(assets, present(uri)) {
                ops.push(DrawOp::Image {
                    layer,
                    uri: uri.to_string(),
                    src: full_src(img),
                    dest: slot.rect_for_aspect(img.aspect()),
                    clip: None,
                    transform: Affine::IDENTITY,
                });
            }
        }

        self.push_uplines(&mut ops, descriptor, assets);

        let shows_photo = category.is_none_or(|c| c.shows_achiever_photo());
        if shows_photo {
            let slot = &layout.achiever;
            if let Some(op) = photo_op(
                Layer::Achiever,
                assets,
                present(&refs.achiever),
                slot.rect,
                slot.corner_radius,
                descriptor.flip_achiever,
            ) {
                ops.push(op);
            }
        }

        match category {
            Some(category) => {
                let congrats = resolve(assets, present(&refs.congrats_image)).map(|(uri, img)| {
                    let dest = contain_dest(img, layout.block.congrats_rect);
                    DrawOp::Image {
                        layer: Layer::CongratsImage,
                        uri: uri.to_string(),
                        src: full_src(img),
                        dest,
                        clip: None,
                        transform: Affine::IDENTITY,
                    }
                });
                push_category_block(&mut ops, category, &descriptor.text_fields, layout, congrats);
            }
            None => tracing::warn!(
                category = descriptor.category.as_str(),
                "unrecognized category; category block omitted"
            ),
        }

        let shows_mentor = category.is_none_or(|c| !c.suppresses_mentor());
        if shows_mentor {
            let slot = &layout.mentor;
            if let Some(op) = photo_op(
                Layer::Mentor,
                assets,
                present(&refs.mentor),
                slot.rect,
                slot.corner_radius,
                descriptor.flip_mentor,
            ) {
                ops.push(op);
            }
        }

        for sticker in descriptor.stickers.iter().chain(&slots.stickers) {
            if let Some(op) = self.sticker_op(sticker, assets) {
                ops.push(op);
            }
        }

        if category.is_none_or(|c| c.shows_contact_band()) {
            self.push_contact_band(&mut ops, descriptor);
        }

        tracing::debug!(ops = ops.len(), "composed banner");
        BannerPlan {
            canvas: Canvas::LOGICAL,
            ops,
        }
    }

    fn push_uplines(
        &self,
        ops: &mut Vec<DrawOp>,
        descriptor: &BannerDescriptor,
        assets: &LoadedAssets,
    ) {
        let row = &self.layout.uplines;
        let uplines = &descriptor.uplines[..descriptor.uplines.len().min(MAX_UPLINES)];
        let radius = row.diameter / 2.0;

        for (upline, (x, y)) in uplines.iter().zip(row.centers(uplines.len())) {
            let center = Point::new(x, y);
            let clip = Shape::Circle { center, radius };
            match resolve(assets, present(&upline.avatar_uri)) {
                Some((uri, img)) => {
                    let dest = Rect::from_center_size(center, (row.diameter, row.diameter));
                    ops.push(DrawOp::Image {
                        layer: Layer::Uplines,
                        uri: uri.to_string(),
                        src: cover_src(img, dest),
                        dest,
                        clip: Some(clip),
                        transform: Affine::IDENTITY,
                    });
                }
                None => ops.push(DrawOp::Fill {
                    layer: Layer::Uplines,
                    shape: clip,
                    color: self.layout.colors.placeholder,
                    transform: Affine::IDENTITY,
                }),
            }

            let name = upline.name.trim();
            if !name.is_empty() {
                ops.push(DrawOp::Text {
                    layer: Layer::Uplines,
                    text: name.to_string(),
                    anchor: Point::new(x, y + row.name_offset_y),
                    align: TextAlign::Center,
                    size: row.name_size,
                    weight: FontWeight::Regular,
                    color: self.layout.colors.text,
                    max_width: Some(row.spacing - 8.0),
                });
            }
        }
    }

    fn sticker_op(&self, sticker: &StickerPlacement, assets: &LoadedAssets) -> Option<DrawOp> {
        let (uri, img) = resolve(assets, Some(sticker.image_uri.as_str()))?;
        let d = &self.layout.sticker;
        let x = sticker.position_x.unwrap_or(d.position_x);
        let y = sticker.position_y.unwrap_or(d.position_y);
        let scale = sticker.scale.unwrap_or(d.scale);
        let rotation = sticker.rotation_deg.unwrap_or(d.rotation_deg);
        if ![x, y, scale, rotation].iter().all(|v| v.is_finite()) {
            tracing::warn!(id = %sticker.id, "non-finite sticker transform; skipped");
            return None;
        }

        let center = Point::new(percent_to_logical(x), percent_to_logical(y));
        let square = Rect::from_center_size(center, (d.base_size, d.base_size));
        Some(DrawOp::Image {
            layer: Layer::Stickers,
            uri: uri.to_string(),
            src: full_src(img),
            dest: contain_dest(img, square),
            clip: None,
            transform: rotate_scale_about(center, rotation, scale),
        })
    }

    fn push_contact_band(&self, ops: &mut Vec<DrawOp>, descriptor: &BannerDescriptor) {
        let band = &self.layout.band;
        let colors = &self.layout.colors;
        let f = &descriptor.text_fields;
        let mobile = present(&f.mobile);
        let profile_name = present(&f.profile_name);
        let profile_rank = present(&f.profile_rank);
        if mobile.is_none() && profile_name.is_none() && profile_rank.is_none() {
            return;
        }

        ops.push(DrawOp::Fill {
            layer: Layer::ContactBand,
            shape: Shape::Rect(band.rect),
            color: colors.band,
            transform: Affine::IDENTITY,
        });

        let mid_y = band.rect.center().y;
        let third = band.rect.height() / 5.0;
        if let Some(mobile) = mobile {
            ops.push(DrawOp::Text {
                layer: Layer::ContactBand,
                text: mobile.to_string(),
                anchor: Point::new(band.rect.x0 + band.padding_x, mid_y),
                align: TextAlign::Start,
                size: band.mobile_size,
                weight: FontWeight::Bold,
                color: colors.text,
                max_width: None,
            });
        }
        let right = band.rect.x1 - band.padding_x;
        if let Some(name) = profile_name {
            ops.push(DrawOp::Text {
                layer: Layer::ContactBand,
                text: name.to_string(),
                anchor: Point::new(right, mid_y - third),
                align: TextAlign::End,
                size: band.profile_name_size,
                weight: FontWeight::Bold,
                color: colors.text,
                max_width: None,
            });
        }
        if let Some(rank) = profile_rank {
            ops.push(DrawOp::Text {
                layer: Layer::ContactBand,
                text: rank.to_string(),
                anchor: Point::new(right, mid_y + third),
                align: TextAlign::End,
                size: band.profile_rank_size,
                weight: FontWeight::Regular,
                color: colors.accent,
                max_width: None,
            });
        }
    }
}

fn resolve<'a>(
    assets: &'a LoadedAssets,
    uri: Option<&'a str>,
) -> Option<(&'a str, &'a PreparedImage)> {
    let uri = uri?;
    let img = assets.image(uri)?;
    (img.width > 0 && img.height > 0).then_some((uri, img))
}

fn photo_op(
    layer: Layer,
    assets: &LoadedAssets,
    uri: Option<&str>,
    rect: Rect,
    radius: f64,
    flip: bool,
) -> Option<DrawOp> {
    let (uri, img) = resolve(assets, uri)?;
    Some(DrawOp::Image {
        layer,
        uri: uri.to_string(),
        src: cover_src(img, rect),
        dest: rect,
        clip: Some(Shape::RoundedRect { rect, radius }),
        transform: if flip {
            mirror_x_within(rect)
        } else {
            Affine::IDENTITY
        },
    })
}

fn full_src(img: &PreparedImage) -> Rect {
    Rect::new(0.0, 0.0, f64::from(img.width), f64::from(img.height))
}

/// Centered source crop with the aspect ratio of `dest`.
pub fn cover_src(img: &PreparedImage, dest: Rect) -> Rect {
    let (w, h) = (f64::from(img.width), f64::from(img.height));
    let dest_aspect = dest.width() / dest.height().max(f64::EPSILON);
    if w / h > dest_aspect {
        let cw = h * dest_aspect;
        let x0 = (w - cw) / 2.0;
        Rect::new(x0, 0.0, x0 + cw, h)
    } else {
        let ch = w / dest_aspect;
        let y0 = (h - ch) / 2.0;
        Rect::new(0.0, y0, w, y0 + ch)
    }
}

/// Largest rect with the image's aspect that fits centered in `bounds`.
pub fn contain_dest(img: &PreparedImage, bounds: Rect) -> Rect {
    let aspect = img.aspect();
    let (bw, bh) = (bounds.width(), bounds.height());
    let (w, h) = if bw / bh.max(f64::EPSILON) > aspect {
        (bh * aspect, bh)
    } else {
        (bw, bw / aspect)
    };
    Rect::from_center_size(bounds.center(), (w, h))
}

#[cfg(test)]
#[path = "../../tests/unit/compile/plan.rs"]
mod tests;
