use crate::{
    compile::plan::{FontWeight, TextAlign},
    foundation::core::Rgba8,
    foundation::error::{BannerError, BannerResult},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Brush carried through Parley layouts; read back per glyph run when painting.
pub(crate) struct TextBrush {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

impl From<Rgba8> for TextBrush {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// A shaped layout plus the box width its lines were aligned in.
pub(crate) struct ShapedText {
    pub(crate) layout: parley::Layout<TextBrush>,
    pub(crate) box_width: f32,
}

impl ShapedText {
    /// Left edge of the layout box for an anchor x under `align`.
    pub(crate) fn origin_x(&self, anchor_x: f64, align: TextAlign) -> f64 {
        let w = f64::from(self.box_width);
        match align {
            TextAlign::Start => anchor_x,
            TextAlign::Center => anchor_x - w / 2.0,
            TextAlign::End => anchor_x - w,
        }
    }

    pub(crate) fn height(&self) -> f64 {
        f64::from(self.layout.height())
    }
}

/// Parley contexts bound to a single registered font family.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    family_name: String,
}

impl TextLayoutEngine {
    pub(crate) fn new(font_bytes: &[u8]) -> BannerResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            BannerError::validation("no font families registered from font bytes")
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| BannerError::validation("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
        })
    }

    pub(crate) fn family_name(&self) -> &str {
        &self.family_name
    }

    /// Shape `text` and align its lines inside a box. With no `max_width` the box is as wide
    /// as the widest line, so a single line never wraps.
    pub(crate) fn layout_plain(
        &mut self,
        text: &str,
        size_px: f32,
        weight: FontWeight,
        brush: TextBrush,
        align: TextAlign,
        max_width: Option<f32>,
    ) -> BannerResult<ShapedText> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(BannerError::validation(
                "text size must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(match weight {
            FontWeight::Regular => parley::style::FontWeight::NORMAL,
            FontWeight::Bold => parley::style::FontWeight::BOLD,
        }));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        let max_width = max_width.filter(|w| w.is_finite() && *w > 0.0);
        layout.break_all_lines(max_width);
        let box_width = max_width.unwrap_or_else(|| layout.width());
        layout.align(
            Some(box_width),
            match align {
                TextAlign::Start => parley::Alignment::Start,
                TextAlign::Center => parley::Alignment::Center,
                TextAlign::End => parley::Alignment::End,
            },
            parley::AlignmentOptions::default(),
        );

        Ok(ShapedText { layout, box_width })
    }
}
