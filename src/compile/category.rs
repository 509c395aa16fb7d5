use kurbo::Shape as _;

use crate::{
    compile::{
        layout::LayoutConfig,
        plan::{DrawOp, FontWeight, Layer, Shape, TextAlign},
    },
    composition::model::{BannerCategory, TextFields, present},
    foundation::core::{Affine, BezPath, Point, Rect, Rgba8},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Vector glyph drawn at the top of the category block.
pub enum Icon {
    Star,
    Burst,
    Cake,
    Heart,
    Calendar,
    Lamp,
    Quote,
    Book,
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Fixed sub-layout owned by one category.
pub struct CategoryStyle {
    pub icon: Icon,
    pub heading: &'static str,
    /// Use the full-width column (no achiever photo beside the block).
    pub wide: bool,
}

/// Per-category style. Adding a category fails to compile until it is handled here.
pub fn style_for(category: BannerCategory) -> CategoryStyle {
    let icon = match category {
        BannerCategory::Rank => Icon::Star,
        BannerCategory::Bonanza => Icon::Burst,
        BannerCategory::Birthday => Icon::Cake,
        BannerCategory::Anniversary => Icon::Heart,
        BannerCategory::Meeting => Icon::Calendar,
        BannerCategory::Festival => Icon::Lamp,
        BannerCategory::Motivational => Icon::Quote,
        BannerCategory::Story => Icon::Book,
    };
    CategoryStyle {
        icon,
        heading: category.heading(),
        wide: !category.shows_achiever_photo(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LineStyle {
    Body,
    Accent,
    Quote,
}

/// Secondary lines as `(row, text, style)`. Rows are absolute so an absent field never moves
/// the ones below it.
fn block_lines(category: BannerCategory, f: &TextFields) -> Vec<(usize, String, LineStyle)> {
    let mut lines = Vec::new();
    let mut push = |row: usize, text: Option<String>, style: LineStyle| {
        if let Some(text) = text {
            lines.push((row, text, style));
        }
    };
    let owned = |v: &Option<String>| present(v).map(str::to_string);
    let amount = present(&f.cheque_amount).map(format_amount);

    match category {
        BannerCategory::Rank => {
            push(0, owned(&f.team_city), LineStyle::Body);
            push(1, amount, LineStyle::Accent);
            push(2, owned(&f.message), LineStyle::Body);
        }
        BannerCategory::Bonanza => {
            push(
                0,
                present(&f.trip_name).map(|t| format!("Qualified for {t}")),
                LineStyle::Accent,
            );
            push(1, owned(&f.team_city), LineStyle::Body);
            push(2, amount, LineStyle::Accent);
        }
        BannerCategory::Birthday | BannerCategory::Anniversary => {
            push(0, owned(&f.message), LineStyle::Body);
            push(1, owned(&f.team_city), LineStyle::Body);
        }
        BannerCategory::Meeting => {
            push(0, owned(&f.event_title), LineStyle::Accent);
            push(1, owned(&f.event_date), LineStyle::Body);
            push(2, owned(&f.event_venue), LineStyle::Body);
            push(3, owned(&f.message), LineStyle::Body);
        }
        BannerCategory::Festival => {
            push(0, owned(&f.event_title), LineStyle::Accent);
            push(1, owned(&f.message), LineStyle::Body);
        }
        BannerCategory::Motivational => {
            push(0, present(&f.quote).map(|q| format!("\u{201c}{q}\u{201d}")), LineStyle::Quote);
            push(3, owned(&f.message), LineStyle::Body);
        }
        BannerCategory::Story => {
            push(0, owned(&f.team_city), LineStyle::Body);
            push(1, owned(&f.message), LineStyle::Body);
            push(3, present(&f.quote).map(|q| format!("\u{201c}{q}\u{201d}")), LineStyle::Quote);
        }
    }
    lines
}

/// Emit the category block. `congrats` is the already-fitted congratulations artwork, drawn
/// between the icon and the heading.
pub(crate) fn push_category_block(
    ops: &mut Vec<DrawOp>,
    category: BannerCategory,
    fields: &TextFields,
    layout: &LayoutConfig,
    congrats: Option<DrawOp>,
) {
    let style = style_for(category);
    let block = &layout.block;
    let colors = &layout.colors;
    let (cx, max_width) = if style.wide {
        (block.wide_center_x, block.wide_max_width)
    } else {
        (block.center_x, block.max_width)
    };

    ops.push(DrawOp::Fill {
        layer: Layer::CategoryBlock,
        shape: Shape::Path(icon_path(
            style.icon,
            Point::new(cx, block.icon_center_y),
            block.icon_radius,
        )),
        color: colors.accent,
        transform: Affine::IDENTITY,
    });

    if let Some(op) = congrats {
        ops.push(op);
    }

    let text = |text: String, y: f64, size: f32, color: Rgba8, weight: FontWeight| DrawOp::Text {
        layer: Layer::CategoryBlock,
        text,
        anchor: Point::new(cx, y),
        align: TextAlign::Center,
        size,
        weight,
        color,
        max_width: Some(max_width),
    };

    ops.push(text(
        style.heading.to_string(),
        block.heading_y,
        block.heading_size,
        colors.accent,
        FontWeight::Bold,
    ));

    if let Some(name) = present(&fields.user_name) {
        let (name, size) = layout.name.apply(name);
        ops.push(text(name, block.name_y, size, colors.text, FontWeight::Bold));
    }

    for (row, line, line_style) in block_lines(category, fields) {
        let y = block.first_line_y + row as f64 * block.line_gap;
        let op = match line_style {
            LineStyle::Body => text(line, y, block.line_size, colors.muted_text, FontWeight::Regular),
            LineStyle::Accent => text(line, y, block.line_size, colors.accent, FontWeight::Bold),
            LineStyle::Quote => text(line, y, block.quote_size, colors.text, FontWeight::Regular),
        };
        ops.push(op);
    }
}

/// Group the integer digits of a plain numeric amount in thousands. Anything else passes through.
pub fn format_amount(raw: &str) -> String {
    let raw = raw.trim();
    let (int, frac) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw, None),
    };
    let numeric = !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.is_none_or(|f| f.bytes().all(|b| b.is_ascii_digit()));
    if !numeric {
        return raw.to_string();
    }

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}

/// Icon outline centered on `c` and fitting inside a circle of radius `r`.
pub fn icon_path(icon: Icon, c: Point, r: f64) -> BezPath {
    match icon {
        Icon::Star => star(c, r, r * 0.45, 5),
        Icon::Burst => star(c, r, r * 0.7, 12),
        Icon::Cake => {
            let mut p = rect_path(Rect::new(c.x - r * 0.8, c.y - r * 0.1, c.x + r * 0.8, c.y + r * 0.8));
            extend(&mut p, rect_path(Rect::new(c.x - r * 0.08, c.y - r * 0.6, c.x + r * 0.08, c.y - r * 0.1)));
            extend(&mut p, kurbo::Ellipse::new((c.x, c.y - r * 0.78), (r * 0.12, r * 0.2), 0.0).to_path(0.1));
            p
        }
        Icon::Heart => heart(c, r),
        Icon::Calendar => {
            let mut p = kurbo::RoundedRect::new(c.x - r * 0.85, c.y - r * 0.65, c.x + r * 0.85, c.y + r * 0.85, r * 0.15)
                .to_path(0.1);
            for dx in [-0.45, 0.45] {
                extend(
                    &mut p,
                    rect_path(Rect::new(c.x + r * dx - r * 0.08, c.y - r * 0.95, c.x + r * dx + r * 0.08, c.y - r * 0.5)),
                );
            }
            p
        }
        Icon::Lamp => {
            let mut p = BezPath::new();
            // Bowl.
            p.move_to((c.x - r * 0.9, c.y + r * 0.2));
            p.quad_to((c.x, c.y + r * 1.1), (c.x + r * 0.9, c.y + r * 0.2));
            p.close_path();
            // Flame.
            p.move_to((c.x, c.y - r * 0.95));
            p.quad_to((c.x + r * 0.35, c.y - r * 0.35), (c.x, c.y + r * 0.1));
            p.quad_to((c.x - r * 0.35, c.y - r * 0.35), (c.x, c.y - r * 0.95));
            p.close_path();
            p
        }
        Icon::Quote => {
            let mut p = BezPath::new();
            for dx in [-0.42, 0.42] {
                let mc = Point::new(c.x + r * dx, c.y - r * 0.1);
                extend(&mut p, kurbo::Circle::new(mc, r * 0.3).to_path(0.1));
                p.move_to((mc.x + r * 0.3, mc.y));
                p.line_to((mc.x + r * 0.05, mc.y + r * 0.75));
                p.line_to((mc.x - r * 0.15, mc.y + r * 0.7));
                p.close_path();
            }
            p
        }
        Icon::Book => {
            let mut p = BezPath::new();
            for side in [-1.0, 1.0] {
                p.move_to((c.x + side * r * 0.05, c.y - r * 0.6));
                p.line_to((c.x + side * r * 0.9, c.y - r * 0.75));
                p.line_to((c.x + side * r * 0.9, c.y + r * 0.6));
                p.line_to((c.x + side * r * 0.05, c.y + r * 0.75));
                p.close_path();
            }
            p
        }
    }
}

fn rect_path(r: Rect) -> BezPath {
    r.to_path(0.1)
}

fn extend(dst: &mut BezPath, src: BezPath) {
    for el in src.elements() {
        dst.push(*el);
    }
}

fn star(c: Point, outer: f64, inner: f64, points: usize) -> BezPath {
    let mut p = BezPath::new();
    let step = std::f64::consts::PI / points as f64;
    for i in 0..points * 2 {
        let radius = if i % 2 == 0 { outer } else { inner };
        let angle = -std::f64::consts::FRAC_PI_2 + i as f64 * step;
        let pt = Point::new(c.x + radius * angle.cos(), c.y + radius * angle.sin());
        if i == 0 {
            p.move_to(pt);
        } else {
            p.line_to(pt);
        }
    }
    p.close_path();
    p
}

fn heart(c: Point, r: f64) -> BezPath {
    let mut p = BezPath::new();
    p.move_to((c.x, c.y + r * 0.85));
    p.curve_to(
        (c.x - r * 1.2, c.y + r * 0.05),
        (c.x - r * 0.75, c.y - r * 0.95),
        (c.x, c.y - r * 0.35),
    );
    p.curve_to(
        (c.x + r * 0.75, c.y - r * 0.95),
        (c.x + r * 1.2, c.y + r * 0.05),
        (c.x, c.y + r * 0.85),
    );
    p.close_path();
    p
}

#[cfg(test)]
#[path = "../../tests/unit/compile/category.rs"]
mod tests;
