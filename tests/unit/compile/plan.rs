use std::sync::Arc;

use super::*;
use crate::composition::model::{BannerCategory, CategoryTag, ImageRefs, TextFields, Upline};

fn img(w: u32, h: u32) -> PreparedImage {
    PreparedImage {
        width: w,
        height: h,
        rgba8_premul: Arc::new(vec![255; (w * h * 4) as usize]),
    }
}

fn full_refs() -> ImageRefs {
    ImageRefs {
        achiever: Some("achiever.png".into()),
        background: Some("bg.png".into()),
        mentor: Some("mentor.png".into()),
        logo_left: Some("logo-l.png".into()),
        logo_right: Some("logo-r.png".into()),
        congrats_image: Some("congrats.png".into()),
    }
}

fn all_assets() -> LoadedAssets {
    LoadedAssets::from_images([
        ("achiever.png".to_string(), Some(img(40, 50))),
        ("bg.png".to_string(), Some(img(64, 32))),
        ("mentor.png".to_string(), Some(img(30, 30))),
        ("logo-l.png".to_string(), Some(img(20, 10))),
        ("logo-r.png".to_string(), Some(img(10, 10))),
        ("congrats.png".to_string(), Some(img(48, 14))),
        ("avatar.png".to_string(), Some(img(8, 8))),
        ("sticker.png".to_string(), Some(img(10, 10))),
        ("broken.png".to_string(), None),
    ])
}

fn full_descriptor(category: BannerCategory) -> BannerDescriptor {
    let mut d = BannerDescriptor::new(category);
    d.image_refs = full_refs();
    d.text_fields = TextFields {
        user_name: Some("Asha Rao".into()),
        team_city: Some("Pune".into()),
        mobile: Some("+91 90000 00000".into()),
        profile_name: Some("Kiran".into()),
        profile_rank: Some("Diamond".into()),
        message: Some("Keep shining".into()),
        quote: Some("Dream big".into()),
        ..TextFields::default()
    };
    d.uplines = vec![
        Upline {
            id: "u1".into(),
            name: "Ravi".into(),
            avatar_uri: Some("avatar.png".into()),
        },
        Upline {
            id: "u2".into(),
            name: "Meera".into(),
            avatar_uri: None,
        },
    ];
    d.stickers = vec![StickerPlacement::new("s1", "sticker.png")];
    d
}

fn layer_of_ref(field: &str) -> Layer {
    match field {
        "achiever" => Layer::Achiever,
        "background" => Layer::BackgroundImage,
        "mentor" => Layer::Mentor,
        "logo_left" => Layer::LogoLeft,
        "logo_right" => Layer::LogoRight,
        "congrats_image" => Layer::CongratsImage,
        other => panic!("unknown field {other}"),
    }
}

fn clear_ref(refs: &mut ImageRefs, field: &str) {
    match field {
        "achiever" => refs.achiever = None,
        "background" => refs.background = None,
        "mentor" => refs.mentor = None,
        "logo_left" => refs.logo_left = None,
        "logo_right" => refs.logo_right = None,
        "congrats_image" => refs.congrats_image = None,
        other => panic!("unknown field {other}"),
    }
}

#[test]
fn z_order_is_fixed_back_to_front() {
    let plan = compose(
        &full_descriptor(BannerCategory::Rank),
        &all_assets(),
        &SlotLayers::default(),
    );
    assert_eq!(
        plan.layers(),
        vec![
            Layer::BackgroundFill,
            Layer::BackgroundImage,
            Layer::LogoLeft,
            Layer::LogoRight,
            Layer::Uplines,
            Layer::Achiever,
            Layer::CategoryBlock,
            Layer::CongratsImage,
            Layer::Mentor,
            Layer::Stickers,
            Layer::ContactBand,
        ]
    );
    // Layer tags never interleave out of order, except the congrats art nested in the block.
    let mut last = Layer::BackgroundFill;
    for op in &plan.ops {
        let l = op.layer();
        if l == Layer::CategoryBlock && last == Layer::CongratsImage {
            last = l;
            continue;
        }
        assert!(l >= last || last == Layer::CongratsImage, "{l:?} after {last:?}");
        last = l;
    }
    assert_eq!(plan.canvas, Canvas::LOGICAL);
}

#[test]
fn nulling_one_image_ref_removes_exactly_that_layer() {
    let assets = all_assets();
    for category in [BannerCategory::Rank, BannerCategory::Birthday, BannerCategory::Meeting] {
        let full = full_descriptor(category);
        let full_plan = compose(&full, &assets, &SlotLayers::default());

        for field in [
            "achiever",
            "background",
            "mentor",
            "logo_left",
            "logo_right",
            "congrats_image",
        ] {
            let layer = layer_of_ref(field);
            assert!(full_plan.has_layer(layer), "{category}: {field} present in full plan");

            let mut partial = full.clone();
            clear_ref(&mut partial.image_refs, field);
            let partial_plan = compose(&partial, &assets, &SlotLayers::default());

            let expected: Vec<DrawOp> = full_plan
                .ops
                .iter()
                .filter(|op| op.layer() != layer)
                .cloned()
                .collect();
            assert_eq!(partial_plan.ops, expected, "{category}: {field}");
        }
    }
}

#[test]
fn unresolved_image_behaves_like_an_absent_one() {
    let mut d = full_descriptor(BannerCategory::Rank);
    d.image_refs.achiever = Some("broken.png".into());
    let broken = compose(&d, &all_assets(), &SlotLayers::default());

    d.image_refs.achiever = None;
    let absent = compose(&d, &all_assets(), &SlotLayers::default());
    assert_eq!(broken, absent);
    assert!(!broken.has_layer(Layer::Achiever));
}

#[test]
fn birthday_example_truncates_then_sizes_the_name() {
    let mut d = BannerDescriptor::new(BannerCategory::Birthday);
    d.text_fields.user_name = Some("Alexandria Patricia Smith".into());
    d.image_refs.achiever = Some("achiever.png".into());
    d.image_refs.mentor = Some("mentor.png".into());

    let plan = compose(&d, &all_assets(), &SlotLayers::default());
    let name = plan
        .ops_for(Layer::CategoryBlock)
        .find_map(|op| match op {
            DrawOp::Text { text, size, .. } if text.starts_with("Alexandria") => {
                Some((text.clone(), *size))
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(name, ("Alexandria Patricia ...".to_string(), 36.0));
    assert!(plan.has_layer(Layer::Achiever));
    assert!(plan.has_layer(Layer::Mentor));
    assert!(!plan.has_layer(Layer::Stickers));
}

#[test]
fn name_tier_uses_truncated_length_for_every_input_length() {
    let layout = LayoutConfig::default();
    for len in 0..40 {
        let raw: String = "x".repeat(len);
        let mut d = BannerDescriptor::new(BannerCategory::Rank);
        d.text_fields.user_name = Some(raw.clone());
        let plan = compose(&d, &LoadedAssets::empty(), &SlotLayers::default());
        let found = plan.ops_for(Layer::CategoryBlock).find_map(|op| match op {
            DrawOp::Text { text, size, anchor, .. } if anchor.y == layout.block.name_y => {
                Some((text.clone(), *size))
            }
            _ => None,
        });
        if len == 0 {
            assert!(found.is_none());
            continue;
        }
        let (text, size) = found.unwrap();
        let expected = layout.name.truncate(&raw);
        assert_eq!(text, expected);
        assert_eq!(size, layout.name.font_size(&expected));
    }
}

#[test]
fn mentor_is_suppressed_only_for_motivational_and_story() {
    let assets = all_assets();
    for c in BannerCategory::ALL {
        let plan = compose(&full_descriptor(c), &assets, &SlotLayers::default());
        let suppressed = matches!(c, BannerCategory::Motivational | BannerCategory::Story);
        assert_eq!(plan.has_layer(Layer::Mentor), !suppressed, "{c}");
    }
}

#[test]
fn story_drops_the_achiever_photo_and_contact_band() {
    let plan = compose(
        &full_descriptor(BannerCategory::Story),
        &all_assets(),
        &SlotLayers::default(),
    );
    assert!(!plan.has_layer(Layer::Achiever));
    assert!(!plan.has_layer(Layer::ContactBand));
    assert!(plan.has_layer(Layer::CategoryBlock));
    assert!(plan.has_layer(Layer::Stickers));
}

#[test]
fn unknown_category_renders_everything_but_the_block() {
    let mut d = full_descriptor(BannerCategory::Rank);
    d.category = CategoryTag::from("graduation".to_string());
    let plan = compose(&d, &all_assets(), &SlotLayers::default());

    assert!(!plan.has_layer(Layer::CategoryBlock));
    assert!(!plan.has_layer(Layer::CongratsImage));
    for layer in [
        Layer::BackgroundImage,
        Layer::LogoLeft,
        Layer::Uplines,
        Layer::Achiever,
        Layer::Mentor,
        Layer::Stickers,
        Layer::ContactBand,
    ] {
        assert!(plan.has_layer(layer), "{layer:?}");
    }
}

#[test]
fn upline_without_avatar_keeps_its_slot_as_a_placeholder() {
    let plan = compose(
        &full_descriptor(BannerCategory::Rank),
        &all_assets(),
        &SlotLayers::default(),
    );
    let row = LayoutConfig::default().uplines;
    let centers = row.centers(2);
    let shapes: Vec<_> = plan
        .ops_for(Layer::Uplines)
        .filter(|op| !matches!(op, DrawOp::Text { .. }))
        .cloned()
        .collect();
    assert_eq!(shapes.len(), 2);
    assert!(matches!(&shapes[0], DrawOp::Image { uri, clip: Some(Shape::Circle { .. }), .. } if uri == "avatar.png"));
    match &shapes[1] {
        DrawOp::Fill {
            shape: Shape::Circle { center, radius },
            color,
            ..
        } => {
            assert_eq!((center.x, center.y), centers[1]);
            assert_eq!(*radius, row.diameter / 2.0);
            assert_eq!(*color, LayoutConfig::default().colors.placeholder);
        }
        other => panic!("expected placeholder circle, got {other:?}"),
    }
}

#[test]
fn uplines_beyond_five_are_ignored() {
    let mut d = BannerDescriptor::new(BannerCategory::Rank);
    d.uplines = (0..7)
        .map(|i| Upline {
            id: format!("u{i}"),
            name: String::new(),
            avatar_uri: None,
        })
        .collect();
    let plan = compose(&d, &LoadedAssets::empty(), &SlotLayers::default());
    assert_eq!(plan.ops_for(Layer::Uplines).count(), 5);
}

#[test]
fn sticker_defaults_place_center_at_legacy_point() {
    let d = full_descriptor(BannerCategory::Rank);
    let plan = compose(&d, &all_assets(), &SlotLayers::default());
    let op = plan.ops_for(Layer::Stickers).next().unwrap();
    let DrawOp::Image {
        dest, transform, ..
    } = op
    else {
        panic!("sticker should be an image");
    };
    let center = Point::new(0.77 * 1350.0, 0.62 * 1350.0);
    assert!((dest.center().x - center.x).abs() < 1e-9);
    assert!((dest.center().y - center.y).abs() < 1e-9);
    assert!((dest.width() - 145.0).abs() < 1e-9);
    // Scale applies around the center, so the center is a fixed point.
    let mapped = *transform * center;
    assert!((mapped - center).hypot() < 1e-9);
    let corner = *transform * Point::new(dest.x1, dest.y1);
    assert!(((corner - center).x - 72.5 * 9.3).abs() < 1e-6);
}

#[test]
fn explicit_sticker_transform_overrides_defaults() {
    let mut d = BannerDescriptor::new(BannerCategory::Rank);
    d.stickers = vec![StickerPlacement {
        position_x: Some(50.0),
        position_y: Some(10.0),
        scale: Some(1.0),
        rotation_deg: Some(90.0),
        ..StickerPlacement::new("s", "sticker.png")
    }];
    let plan = compose(&d, &all_assets(), &SlotLayers::default());
    let Some(DrawOp::Image {
        dest, transform, ..
    }) = plan.ops_for(Layer::Stickers).next()
    else {
        panic!("missing sticker");
    };
    assert_eq!(dest.center(), Point::new(675.0, 135.0));
    let p = *transform * Point::new(675.0 + 10.0, 135.0);
    assert!((p.x - 675.0).abs() < 1e-9 && (p.y - 145.0).abs() < 1e-9);
}

#[test]
fn unresolved_stickers_are_skipped_without_placeholder() {
    let mut d = BannerDescriptor::new(BannerCategory::Rank);
    d.stickers = vec![
        StickerPlacement::new("a", "broken.png"),
        StickerPlacement::new("b", "missing.png"),
    ];
    let plan = compose(&d, &all_assets(), &SlotLayers::default());
    assert!(!plan.has_layer(Layer::Stickers));
}

#[test]
fn slot_stickers_follow_descriptor_stickers_and_slot_background_is_a_fallback() {
    let mut d = full_descriptor(BannerCategory::Rank);
    let slots = SlotLayers {
        background: Some("congrats.png".into()),
        stickers: vec![StickerPlacement {
            position_x: Some(10.0),
            ..StickerPlacement::new("slot-3", "sticker.png")
        }],
    };

    let plan = compose(&d, &all_assets(), &slots);
    let bg: Vec<_> = plan.ops_for(Layer::BackgroundImage).collect();
    assert!(matches!(bg[0], DrawOp::Image { uri, .. } if uri == "bg.png"));
    let stickers: Vec<_> = plan.ops_for(Layer::Stickers).collect();
    assert_eq!(stickers.len(), 2);
    assert!(matches!(stickers[1], DrawOp::Image { dest, .. } if (dest.center().x - 135.0).abs() < 1e-9));

    d.image_refs.background = None;
    let plan = compose(&d, &all_assets(), &slots);
    let bg: Vec<_> = plan.ops_for(Layer::BackgroundImage).collect();
    assert!(matches!(bg[0], DrawOp::Image { uri, .. } if uri == "congrats.png"));
}

#[test]
fn flip_mirrors_within_the_photo_rect() {
    let mut d = full_descriptor(BannerCategory::Rank);
    d.flip_achiever = true;
    let plan = compose(&d, &all_assets(), &SlotLayers::default());
    let Some(DrawOp::Image {
        dest, transform, ..
    }) = plan.ops_for(Layer::Achiever).next()
    else {
        panic!("missing achiever");
    };
    let left = *transform * Point::new(dest.x0, dest.y0);
    assert!((left.x - dest.x1).abs() < 1e-9);
    assert!((left.y - dest.y0).abs() < 1e-9);
    // The mentor is untouched.
    let Some(DrawOp::Image { transform, .. }) = plan.ops_for(Layer::Mentor).next() else {
        panic!("missing mentor");
    };
    assert_eq!(*transform, Affine::IDENTITY);
}

#[test]
fn cover_crop_matches_destination_aspect() {
    let wide = img(200, 100);
    let src = cover_src(&wide, Rect::new(0.0, 0.0, 100.0, 100.0));
    assert_eq!(src, Rect::new(50.0, 0.0, 150.0, 100.0));

    let tall = img(100, 300);
    let src = cover_src(&tall, Rect::new(0.0, 0.0, 100.0, 50.0));
    assert_eq!(src, Rect::new(0.0, 125.0, 100.0, 175.0));

    let dest = contain_dest(&wide, Rect::new(0.0, 0.0, 100.0, 100.0));
    assert_eq!(dest, Rect::new(0.0, 25.0, 100.0, 75.0));
}

#[test]
fn compose_is_deterministic() {
    let d = full_descriptor(BannerCategory::Festival);
    let a = compose(&d, &all_assets(), &SlotLayers::default());
    let b = compose(&d, &all_assets(), &SlotLayers::default());
    assert_eq!(a, b);
    assert_eq!(a.fingerprint(), b.fingerprint());

    let mut other = d.clone();
    other.text_fields.message = Some("Different".into());
    let c = compose(&other, &all_assets(), &SlotLayers::default());
    assert_ne!(a.fingerprint(), c.fingerprint());
}

#[test]
fn contact_band_is_omitted_without_contact_fields() {
    let d = BannerDescriptor::new(BannerCategory::Rank);
    let plan = compose(&d, &LoadedAssets::empty(), &SlotLayers::default());
    assert!(!plan.has_layer(Layer::ContactBand));
    assert_eq!(plan.layers(), vec![Layer::BackgroundFill, Layer::CategoryBlock]);
}
