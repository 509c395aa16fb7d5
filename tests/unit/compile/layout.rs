use super::*;

#[test]
fn name_rule_tiers() {
    let rule = NameRule::default();
    assert_eq!(rule.font_size("Asha"), 54.0);
    assert_eq!(rule.font_size("Asha Kumari"), 48.0); // 11
    assert_eq!(rule.font_size("Asha Kumari Rao"), 42.0); // 15
    assert_eq!(rule.font_size("Asha Kumari Raoooooo"), 36.0); // 20
    assert_eq!(rule.font_size("Ten chars!"), 54.0); // exactly 10
}

#[test]
fn truncation_precedes_sizing() {
    let rule = NameRule::default();
    let (name, size) = rule.apply("Alexandria Patricia Smith");
    assert_eq!(name, "Alexandria Patricia ...");
    assert_eq!(name.chars().count(), 23);
    assert_eq!(size, 36.0);

    let (short, size) = rule.apply("Exactly twenty chars");
    assert_eq!(short, "Exactly twenty chars");
    assert_eq!(size, 36.0);
}

#[test]
fn truncation_counts_characters_not_bytes() {
    let rule = NameRule::default();
    let name = "ÀÉÎÕÜ".repeat(5);
    let (out, _) = rule.apply(&name);
    assert_eq!(out.chars().count(), 23);
    assert!(out.ends_with("..."));
}

#[test]
fn sticker_defaults_are_the_legacy_literals() {
    let d = StickerDefaults::default();
    assert_eq!(d.position_x, 77.0);
    assert_eq!(d.position_y, 62.0);
    assert_eq!(d.scale, 9.3);
    assert_eq!(d.rotation_deg, 0.0);
    assert_eq!(d.base_size, 145.0);
}

#[test]
fn logo_height_follows_source_aspect() {
    let layout = LayoutConfig::default();
    let wide = layout.logo_left.rect_for_aspect(2.0);
    assert_eq!(wide.width(), 220.0);
    assert_eq!(wide.height(), 110.0);
    assert_eq!(wide.x0, 40.0);

    let tall = layout.logo_right.rect_for_aspect(0.5);
    assert_eq!(tall.height(), 150.0);
    assert_eq!(tall.width(), 75.0);
    assert_eq!(tall.x1, 1310.0);
}

#[test]
fn upline_centers_are_symmetric() {
    let row = UplineRow::default();
    let c = row.centers(5);
    assert_eq!(c.len(), 5);
    assert_eq!(c[2].0, 675.0);
    assert_eq!(c[0].0 + c[4].0, 1350.0);
    assert_eq!(row.centers(1)[0].0, 675.0);
    assert!(row.centers(0).is_empty());
}

#[test]
fn midline_follows_the_canvas_size() {
    assert_eq!(CANVAS_MID_X, f64::from(LOGICAL_CANVAS_SIZE) / 2.0);
    assert_eq!(BlockLayout::default().wide_center_x, CANVAS_MID_X);
    // Logos right of the midline keep their right edge.
    let right = LogoSlot {
        x: CANVAS_MID_X + 10.0,
        y: 0.0,
        width: 100.0,
        max_height: 100.0,
    };
    assert_eq!(right.rect_for_aspect(4.0).x1, CANVAS_MID_X + 110.0);
    assert_eq!(right.rect_for_aspect(0.5).x1, CANVAS_MID_X + 110.0);
}

#[test]
fn layout_config_round_trips_through_json_with_defaults() {
    let cfg: LayoutConfig =
        serde_json::from_str(r#"{"sticker": {"position_x": 50.0}}"#).unwrap();
    assert_eq!(cfg.sticker.position_x, 50.0);
    assert_eq!(cfg.sticker.scale, 9.3);
    assert_eq!(cfg.achiever, LayoutConfig::default().achiever);
}
