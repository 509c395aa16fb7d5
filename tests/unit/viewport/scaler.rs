use super::*;

#[test]
fn scale_is_width_over_logical_side() {
    assert_eq!(compute_scale(1350.0), 1.0);
    assert_eq!(compute_scale(675.0), 0.5);
    assert_eq!(compute_scale(1080.0), 1080.0 / 1350.0);
    assert_eq!(compute_scale(2700.0), 2.0);
}

#[test]
fn degenerate_widths_suppress_rendering() {
    for w in [0.0, -10.0, f64::NAN, f64::INFINITY] {
        assert_eq!(compute_scale(w), 0.0, "{w}");
        let v = Viewport::new(w);
        assert!(!v.is_renderable());
        assert!(v.to_affine().is_none());
        assert!(v.backing_pixels().is_none());
        assert!(v.screen_to_logical(Point::new(1.0, 1.0)).is_none());
        assert!(v.screen_delta_to_percent(1.0, 1.0).is_none());
    }
}

#[test]
fn resize_reports_changes_and_recovers_from_zero() {
    let mut v = Viewport::new(0.0);
    assert!(v.resize(540.0));
    assert!(v.is_renderable());
    assert!(!v.resize(540.0));
    assert_eq!(v.scale(), 0.4);
    assert_eq!(v.backing_pixels(), Some(540));
    assert!(v.resize(0.0));
    assert!(!v.is_renderable());
}

#[test]
fn screen_and_logical_points_round_trip() {
    let v = Viewport::new(540.0);
    let logical = Point::new(1039.5, 837.0);
    let screen = v.logical_to_screen(logical).unwrap();
    assert!((screen.x - 415.8).abs() < 1e-9);
    let back = v.screen_to_logical(screen).unwrap();
    assert!((back - logical).hypot() < 1e-9);
}

#[test]
fn pointer_delta_maps_to_percent_of_canvas() {
    let v = Viewport::new(675.0);
    // 6.75 screen px at half scale is 13.5 logical units, 1% of the canvas.
    let (dx, dy) = v.screen_delta_to_percent(6.75, -13.5).unwrap();
    assert!((dx - 1.0).abs() < 1e-12);
    assert!((dy + 2.0).abs() < 1e-12);
}

#[test]
fn device_pixel_ratio_only_affects_backing_size() {
    let v = Viewport::new(500.0).with_device_pixel_ratio(2.0);
    assert_eq!(v.backing_pixels(), Some(1000));
    assert_eq!(v.scale(), 500.0 / 1350.0);
    let t = v.render_target();
    assert_eq!((t.logical_width, t.logical_height), (1350, 1350));
    assert_eq!(t.device_pixel_ratio, Some(2.0));
    assert_eq!(
        Viewport::new(500.0)
            .with_device_pixel_ratio(-1.0)
            .render_target()
            .device_pixel_ratio,
        None
    );
}
