use std::io::Cursor;

use super::*;

fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let prepared = decode_image(&png_bytes(1, 1, [100, 50, 200, 128])).unwrap();
    assert_eq!(prepared.width, 1);
    assert_eq!(prepared.height, 1);
    assert_eq!(
        prepared.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn decode_rejects_garbage() {
    assert!(decode_image(b"definitely not an image").is_err());
    assert!(decode_image(&[]).is_err());
}

#[test]
fn svg_bytes_are_rasterized_at_intrinsic_size() {
    let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="4">
        <rect x="0" y="0" width="8" height="4" fill="#ff0000"/>
    </svg>"##;
    let prepared = decode_image(svg).unwrap();
    assert_eq!((prepared.width, prepared.height), (8, 4));
    assert_eq!(&prepared.rgba8_premul[0..4], &[255, 0, 0, 255]);
}

#[test]
fn malformed_svg_is_an_error() {
    assert!(decode_image(b"<svg").is_err());
}

#[test]
fn svg_with_multibyte_text_across_the_sniff_window_is_detected() {
    let mut svg = String::from(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="4"><!--"##,
    );
    while svg.len() < 511 {
        svg.push('a');
    }
    // Two bytes: 511 and 512.
    svg.push('é');
    svg.push_str(r##"--><rect x="0" y="0" width="8" height="4" fill="#00ff00"/></svg>"##);
    assert!(!svg.is_char_boundary(512));

    let prepared = decode_image(svg.as_bytes()).unwrap();
    assert_eq!((prepared.width, prepared.height), (8, 4));
    assert_eq!(&prepared.rgba8_premul[0..4], &[0, 255, 0, 255]);
}
