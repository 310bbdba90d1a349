//! Black-border trimming

use image::{DynamicImage, RgbImage, imageops};

/// Bounding box `(x, y, width, height)` of every pixel with a non-zero RGB channel
///
/// `None` when the image is entirely black (or empty).
#[must_use]
pub fn content_bounds(rgb: &RgbImage) -> Option<(u32, u32, u32, u32)> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, pixel) in rgb.enumerate_pixels() {
        if pixel.0.iter().any(|&c| c > 0) {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    found.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Trim uniform black borders
///
/// The image is converted to RGB first. An all-black image is returned
/// unchanged (as RGB).
#[must_use]
pub fn autocrop(image: &DynamicImage) -> DynamicImage {
    let rgb = image.to_rgb8();
    match content_bounds(&rgb) {
        Some((x, y, w, h)) if (w, h) != rgb.dimensions() => {
            DynamicImage::ImageRgb8(imageops::crop_imm(&rgb, x, y, w, h).to_image())
        }
        _ => DynamicImage::ImageRgb8(rgb),
    }
}
