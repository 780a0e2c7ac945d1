//! Scoped preprocessing copies of the frame screenshot.
//!
//! The frame buffer itself is never mutated; every transform here returns a
//! fresh image for one detection call.

use image::{ImageBuffer, Luma, Rgba, RgbaImage};

use crate::geometry::{Rect, RelativeRect};

/// Crops a pixel-coordinate region, clamped to the image bounds.
/// Degenerate regions yield an empty image.
pub fn crop_rect(img: &RgbaImage, rect: &Rect) -> RgbaImage {
    let (w, h) = img.dimensions();

    let x0 = rect.x.clamp(0, w as i32) as u32;
    let y0 = rect.y.clamp(0, h as i32) as u32;
    let x1 = rect.bottom_right().x.clamp(0, w as i32) as u32;
    let y1 = rect.bottom_right().y.clamp(0, h as i32) as u32;

    image::imageops::crop_imm(img, x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
        .to_image()
}

/// Crops a sub-region given in relative coordinates.
pub fn crop_relative(img: &RgbaImage, region: &RelativeRect) -> RgbaImage {
    let (w, h) = img.dimensions();
    crop_rect(img, &region.to_absolute(w, h))
}

/// Converts image to binary by thresholding bright pixels.
///
/// With `invert` false, pixels where R, G and B all exceed the threshold
/// become black (text) on white; with `invert` true the polarity flips,
/// for bright-on-dark label strips.
pub fn binarize(img: &RgbaImage, threshold: u8, invert: bool) -> ImageBuffer<Luma<u8>, Vec<u8>> {
    let (width, height) = img.dimensions();
    let mut output = ImageBuffer::new(width, height);

    let (hit, miss) = if invert { (255u8, 0u8) } else { (0u8, 255u8) };

    for (x, y, pixel) in img.enumerate_pixels() {
        let bright = pixel[0] > threshold && pixel[1] > threshold && pixel[2] > threshold;
        output.put_pixel(x, y, Luma([if bright { hit } else { miss }]));
    }

    output
}

/// Channel transform that lifts the population-popup text out of its
/// backdrop: red and green inverted, blue zeroed, alpha forced opaque.
pub fn emphasize_text(img: &RgbaImage) -> RgbaImage {
    let (width, height) = img.dimensions();
    let mut output = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        output.put_pixel(
            x,
            y,
            Rgba([255 - pixel[0], 255 - pixel[1], 0, 255]),
        );
    }

    output
}
