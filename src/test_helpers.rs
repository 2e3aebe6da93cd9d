//! Shared test utilities for the canvas-ingest test suite.
//!
//! Synthetic images are generated in memory with the `image` crate, so no
//! fixture files are needed. Patterns mix gradients with a cheap
//! deterministic noise term; flat colours would compress to nothing and
//! make size assertions meaningless.
//!
//! # Usage
//!
//! ```text
//! use crate::test_helpers::*;
//!
//! let payload = jpeg_payload(800, 600);
//! let outcome = pipeline.ingest(&payload, &UploadConfig::default());
//! assert!(outcome.success);
//! ```

use crate::types::ImagePayload;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

// =========================================================================
// Pixel patterns
// =========================================================================

/// Deterministic per-pixel noise in 0..=63.
fn noise(x: u32, y: u32) -> u8 {
    let h = x.wrapping_mul(374_761_393) ^ y.wrapping_mul(668_265_263);
    (h.wrapping_mul(1_274_126_177) >> 26) as u8
}

fn rgb_pattern(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 255 / width.max(1)) as u8).wrapping_add(noise(x, y)),
            ((y * 255 / height.max(1)) as u8).wrapping_add(noise(y, x)),
            128u8.wrapping_add(noise(x ^ y, x)),
        ])
    })
}

fn rgba_pattern(width: u32, height: u32) -> RgbaImage {
    let rgb = rgb_pattern(width, height);
    RgbaImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
        // Left half opaque, right half fading out
        let alpha = if x < width / 2 { 255 } else { 255 - (x * 200 / width.max(1)) as u8 };
        Rgba([r, g, b, alpha])
    })
}

// =========================================================================
// Encoded bytes
// =========================================================================

/// A valid JPEG of the given dimensions, encoded at quality 95.
pub fn synthetic_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = rgb_pattern(width, height);
    let mut buffer = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut buffer), 95)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buffer
}

/// A valid RGBA PNG of the given dimensions.
pub fn synthetic_png(width: u32, height: u32) -> Vec<u8> {
    let img = rgba_pattern(width, height);
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(Cursor::new(&mut buffer))
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    buffer
}

// =========================================================================
// Payloads
// =========================================================================

pub fn jpeg_payload(width: u32, height: u32) -> ImagePayload {
    ImagePayload::new(synthetic_jpeg(width, height), "image/jpeg", "photo.jpg")
}

pub fn png_payload(width: u32, height: u32) -> ImagePayload {
    ImagePayload::new(synthetic_png(width, height), "image/png", "icon.png")
}

/// Bytes that claim to be a PNG but cannot be decoded.
pub fn corrupt_png_payload() -> ImagePayload {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef].repeat(64));
    ImagePayload::new(bytes, "image/png", "broken.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_images_decode() {
        let jpeg = image::load_from_memory(&synthetic_jpeg(30, 20)).unwrap();
        assert_eq!((jpeg.width(), jpeg.height()), (30, 20));
        let png = image::load_from_memory(&synthetic_png(12, 8)).unwrap();
        assert!(png.color().has_alpha());
    }

    #[test]
    fn corrupt_payload_does_not_decode() {
        let payload = corrupt_png_payload();
        assert!(image::load_from_memory(&payload.bytes).is_err());
    }
}
