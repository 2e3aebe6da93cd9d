//! Pure Rust codec, no system libraries.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `ImageReader::with_guessed_format` + `into_dimensions` |
//! | Decode (JPEG, PNG, WebP, GIF, TIFF) | `image` crate (pure Rust decoders) |
//! | Resample | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at quality |
//! | Encode → WebP | RGB quantization + `WebPEncoder::new_lossless` |
//! | Encode → PNG | RGB quantization + `PngEncoder` (best compression) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//!
//! The pure-Rust WebP and PNG encoders are lossless only. Quality below 100
//! is applied by quantizing the RGB channels first, which leaves far less
//! entropy for the lossless coder while keeping alpha crisp.
//!
//! AVIF is encode-only: the `image` crate's `"avif"` feature enables rav1e
//! but not a decoder, so AVIF uploads fail to decode and the ingestion
//! pipeline stores them as-is.

use super::backend::{BackendError, Decoded, Dimensions, ImageCodec, SourceInfo};
use super::format::{Format, OutputFormat};
use super::params::EncodeParams;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageEncoder, ImageReader};
use std::io::Cursor;

/// rav1e speed preset: 1 (slowest, smallest) to 10 (fastest).
const AVIF_SPEED: u8 = 6;

/// Pure Rust codec using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Open a reader over in-memory bytes and sniff the container format.
fn open(bytes: &[u8]) -> Result<(ImageReader<Cursor<&[u8]>>, Format), BackendError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(e.to_string()))?;
    let format = reader
        .format()
        .and_then(Format::from_image_format)
        .ok_or_else(|| {
            BackendError::UnknownFormat(format!("{} bytes with no known signature", bytes.len()))
        })?;
    Ok((reader, format))
}

/// Embed an ICC profile when the encoder supports it.
///
/// Encoders without ICC support return an error we deliberately drop: the
/// image is still valid, it just falls back to sRGB.
fn attach_icc(encoder: &mut impl ImageEncoder, icc_profile: Option<&[u8]>) {
    if let Some(icc) = icc_profile {
        let _ = encoder.set_icc_profile(icc.to_vec());
    }
}

fn encode_failed(format: OutputFormat) -> impl Fn(image::ImageError) -> BackendError {
    move |e| BackendError::Encode(format!("{format}: {e}"))
}

impl ImageCodec for RustCodec {
    type Raster = DynamicImage;

    fn identify(&self, bytes: &[u8]) -> Result<SourceInfo, BackendError> {
        let (reader, format) = open(bytes)?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("{format}: {e}")))?;
        Ok(SourceInfo {
            format,
            dimensions: Dimensions { width, height },
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<Decoded<DynamicImage>, BackendError> {
        let (reader, format) = open(bytes)?;
        let mut decoder = reader
            .into_decoder()
            .map_err(|e| BackendError::Decode(format!("{format}: {e}")))?;
        // A broken profile is not worth failing the decode over
        let icc_profile = decoder.icc_profile().ok().flatten();
        let raster = DynamicImage::from_decoder(decoder)
            .map_err(|e| BackendError::Decode(format!("{format}: {e}")))?;

        Ok(Decoded {
            info: SourceInfo {
                format,
                dimensions: Dimensions {
                    width: raster.width(),
                    height: raster.height(),
                },
            },
            raster,
            icc_profile,
        })
    }

    fn resample(&self, raster: DynamicImage, target: Dimensions) -> DynamicImage {
        if raster.width() == target.width && raster.height() == target.height {
            return raster;
        }
        raster.resize_exact(target.width, target.height, FilterType::Lanczos3)
    }

    fn encode(
        &self,
        raster: &DynamicImage,
        params: &EncodeParams<'_>,
    ) -> Result<Vec<u8>, BackendError> {
        let quality = params.quality.as_u8();
        let mut buffer = Vec::new();

        match params.format {
            OutputFormat::Jpeg => {
                let rgb = raster.to_rgb8();
                let (width, height) = rgb.dimensions();
                let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), quality);
                attach_icc(&mut encoder, params.icc_profile);
                encoder
                    .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(encode_failed(params.format))?;
            }
            OutputFormat::Png => {
                let mut rgba = raster.to_rgba8();
                quantize_rgb(rgba.as_mut(), quality);
                let (width, height) = rgba.dimensions();
                let mut encoder = PngEncoder::new_with_quality(
                    Cursor::new(&mut buffer),
                    CompressionType::Best,
                    PngFilter::Adaptive,
                );
                attach_icc(&mut encoder, params.icc_profile);
                encoder
                    .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                    .map_err(encode_failed(params.format))?;
            }
            OutputFormat::WebP => {
                let mut rgba = raster.to_rgba8();
                quantize_rgb(rgba.as_mut(), quality);
                let (width, height) = rgba.dimensions();
                let mut encoder = WebPEncoder::new_lossless(Cursor::new(&mut buffer));
                attach_icc(&mut encoder, params.icc_profile);
                encoder
                    .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                    .map_err(encode_failed(params.format))?;
            }
            OutputFormat::Avif => {
                let rgba = raster.to_rgba8();
                let (width, height) = rgba.dimensions();
                let mut encoder = AvifEncoder::new_with_speed_quality(
                    Cursor::new(&mut buffer),
                    AVIF_SPEED,
                    quality,
                );
                attach_icc(&mut encoder, params.icc_profile);
                encoder
                    .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                    .map_err(encode_failed(params.format))?;
            }
        }

        Ok(buffer)
    }
}

/// Reduce each RGB channel of an RGBA buffer to a quality-dependent number of
/// levels. Alpha is left untouched. Quality 100 is a no-op.
fn quantize_rgb(data: &mut [u8], quality: u8) {
    if quality >= 100 {
        return;
    }
    let levels = levels_for_quality(quality);
    let step = 255.0 / (levels as f32 - 1.0);
    for pixel in data.chunks_exact_mut(4) {
        for channel in pixel.iter_mut().take(3) {
            let bucket = (f32::from(*channel) / step).round();
            *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Quadratic curve: fine palettes near the top, coarse ones at low quality.
fn levels_for_quality(quality: u8) -> u16 {
    if quality >= 100 {
        return 256;
    }
    let normalized = (quality as f32).clamp(1.0, 100.0) / 100.0;
    (2.0 + normalized * normalized * 254.0).round().clamp(2.0, 256.0) as u16
}
