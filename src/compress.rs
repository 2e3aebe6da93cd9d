//! Adaptive compression engine.
//!
//! Shrinks an arbitrary image toward a byte budget. The engine decodes once,
//! plans dimensions and format, then runs a bounded encode loop:
//!
//! ```text
//! payload ──► decode ──► plan dims ──► select format ──► resample
//!                                                           │
//!             ┌─────────── quality -0.10 (floor 0.50) ◄─────┤ over budget
//!             ▼                                             │ and < 5 encodes
//!          encode ──► measure ──► within budget? ──yes──► result
//! ```
//!
//! ## Budget semantics
//!
//! The budget (`max_size_bytes`) is a target, not a guarantee. The loop stops
//! after five encodes or when quality reaches the 0.5 floor, whichever comes
//! first, and returns the last encode even if it is still over budget.
//! Callers compare `compressed_size_bytes` with the budget and decide policy.
//!
//! ## Starting quality
//!
//! [`adjust_quality_by_strategy`] lowers the requested quality up front for
//! inputs much larger than the budget, so most images converge on the first
//! encode:
//!
//! | Strategy | > 3× budget | > 2× budget | > budget | otherwise |
//! |---|---|---|---|---|
//! | `size` | −0.20, floor 0.60 | −0.15, floor 0.65 | −0.10, floor 0.70 | unchanged |
//! | `balanced` | (as > 2×) | −0.15, floor 0.65 | −0.10, floor 0.70 | unchanged |
//! | `quality` | at least 0.75 | at least 0.75 | at least 0.75 | at least 0.75 |
//!
//! The engine is pure: no filesystem or network access, no state between calls.

use crate::imaging::{
    BackendError, Dimensions, Format, FormatPreference, ImageCodec, OutputFormat, Quality,
    RustCodec, prepare,
};
use crate::types::ImagePayload;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

/// Maximum encodes per call, including the first.
pub const MAX_ENCODE_ATTEMPTS: usize = 5;

/// Quality points removed per descent iteration.
pub const DESCENT_STEP: u32 = 10;

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Unsupported input: content type '{0}' is not an image")]
    UnsupportedInput(String),
    #[error("Decode failure: {0}")]
    DecodeFailure(#[source] BackendError),
    #[error("Encode failure: {0}")]
    EncodeFailure(#[source] BackendError),
}

/// How aggressively quality is traded for byte size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Never go below 0.75 up front.
    Quality,
    /// Drop quality hardest for oversized inputs.
    Size,
    /// Like `size`, without the > 3× tier.
    Balanced,
}

/// Everything the engine needs to know. No hidden global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionOptions {
    pub quality: Quality,
    pub max_width: u32,
    pub max_height: u32,
    pub output_format: FormatPreference,
    /// The byte budget.
    pub max_size_bytes: u64,
    pub strategy: Strategy,
    pub preserve_metadata: bool,
}

impl CompressionOptions {
    pub fn bounds(&self) -> Dimensions {
        Dimensions::new(self.max_width, self.max_height)
    }
}

/// One encode inside the descent loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub quality: Quality,
    pub size_bytes: usize,
}

/// Output of a successful compression.
///
/// `compressed_size_bytes` always equals `bytes.len()`.
/// `compression_ratio_percent` is negative when re-encoding grew the image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionResult {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub original_size_bytes: usize,
    pub compressed_size_bytes: usize,
    pub compression_ratio_percent: i64,
    pub format: OutputFormat,
    pub source_format: Format,
    pub dimensions: Dimensions,
    pub processing_time_ms: u64,
    pub quality_used: Quality,
    pub attempts: Vec<Attempt>,
}

impl CompressionResult {
    pub fn within_budget(&self, budget: u64) -> bool {
        self.compressed_size_bytes as u64 <= budget
    }
}

/// `round((1 - compressed / original) * 100)`. Zero-byte originals give 0.
pub fn compression_ratio_percent(original: usize, compressed: usize) -> i64 {
    if original == 0 {
        return 0;
    }
    ((1.0 - compressed as f64 / original as f64) * 100.0).round() as i64
}

/// Pick the starting quality for the encode loop.
///
/// The result is never below [`Quality::FLOOR`].
pub fn adjust_quality_by_strategy(
    strategy: Strategy,
    quality: Quality,
    size_bytes: u64,
    budget: u64,
) -> Quality {
    let over = |factor: u64| size_bytes > budget.saturating_mul(factor);

    let adjusted = match strategy {
        Strategy::Size if over(3) => quality.lowered(20, Quality::percent(60)),
        Strategy::Size | Strategy::Balanced if over(2) => quality.lowered(15, Quality::percent(65)),
        Strategy::Size | Strategy::Balanced if over(1) => quality.lowered(10, Quality::percent(70)),
        Strategy::Size | Strategy::Balanced => quality,
        Strategy::Quality => quality.max(Quality::percent(75)),
    };

    adjusted.max(Quality::FLOOR)
}

/// Compress with the production [`RustCodec`].
pub fn compress(
    image: &ImagePayload,
    options: &CompressionOptions,
) -> Result<CompressionResult, CompressionError> {
    compress_with_codec(&RustCodec::new(), image, options)
}

/// Compress using a specific codec (allows testing with mock).
pub fn compress_with_codec<C: ImageCodec>(
    codec: &C,
    image: &ImagePayload,
    options: &CompressionOptions,
) -> Result<CompressionResult, CompressionError> {
    if !image.declares_image() {
        return Err(CompressionError::UnsupportedInput(image.content_type.clone()));
    }

    let started = Instant::now();
    let original_size = image.bytes.len();

    let prepared = prepare(codec, &image.bytes, options.bounds(), options.output_format)
        .map_err(CompressionError::DecodeFailure)?;

    let budget = options.max_size_bytes;
    let mut quality = adjust_quality_by_strategy(
        options.strategy,
        options.quality,
        image.size_bytes(),
        budget,
    );

    let encode = |quality: Quality| {
        codec
            .encode(
                &prepared.raster,
                &prepared.params(quality, options.preserve_metadata),
            )
            .map_err(CompressionError::EncodeFailure)
    };

    let mut bytes = encode(quality)?;
    let mut attempts = vec![Attempt {
        quality,
        size_bytes: bytes.len(),
    }];
    debug!(%quality, size = bytes.len(), budget, format = %prepared.format, "encoded");

    while bytes.len() as u64 > budget
        && attempts.len() < MAX_ENCODE_ATTEMPTS
        && quality > Quality::FLOOR
    {
        quality = quality.lowered(DESCENT_STEP, Quality::FLOOR);
        bytes = encode(quality)?;
        attempts.push(Attempt {
            quality,
            size_bytes: bytes.len(),
        });
        debug!(%quality, size = bytes.len(), budget, attempt = attempts.len(), "re-encoded");
    }

    if bytes.len() as u64 > budget {
        debug!(
            size = bytes.len(),
            budget,
            attempts = attempts.len(),
            "budget not met; returning best effort"
        );
    }

    let compressed_size = bytes.len();
    Ok(CompressionResult {
        bytes,
        original_size_bytes: original_size,
        compressed_size_bytes: compressed_size,
        compression_ratio_percent: compression_ratio_percent(original_size, compressed_size),
        format: prepared.format,
        source_format: prepared.source.format,
        dimensions: prepared.target,
        processing_time_ms: started.elapsed().as_millis() as u64,
        quality_used: quality,
        attempts,
    })
}
