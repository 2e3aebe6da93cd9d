//! High-level image operations.
//!
//! These functions combine calculations with codec execution. They take
//! bounds and preferences, compute the plan, and call the codec.

use super::backend::{BackendError, Dimensions, ImageCodec, SourceInfo};
use super::calculations::plan_dimensions;
use super::format::{FormatPreference, OutputFormat, select_format};
use super::params::{EncodeParams, Quality};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// A decoded image, already resampled to its planned dimensions, with the
/// output format resolved. Ready for one or more encodes.
#[derive(Debug)]
pub struct PreparedImage<R> {
    pub raster: R,
    pub source: SourceInfo,
    pub target: Dimensions,
    pub format: OutputFormat,
    pub icc_profile: Option<Vec<u8>>,
}

impl<R> PreparedImage<R> {
    /// Encode parameters at `quality`, embedding the ICC profile only when
    /// the caller asked to preserve metadata.
    pub fn params(&self, quality: Quality, preserve_metadata: bool) -> EncodeParams<'_> {
        EncodeParams {
            format: self.format,
            quality,
            icc_profile: if preserve_metadata {
                self.icc_profile.as_deref()
            } else {
                None
            },
        }
    }
}

/// Decode, plan dimensions, resolve the output format and resample.
///
/// Resampling happens once here; the encode loop reuses the raster.
pub fn prepare<C: ImageCodec>(
    codec: &C,
    bytes: &[u8],
    bounds: Dimensions,
    preference: FormatPreference,
) -> Result<PreparedImage<C::Raster>> {
    let decoded = codec.decode(bytes)?;
    let target = plan_dimensions(decoded.info.dimensions, bounds);
    let format = select_format(decoded.info.format, preference);
    let raster = codec.resample(decoded.raster, target);

    Ok(PreparedImage {
        raster,
        source: decoded.info,
        target,
        format,
        icc_profile: decoded.icc_profile,
    })
}
