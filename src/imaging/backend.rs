//! Image codec trait and shared types.
//!
//! The [`ImageCodec`] trait defines the four operations the compression
//! engine needs: identify, decode, resample, and encode. Everything works on
//! in-memory buffers; codecs never touch the filesystem or network.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), pure Rust and statically
//! linked. Tests use the mock in this module's `tests` submodule, which
//! records operations and produces deterministic sizes.

use super::format::Format;
use super::params::EncodeParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Unrecognized image data: {0}")]
    UnknownFormat(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn long_edge(self) -> u32 {
        self.width.max(self.height)
    }
}

/// Result of an identify operation: what the bytes are, and how big.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub format: Format,
    pub dimensions: Dimensions,
}

/// A decoded image plus what we learned about its source.
#[derive(Debug, Clone)]
pub struct Decoded<R> {
    pub raster: R,
    pub info: SourceInfo,
    /// Embedded ICC colour profile, if the source carried one.
    pub icc_profile: Option<Vec<u8>>,
}

/// Trait for image codecs.
///
/// `Raster` is the codec's in-memory pixel representation. It is owned by a
/// single `compress` call and dropped when that call returns, on every path.
pub trait ImageCodec: Sync {
    type Raster: Send;

    /// Sniff format and dimensions without a full decode.
    fn identify(&self, bytes: &[u8]) -> Result<SourceInfo, BackendError>;

    /// Decode the payload into pixels.
    fn decode(&self, bytes: &[u8]) -> Result<Decoded<Self::Raster>, BackendError>;

    /// Resample to exact target dimensions.
    fn resample(&self, raster: Self::Raster, target: Dimensions) -> Self::Raster;

    /// Encode pixels to the requested format and quality.
    fn encode(
        &self,
        raster: &Self::Raster,
        params: &EncodeParams<'_>,
    ) -> Result<Vec<u8>, BackendError>;
}
