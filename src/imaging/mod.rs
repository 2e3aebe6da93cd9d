//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` |
//! | **Plan dimensions** | [`plan_dimensions`] (pure math) |
//! | **Select format** | [`select_format`] (pure lookup) |
//! | **Resample** | Lanczos3 |
//! | **Encode** | JPEG / PNG / WebP / AVIF via the `image` crate |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Format**: Format enums and the auto-format rule
//! - **Parameters**: Data structures describing encode operations
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]
//! - **Operations**: High-level functions combining calculations + codec

pub mod backend;
mod calculations;
mod format;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Decoded, Dimensions, ImageCodec, SourceInfo};
pub use calculations::plan_dimensions;
pub use format::{AUTO_TARGET, Format, FormatPreference, OutputFormat, select_format};
pub use operations::{PreparedImage, prepare};
pub use params::{EncodeParams, InvalidQuality, Quality};
pub use rust_backend::RustCodec;
