//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the compression engine (which decides what to encode)
//! and the [`backend`](super::backend) (which does the pixel work). This
//! separation allows swapping codecs (e.g. for testing with a mock) without
//! changing engine logic.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality as an integer percent (1–100).
//! - [`EncodeParams`]: target format, quality and optional ICC profile for one encode.

use super::format::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Quality setting for lossy image encoding, stored as a percent (1-100).
///
/// Callers usually think in fractions (`0.8`); the percent scale keeps the
/// strategy arithmetic (`-0.15`, floors at `0.65`) exact.
///
/// Serialized as the fraction. Deserialization accepts a fraction in (0, 1]
/// or a whole percent in 2-100 and rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Quality(u32);

#[derive(Error, Debug, Clone, PartialEq)]
#[error("quality must be a fraction in (0, 1] or a whole percent up to 100, got {0}")]
pub struct InvalidQuality(pub f64);

impl Quality {
    /// Lowest quality the engine will ever encode at.
    pub const FLOOR: Quality = Quality(50);
    pub const MAX: Quality = Quality(100);

    /// Build from a percent, clamped to 1-100.
    pub const fn percent(value: u32) -> Self {
        if value < 1 {
            Self(1)
        } else if value > 100 {
            Self(100)
        } else {
            Self(value)
        }
    }

    /// Build from a fraction in (0, 1], rounded to the nearest percent.
    pub fn from_fraction(value: f64) -> Self {
        if !value.is_finite() {
            return Self::MAX;
        }
        Self::percent((value * 100.0).round().max(0.0) as u32)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn as_fraction(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Lower by `points` percent, never below `floor`.
    pub fn lowered(self, points: u32, floor: Quality) -> Self {
        Self::percent(self.0.saturating_sub(points)).max(floor)
    }

    /// Quality as the `u8` the `image` encoders expect.
    pub(crate) fn as_u8(self) -> u8 {
        u8::try_from(self.0.min(100)).unwrap_or(100)
    }
}

impl TryFrom<f64> for Quality {
    type Error = InvalidQuality;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value <= 0.0 || value > 100.0 {
            return Err(InvalidQuality(value));
        }
        if value <= 1.0 {
            return Ok(Self::from_fraction(value));
        }
        if value.fract() != 0.0 {
            return Err(InvalidQuality(value));
        }
        Ok(Self::percent(value as u32))
    }
}

impl From<Quality> for f64 {
    fn from(quality: Quality) -> Self {
        quality.as_fraction()
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.as_fraction())
    }
}

/// Parameters for a single encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParams<'a> {
    pub format: OutputFormat,
    pub quality: Quality,
    /// ICC profile to embed, when the caller asked to preserve metadata.
    pub icc_profile: Option<&'a [u8]>,
}
