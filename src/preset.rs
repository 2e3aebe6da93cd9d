//! Named compression presets.
//!
//! Each preset is a fixed [`CompressionOptions`] bundle. `Auto` picks one of
//! four tiers from the original byte size:
//!
//! | Preset | Quality | Bounds | Budget | Strategy |
//! |---|---|---|---|---|
//! | `gallery` | 0.80 | 1920 | 800KB | balanced |
//! | `thumbnail` | 0.70 | 400 | 100KB | size |
//! | `admin` | 0.85 | 2560 | 1500KB | quality |
//! | `auto`, > 5MB | 0.70 | 1600 | 600KB | size |
//! | `auto`, > 2MB | 0.75 | 1800 | 700KB | balanced |
//! | `auto`, > 1MB | 0.80 | 1920 | 800KB | quality |
//! | `auto`, otherwise | 0.85 | 1920 | 900KB | quality |
//!
//! Sizes are binary: 1KB = 1024 bytes, 1MB = 1024KB.

use crate::compress::{CompressionOptions, Strategy};
use crate::imaging::{FormatPreference, Quality};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;

const fn bundle(quality: u32, edge: u32, budget: u64, strategy: Strategy) -> CompressionOptions {
    CompressionOptions {
        quality: Quality::percent(quality),
        max_width: edge,
        max_height: edge,
        output_format: FormatPreference::Auto,
        max_size_bytes: budget,
        strategy,
        preserve_metadata: false,
    }
}

pub const GALLERY: CompressionOptions = bundle(80, 1920, 800 * KB, Strategy::Balanced);
pub const THUMBNAIL: CompressionOptions = bundle(70, 400, 100 * KB, Strategy::Size);
pub const ADMIN: CompressionOptions = bundle(85, 2560, 1500 * KB, Strategy::Quality);

/// `auto` tiers, largest threshold first. An original strictly larger than
/// the threshold selects the tier.
const AUTO_TIERS: [(u64, CompressionOptions); 4] = [
    (5 * MB, bundle(70, 1600, 600 * KB, Strategy::Size)),
    (2 * MB, bundle(75, 1800, 700 * KB, Strategy::Balanced)),
    (MB, bundle(80, 1920, 800 * KB, Strategy::Quality)),
    (0, bundle(85, 1920, 900 * KB, Strategy::Quality)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Auto,
    Gallery,
    Thumbnail,
    Admin,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Self::Auto, Self::Gallery, Self::Thumbnail, Self::Admin];

    /// Options for an original of `original_size_bytes`. Only `Auto` looks at
    /// the size.
    pub fn options(self, original_size_bytes: u64) -> CompressionOptions {
        match self {
            Self::Gallery => GALLERY,
            Self::Thumbnail => THUMBNAIL,
            Self::Admin => ADMIN,
            Self::Auto => AUTO_TIERS
                .iter()
                .find(|(threshold, _)| original_size_bytes > *threshold)
                .map_or(AUTO_TIERS[3].1, |(_, options)| *options),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Gallery => "gallery",
            Self::Thumbnail => "thumbnail",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown preset '{s}' (expected auto, gallery, thumbnail or admin)")
            })
    }
}
