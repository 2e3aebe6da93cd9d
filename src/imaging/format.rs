//! Image formats: what we can read, what we can write, and how to choose.
//!
//! [`Format`] covers every container accepted on upload. [`OutputFormat`] is
//! the subset the pure-Rust encoders can produce. [`select_format`] resolves a
//! caller's [`FormatPreference`] against the detected source format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Any image container accepted on upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
    Avif,
    Gif,
    Tiff,
}

impl Format {
    /// Map a declared content type to a format.
    ///
    /// Matching is case-insensitive and ignores parameters such as
    /// `; charset=binary`. `image/jpg` is accepted as an alias.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::WebP),
            "image/avif" => Some(Self::Avif),
            "image/gif" => Some(Self::Gif),
            "image/tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Map a file extension (without the dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "avif" => Some(Self::Avif),
            "gif" => Some(Self::Gif),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Map a format sniffed by the `image` crate.
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::WebP => Some(Self::WebP),
            image::ImageFormat::Avif => Some(Self::Avif),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::Tiff => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Avif => "image/avif",
            Self::Gif => "image/gif",
            Self::Tiff => "image/tiff",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
        })
    }
}

/// Formats the encoders can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
    Avif,
}

impl OutputFormat {
    pub fn mime(self) -> &'static str {
        Format::from(self).mime()
    }

    pub fn extension(self) -> &'static str {
        Format::from(self).extension()
    }

    /// Whether the container can carry an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, Self::Jpeg)
    }
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Jpeg => Format::Jpeg,
            OutputFormat::Png => Format::Png,
            OutputFormat::WebP => Format::WebP,
            OutputFormat::Avif => Format::Avif,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Format::from(*self).fmt(f)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Format::from_extension(s.trim()) {
            Some(Format::Jpeg) => Ok(Self::Jpeg),
            Some(Format::Png) => Ok(Self::Png),
            Some(Format::WebP) => Ok(Self::WebP),
            Some(Format::Avif) => Ok(Self::Avif),
            _ => Err(format!("unsupported output format: {s}")),
        }
    }
}

/// What the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatPreference {
    /// Let [`select_format`] decide.
    #[default]
    Auto,
    /// Encode to exactly this format.
    #[serde(untagged)]
    Specific(OutputFormat),
}

/// The format every source resolves to under [`FormatPreference::Auto`].
///
/// WebP carries alpha and beats both PNG and JPEG on size for generated art,
/// so photographic and lossless sources alike are re-encoded to it.
pub const AUTO_TARGET: OutputFormat = OutputFormat::WebP;

/// Resolve the concrete output format.
///
/// A specific preference is returned verbatim. `Auto` maps every source,
/// lossless or lossy, to [`AUTO_TARGET`]. This is intentionally not a
/// general-purpose "best format" chooser.
pub fn select_format(source: Format, preference: FormatPreference) -> OutputFormat {
    match preference {
        FormatPreference::Specific(format) => format,
        // Exhaustive so a new input format forces a decision here
        FormatPreference::Auto => match source {
            Format::Png | Format::Gif | Format::Tiff => AUTO_TARGET,
            Format::Jpeg | Format::WebP | Format::Avif => AUTO_TARGET,
        },
    }
}
