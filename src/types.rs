//! Shared types used across the compression engine and ingestion pipeline.

/// An uploaded image: raw bytes plus what the client declared about them.
///
/// Immutable once received. The pipeline borrows it for the duration of one
/// call and never retains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    /// Declared MIME type, e.g. `image/png`.
    pub content_type: String,
    /// Declared filename from the client.
    pub filename: String,
}

impl ImagePayload {
    pub fn new(
        bytes: Vec<u8>,
        content_type: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            filename: filename.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether the declared content type is in the `image/*` family.
    pub fn declares_image(&self) -> bool {
        self.content_type
            .trim_start()
            .get(..6)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
    }
}
