//! Upload validation.
//!
//! Runs before any side effect. A rejected payload never reaches the codec,
//! the object store or the metadata store.

use crate::imaging::Format;
use crate::types::ImagePayload;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported content type '{0}'")]
    UnsupportedType(String),
    #[error("Payload is empty")]
    EmptyPayload,
    #[error("Payload is {size} bytes, above the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error("Filename is empty")]
    EmptyFilename,
    #[error("Filename is {length} characters, above the {limit} character limit")]
    FilenameTooLong { length: usize, limit: usize },
}

pub trait Validator: Sync {
    fn validate(&self, payload: &ImagePayload) -> Result<(), ValidationError>;

    /// Check a name the object will be stored under.
    fn validate_filename(&self, filename: &str) -> Result<(), ValidationError>;
}

/// Limits applied to every upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadLimits {
    /// Accepted image subtypes, matched against the `image/<subtype>` content type.
    pub accepted_types: Vec<String>,
    pub max_upload_bytes: u64,
    pub max_filename_length: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            accepted_types: ["jpeg", "jpg", "png", "webp", "gif", "avif", "tiff"]
                .map(String::from)
                .to_vec(),
            max_upload_bytes: 50 * 1024 * 1024,
            max_filename_length: 255,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadValidator {
    pub limits: UploadLimits,
}

impl UploadValidator {
    pub fn new(limits: UploadLimits) -> Self {
        Self { limits }
    }

    fn accepts(&self, content_type: &str) -> bool {
        let essence = content_type.split(';').next().unwrap_or("").trim();
        let Some((family, subtype)) = essence.split_once('/') else {
            return false;
        };
        family.eq_ignore_ascii_case("image")
            && self
                .limits
                .accepted_types
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(subtype))
    }
}

impl Validator for UploadValidator {
    fn validate(&self, payload: &ImagePayload) -> Result<(), ValidationError> {
        if !self.accepts(&payload.content_type) {
            return Err(ValidationError::UnsupportedType(payload.content_type.clone()));
        }

        let size = payload.size_bytes();
        if size == 0 {
            return Err(ValidationError::EmptyPayload);
        }
        if size > self.limits.max_upload_bytes {
            return Err(ValidationError::TooLarge {
                size,
                limit: self.limits.max_upload_bytes,
            });
        }

        self.validate_filename(&payload.filename)
    }

    fn validate_filename(&self, filename: &str) -> Result<(), ValidationError> {
        let name = filename.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyFilename);
        }
        let length = name.chars().count();
        if length > self.limits.max_filename_length {
            return Err(ValidationError::FilenameTooLong {
                length,
                limit: self.limits.max_filename_length,
            });
        }
        Ok(())
    }
}

/// Format the client claims to be sending, if it is one we know.
pub fn declared_format(payload: &ImagePayload) -> Option<Format> {
    Format::from_content_type(&payload.content_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(content_type: &str, size: usize, filename: &str) -> ImagePayload {
        ImagePayload::new(vec![7u8; size], content_type, filename)
    }

    fn check(p: &ImagePayload) -> Result<(), ValidationError> {
        UploadValidator::default().validate(p)
    }

    #[test]
    fn accepts_default_types() {
        for ct in [
            "image/jpeg",
            "image/jpg",
            "image/png",
            "image/webp",
            "image/gif",
            "image/avif",
            "image/tiff",
        ] {
            assert_eq!(check(&payload(ct, 10, "a.img")), Ok(()), "{ct}");
        }
    }

    #[test]
    fn content_type_is_case_insensitive_and_ignores_params() {
        assert_eq!(check(&payload("IMAGE/PNG", 10, "a.png")), Ok(()));
        assert_eq!(check(&payload("image/webp; charset=binary", 10, "a.webp")), Ok(()));
    }

    #[test]
    fn rejects_non_images_and_unlisted_types() {
        for ct in ["application/pdf", "image/svg+xml", "text/plain", "", "png"] {
            let err = check(&payload(ct, 10, "a")).unwrap_err();
            assert!(matches!(err, ValidationError::UnsupportedType(_)), "{ct}");
        }
    }

    #[test]
    fn rejects_empty_payload() {
        assert_eq!(check(&payload("image/png", 0, "a.png")), Err(ValidationError::EmptyPayload));
    }

    #[test]
    fn size_limit_is_inclusive() {
        let validator = UploadValidator::new(UploadLimits {
            max_upload_bytes: 100,
            ..UploadLimits::default()
        });
        assert!(validator.validate(&payload("image/png", 100, "a.png")).is_ok());
        let err = validator.validate(&payload("image/png", 101, "a.png")).unwrap_err();
        assert_eq!(err, ValidationError::TooLarge { size: 101, limit: 100 });
    }

    #[test]
    fn filename_rules() {
        assert_eq!(check(&payload("image/png", 1, "  ")), Err(ValidationError::EmptyFilename));
        assert!(check(&payload("image/png", 1, &"a".repeat(255))).is_ok());
        assert_eq!(
            check(&payload("image/png", 1, &"a".repeat(256))),
            Err(ValidationError::FilenameTooLong { length: 256, limit: 255 })
        );
    }

    #[test]
    fn filename_length_counts_characters() {
        // 255 two-byte characters are still 255 characters
        assert!(check(&payload("image/png", 1, &"é".repeat(255))).is_ok());
    }

    #[test]
    fn stored_filename_uses_same_limit() {
        let validator = UploadValidator::default();
        assert!(validator.validate_filename("a.webp").is_ok());
        assert_eq!(validator.validate_filename(""), Err(ValidationError::EmptyFilename));
        assert_eq!(
            validator.validate_filename(&"a".repeat(300)),
            Err(ValidationError::FilenameTooLong { length: 300, limit: 255 })
        );
    }

    #[test]
    fn custom_accepted_types() {
        let validator = UploadValidator::new(UploadLimits {
            accepted_types: vec!["png".into()],
            ..UploadLimits::default()
        });
        assert!(validator.validate(&payload("image/png", 1, "a.png")).is_ok());
        assert!(validator.validate(&payload("image/jpeg", 1, "a.jpg")).is_err());
    }

    #[test]
    fn declared_format_maps_content_type() {
        assert_eq!(declared_format(&payload("image/jpg", 1, "a")), Some(Format::Jpeg));
        assert_eq!(declared_format(&payload("image/bmp", 1, "a")), None);
    }
}
