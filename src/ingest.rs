//! Ingestion pipeline: one upload call, end to end.
//!
//! ```text
//! validate ──► compress? ──► derive key ──► store ──► persist? ──► outcome
//!    │            │                           │          │
//!    ✗ reject     ✗ fall back to original     ✗ fail     ✗ fail, object kept
//! ```
//!
//! Steps run strictly in that order. The two optional steps are decided up
//! front by [`UploadConfig::plan`], so the flow itself is one straight line.
//!
//! ## Failure contract
//!
//! | Step | On failure | Side effects left behind |
//! |---|---|---|
//! | validate | `success: false` with the validation code | none |
//! | compress | logged, original bytes stored instead | none |
//! | derive key | `success: false`, `INVALID_FILENAME` when the name is too long | none |
//! | store | `success: false`, `STORAGE_FAILED` | none |
//! | persist | `success: false`, `METADATA_FAILED` with the stored key | the stored object |
//!
//! A metadata failure never deletes the stored object. The error carries the
//! orphaned `storageKey` and `publicUrl` so an operator can register or
//! remove it later.
//!
//! ## Concurrency
//!
//! A [`Pipeline`] holds no per-call state. [`Pipeline::ingest`] can be called
//! from any number of threads; [`Pipeline::ingest_batch`] does so with rayon.
//! Each call gets a fresh request id, carried on its tracing span.

use crate::compress::{CompressionResult, compress_with_codec};
use crate::imaging::{Dimensions, Format, ImageCodec};
use crate::metadata::{DbError, ImageRecord, MetadataStore, RecordId, Visibility};
use crate::naming::{resolve_filename, storage_key};
use crate::preset::Preset;
use crate::storage::{ObjectStore, StoreError};
use crate::types::ImagePayload;
use crate::validate::{ValidationError, Validator, declared_format};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

// ============================================================================
// Configuration
// ============================================================================

/// Per-call upload settings. Supplied fresh for every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadConfig {
    /// Storage path prefix, e.g. `uploads/gallery`.
    pub path: String,
    /// Preferred filename. Its stem is kept and tagged to stay unique; the
    /// extension becomes the stored format's.
    pub filename: Option<String>,
    pub enable_compression: bool,
    pub compression_strategy: Preset,
    pub save_to_database: bool,
    pub visibility: Visibility,
    pub owner_id: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: "uploads".to_string(),
            filename: None,
            enable_compression: true,
            compression_strategy: Preset::Auto,
            save_to_database: true,
            visibility: Visibility::Public,
            owner_id: None,
            metadata: BTreeMap::new(),
        }
    }
}

/// Whether an optional step runs, and with what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T = ()> {
    Run(T),
    Skip,
}

impl<T> Step<T> {
    fn when(enabled: bool, value: T) -> Self {
        if enabled { Step::Run(value) } else { Step::Skip }
    }
}

/// The optional steps of one call, resolved before anything runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelinePlan {
    pub compress: Step<Preset>,
    pub persist: Step,
}

impl UploadConfig {
    pub fn plan(&self) -> PipelinePlan {
        PipelinePlan {
            compress: Step::when(self.enable_compression, self.compression_strategy),
            persist: Step::when(self.save_to_database, ()),
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidFileType,
    EmptyFile,
    FileTooLarge,
    InvalidFilename,
    StorageFailed,
    MetadataFailed,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidFileType => "INVALID_FILE_TYPE",
            Self::EmptyFile => "EMPTY_FILE",
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::InvalidFilename => "INVALID_FILENAME",
            Self::StorageFailed => "STORAGE_FAILED",
            Self::MetadataFailed => "METADATA_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ValidationError> for ErrorCode {
    fn from(error: &ValidationError) -> Self {
        match error {
            ValidationError::UnsupportedType(_) => Self::InvalidFileType,
            ValidationError::EmptyPayload => Self::EmptyFile,
            ValidationError::TooLarge { .. } => Self::FileTooLarge,
            ValidationError::EmptyFilename | ValidationError::FilenameTooLong { .. } => {
                Self::InvalidFilename
            }
        }
    }
}

/// What a successful call stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    pub storage_key: String,
    pub public_url: String,
    pub original_size_bytes: u64,
    pub compressed_size_bytes: u64,
    pub compression_ratio_percent: i64,
    pub format: Option<Format>,
    pub dimensions: Option<Dimensions>,
    /// False when compression was skipped or fell back to the original.
    pub compressed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadError {
    pub code: ErrorCode,
    pub message: String,
    /// Key of an object stored before the call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

/// The verdict of one call. Always definite: success or failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<UploadData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<UploadError>,
}

impl UploadOutcome {
    fn succeeded(data: UploadData) -> Self {
        let message = if data.compressed {
            format!(
                "Image uploaded and compressed by {}%",
                data.compression_ratio_percent
            )
        } else {
            "Image uploaded".to_string()
        };
        Self {
            success: true,
            message,
            data: Some(data),
            error: None,
        }
    }

    fn failed(error: &IngestError) -> Self {
        let (storage_key, public_url) = match error {
            IngestError::Metadata {
                storage_key,
                public_url,
                ..
            } => (Some(storage_key.clone()), Some(public_url.clone())),
            _ => (None, None),
        };
        Self {
            success: false,
            message: error.summary().to_string(),
            data: None,
            error: Some(UploadError {
                code: error.code(),
                message: error.to_string(),
                storage_key,
                public_url,
            }),
        }
    }
}

/// Hard failures of a call. Compression failures are not here: they
/// downgrade to storing the original.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Storing '{storage_key}' failed: {source}")]
    Storage {
        storage_key: String,
        #[source]
        source: StoreError,
    },
    #[error("Recording '{storage_key}' failed, object left in storage: {source}")]
    Metadata {
        storage_key: String,
        public_url: String,
        #[source]
        source: DbError,
    },
}

impl IngestError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(e) => ErrorCode::from(e),
            Self::Storage { .. } => ErrorCode::StorageFailed,
            Self::Metadata { .. } => ErrorCode::MetadataFailed,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Upload rejected",
            Self::Storage { .. } => "Upload failed",
            Self::Metadata { .. } => "Upload stored but not recorded",
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Bytes chosen for storage, and what is known about them.
struct Artifact<'a> {
    bytes: Cow<'a, [u8]>,
    original_size: u64,
    ratio: i64,
    format: Option<Format>,
    dimensions: Option<Dimensions>,
    compressed: bool,
}

impl Artifact<'_> {
    fn content_type<'p>(&self, payload: &'p ImagePayload) -> &'p str {
        self.format.map_or(payload.content_type.as_str(), |f| f.mime())
    }

    fn extension(&self, payload: &ImagePayload) -> String {
        if let Some(format) = self.format {
            return format.extension().to_string();
        }
        payload
            .filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string())
    }
}

impl From<CompressionResult> for Artifact<'static> {
    fn from(result: CompressionResult) -> Self {
        Self {
            original_size: result.original_size_bytes as u64,
            ratio: result.compression_ratio_percent,
            format: Some(result.format.into()),
            dimensions: Some(result.dimensions),
            compressed: true,
            bytes: Cow::Owned(result.bytes),
        }
    }
}

/// The ingestion pipeline over its four collaborators.
pub struct Pipeline<C, V, S, M> {
    pub codec: C,
    pub validator: V,
    pub store: S,
    pub records: M,
}

impl<C, V, S, M> Pipeline<C, V, S, M>
where
    C: ImageCodec,
    V: Validator,
    S: ObjectStore,
    M: MetadataStore,
{
    pub fn new(codec: C, validator: V, store: S, records: M) -> Self {
        Self {
            codec,
            validator,
            store,
            records,
        }
    }

    /// Run one upload to completion.
    pub fn ingest(&self, payload: &ImagePayload, config: &UploadConfig) -> UploadOutcome {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("ingest", %request_id, filename = %payload.filename);
        let _enter = span.enter();

        match self.run(payload, config) {
            Ok(data) => {
                info!(
                    key = %data.storage_key,
                    original = data.original_size_bytes,
                    stored = data.compressed_size_bytes,
                    "upload complete"
                );
                UploadOutcome::succeeded(data)
            }
            Err(e) => {
                if let IngestError::Validation(ref reason) = e {
                    info!(%reason, "upload rejected");
                }
                UploadOutcome::failed(&e)
            }
        }
    }

    /// Run independent uploads in parallel. Outcomes keep input order.
    pub fn ingest_batch(&self, items: &[(ImagePayload, UploadConfig)]) -> Vec<UploadOutcome> {
        items
            .par_iter()
            .map(|(payload, config)| self.ingest(payload, config))
            .collect()
    }

    fn run(&self, payload: &ImagePayload, config: &UploadConfig) -> Result<UploadData, IngestError> {
        let plan = config.plan();

        self.validator.validate(payload)?;

        let artifact = match plan.compress {
            Step::Run(preset) => self.compress(payload, preset),
            Step::Skip => self.original(payload),
        };

        let filename = resolve_filename(config.filename.as_deref(), &artifact.extension(payload));
        self.validator.validate_filename(&filename)?;
        let key = storage_key(&config.path, &filename);

        let put = self
            .store
            .put(&key, &artifact.bytes, artifact.content_type(payload))
            .map_err(|source| {
                error!(key = %key, error = %source, "object store write failed");
                IngestError::Storage {
                    storage_key: key.clone(),
                    source,
                }
            })?;

        let mut data = UploadData {
            record_id: None,
            storage_key: key,
            public_url: put.url,
            original_size_bytes: artifact.original_size,
            compressed_size_bytes: put.size_bytes,
            compression_ratio_percent: artifact.ratio,
            format: artifact.format,
            dimensions: artifact.dimensions,
            compressed: artifact.compressed,
        };

        if let Step::Run(()) = plan.persist {
            let record = ImageRecord {
                storage_key: data.storage_key.clone(),
                public_url: data.public_url.clone(),
                original_size_bytes: data.original_size_bytes,
                compressed_size_bytes: data.compressed_size_bytes,
                compression_ratio_percent: data.compression_ratio_percent,
                format: data.format,
                dimensions: data.dimensions,
                owner_id: config.owner_id.clone(),
                visibility: config.visibility,
                metadata: config.metadata.clone(),
                content_hash: put.sha256,
                created_at_ms: unix_millis(),
            };
            let id = self.records.insert(&record).map_err(|source| {
                error!(
                    key = %data.storage_key,
                    url = %data.public_url,
                    error = %source,
                    "metadata insert failed; stored object is now orphaned"
                );
                IngestError::Metadata {
                    storage_key: data.storage_key.clone(),
                    public_url: data.public_url.clone(),
                    source,
                }
            })?;
            data.record_id = Some(id);
        }

        Ok(data)
    }

    fn compress<'p>(&self, payload: &'p ImagePayload, preset: Preset) -> Artifact<'p> {
        let options = preset.options(payload.size_bytes());
        match compress_with_codec(&self.codec, payload, &options) {
            Ok(result) => {
                debug!(
                    %preset,
                    format = %result.format,
                    quality = %result.quality_used,
                    attempts = result.attempts.len(),
                    ratio = result.compression_ratio_percent,
                    ms = result.processing_time_ms,
                    "compressed"
                );
                result.into()
            }
            Err(e) => {
                warn!(%preset, error = %e, "compression failed; storing original");
                self.original(payload)
            }
        }
    }

    /// The payload as received. Format and dimensions come from the codec
    /// when it can read the header, else from the declared content type.
    fn original<'p>(&self, payload: &'p ImagePayload) -> Artifact<'p> {
        let info = self.codec.identify(&payload.bytes).ok();
        Artifact {
            bytes: Cow::Borrowed(&payload.bytes),
            original_size: payload.size_bytes(),
            ratio: 0,
            format: info.map(|i| i.format).or_else(|| declared_format(payload)),
            dimensions: info.map(|i| i.dimensions),
            compressed: false,
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockCodec, RecordedOp};
    use crate::imaging::RustCodec;
    use crate::metadata::MemoryMetadataStore;
    use crate::metadata::tests::RejectingMetadataStore;
    use crate::storage::MemoryObjectStore;
    use crate::storage::tests::UnreachableStore;
    use crate::test_helpers::{corrupt_png_payload, jpeg_payload, png_payload};
    use crate::validate::UploadValidator;

    type MemPipeline<C> = Pipeline<C, UploadValidator, MemoryObjectStore, MemoryMetadataStore>;

    fn pipeline<C: ImageCodec>(codec: C) -> MemPipeline<C> {
        Pipeline::new(
            codec,
            UploadValidator::default(),
            MemoryObjectStore::new("https://cdn.test"),
            MemoryMetadataStore::new(),
        )
    }

    fn mock_payload(size: usize) -> ImagePayload {
        ImagePayload::new(vec![9u8; size], "image/jpeg", "photo.jpg")
    }

    // =========================================================================
    // Plan
    // =========================================================================

    #[test]
    fn default_plan_runs_everything() {
        let plan = UploadConfig::default().plan();
        assert_eq!(plan.compress, Step::Run(Preset::Auto));
        assert_eq!(plan.persist, Step::Run(()));
    }

    #[test]
    fn plan_skips_disabled_steps() {
        let config = UploadConfig {
            enable_compression: false,
            save_to_database: false,
            ..UploadConfig::default()
        };
        let plan = config.plan();
        assert_eq!(plan.compress, Step::Skip);
        assert_eq!(plan.persist, Step::Skip);
    }

    #[test]
    fn plan_carries_preset() {
        let config = UploadConfig {
            compression_strategy: Preset::Thumbnail,
            ..UploadConfig::default()
        };
        assert_eq!(config.plan().compress, Step::Run(Preset::Thumbnail));
    }

    #[test]
    fn config_deserializes_camel_case_with_defaults() {
        let config: UploadConfig = serde_json::from_str(
            r#"{"path": "art", "compressionStrategy": "gallery", "saveToDatabase": false,
                "visibility": "private", "ownerId": "u1", "metadata": {"seed": 42}}"#,
        )
        .unwrap();
        assert_eq!(config.path, "art");
        assert_eq!(config.compression_strategy, Preset::Gallery);
        assert!(config.enable_compression);
        assert!(!config.save_to_database);
        assert_eq!(config.visibility, Visibility::Private);
        assert_eq!(config.metadata["seed"], 42);
    }

    #[test]
    fn unknown_strategy_is_rejected_at_parse_time() {
        let parsed = serde_json::from_str::<UploadConfig>(r#"{"compressionStrategy": "turbo"}"#);
        assert!(parsed.is_err());
    }

    // =========================================================================
    // Happy path
    // =========================================================================

    #[test]
    fn compresses_stores_and_records() {
        let p = pipeline(MockCodec::new(Format::Jpeg, 3000, 2000));
        let config = UploadConfig {
            path: "art".into(),
            owner_id: Some("user-7".into()),
            ..UploadConfig::default()
        };
        let outcome = p.ingest(&mock_payload(3 * 1024 * 1024), &config);

        assert!(outcome.success, "{outcome:?}");
        let data = outcome.data.unwrap();
        assert!(data.compressed);
        assert_eq!(data.format, Some(Format::WebP));
        // auto > 2MB tier: bounds 1800
        assert_eq!(data.dimensions, Some(Dimensions::new(1800, 1200)));
        assert!(data.storage_key.starts_with("art/"));
        assert!(data.storage_key.ends_with(".webp"));
        assert_eq!(data.public_url, format!("https://cdn.test/{}", data.storage_key));

        let stored = p.store.object(&data.storage_key).unwrap();
        assert_eq!(stored.content_type, "image/webp");
        assert_eq!(stored.bytes.len() as u64, data.compressed_size_bytes);

        let records = p.records.records();
        assert_eq!(records.len(), 1);
        assert_eq!(Some(&records[0].id), data.record_id.as_ref());
        assert_eq!(records[0].record.owner_id.as_deref(), Some("user-7"));
        assert_eq!(records[0].record.storage_key, data.storage_key);
    }

    #[test]
    fn caller_filename_gets_stored_extension() {
        let p = pipeline(MockCodec::new(Format::Jpeg, 100, 100));
        let config = UploadConfig {
            path: "/u/".into(),
            filename: Some("sunset.jpg".into()),
            ..UploadConfig::default()
        };
        let key = p.ingest(&mock_payload(1000), &config).data.unwrap().storage_key;
        assert!(key.starts_with("u/sunset-"), "{key}");
        assert!(key.ends_with(".webp"), "{key}");
    }

    #[test]
    fn repeated_caller_filename_never_overwrites() {
        let p = pipeline(MockCodec::new(Format::Png, 64, 64));
        let config = UploadConfig {
            filename: Some("art.png".into()),
            ..UploadConfig::default()
        };
        let first = p.ingest(&mock_payload(1000), &config).data.unwrap();
        let second = p.ingest(&mock_payload(2000), &config).data.unwrap();

        assert_ne!(first.storage_key, second.storage_key);
        assert_eq!(p.store.len(), 2);
        let records = p.records.records();
        assert_eq!(records.len(), 2);
        for stored in records {
            let object = p.store.object(&stored.record.storage_key).unwrap();
            assert_eq!(crate::storage::sha256_hex(&object.bytes), stored.record.content_hash);
        }
    }

    #[test]
    fn overlong_caller_filename_is_rejected_before_storage() {
        let p = pipeline(MockCodec::new(Format::Jpeg, 100, 100));
        let config = UploadConfig {
            filename: Some("a".repeat(300)),
            ..UploadConfig::default()
        };
        let outcome = p.ingest(&mock_payload(1000), &config);

        assert!(!outcome.success);
        assert_eq!(outcome.error.unwrap().code, ErrorCode::InvalidFilename);
        assert!(p.store.is_empty());
        assert!(p.records.is_empty());
    }

    #[test]
    fn skip_persist_stores_without_record() {
        let p = pipeline(MockCodec::new(Format::Jpeg, 100, 100));
        let config = UploadConfig {
            save_to_database: false,
            ..UploadConfig::default()
        };
        let outcome = p.ingest(&mock_payload(1000), &config);
        assert!(outcome.success);
        assert_eq!(outcome.data.unwrap().record_id, None);
        assert_eq!(p.store.len(), 1);
        assert!(p.records.is_empty());
    }

    #[test]
    fn skip_compression_stores_original_bytes() {
        let p = pipeline(MockCodec::new(Format::Jpeg, 640, 480));
        let payload = mock_payload(5000);
        let config = UploadConfig {
            enable_compression: false,
            ..UploadConfig::default()
        };
        let data = p.ingest(&payload, &config).data.unwrap();

        assert!(!data.compressed);
        assert_eq!(data.original_size_bytes, 5000);
        assert_eq!(data.compressed_size_bytes, 5000);
        assert_eq!(data.compression_ratio_percent, 0);
        assert_eq!(data.format, Some(Format::Jpeg));
        assert_eq!(data.dimensions, Some(Dimensions::new(640, 480)));
        assert!(data.storage_key.ends_with(".jpg"));
        assert_eq!(p.store.get(&data.storage_key).unwrap(), Some(payload.bytes));
        assert_eq!(p.codec.get_operations(), vec![RecordedOp::Identify]);
    }

    // =========================================================================
    // Failures
    // =========================================================================

    #[test]
    fn validation_failure_has_no_side_effects() {
        let p = pipeline(MockCodec::new(Format::Jpeg, 10, 10));
        let pdf = ImagePayload::new(vec![1; 10], "application/pdf", "doc.pdf");
        let outcome = p.ingest(&pdf, &UploadConfig::default());

        assert!(!outcome.success);
        assert_eq!(outcome.error.unwrap().code, ErrorCode::InvalidFileType);
        assert!(p.codec.get_operations().is_empty());
        assert!(p.store.is_empty());
        assert!(p.records.is_empty());
    }

    #[test]
    fn validation_codes() {
        let p = pipeline(MockCodec::new(Format::Jpeg, 10, 10));
        let code = |payload: ImagePayload| {
            p.ingest(&payload, &UploadConfig::default()).error.unwrap().code
        };
        assert_eq!(code(ImagePayload::new(vec![], "image/png", "a.png")), ErrorCode::EmptyFile);
        assert_eq!(code(ImagePayload::new(vec![1], "image/png", "")), ErrorCode::InvalidFilename);
        assert_eq!(
            code(ImagePayload::new(vec![1], "image/png", "x".repeat(300))),
            ErrorCode::InvalidFilename
        );
    }

    #[test]
    fn compression_failure_falls_back_to_original() {
        let p = pipeline(MockCodec::new(Format::Png, 50, 40).failing_encode());
        let payload = mock_payload(4321);
        let outcome = p.ingest(&payload, &UploadConfig::default());

        assert!(outcome.success);
        let data = outcome.data.unwrap();
        assert!(!data.compressed);
        assert_eq!(data.original_size_bytes, 4321);
        assert_eq!(data.compressed_size_bytes, 4321);
        assert_eq!(data.format, Some(Format::Png));
        assert_eq!(p.store.get(&data.storage_key).unwrap(), Some(payload.bytes));
    }

    #[test]
    fn unreadable_original_uses_declared_format_and_no_dimensions() {
        let p = pipeline(MockCodec::new(Format::Png, 1, 1).failing_decode());
        let payload = ImagePayload::new(vec![0; 64], "image/png", "x.png");
        let data = p.ingest(&payload, &UploadConfig::default()).data.unwrap();
        assert_eq!(data.format, Some(Format::Png));
        assert_eq!(data.dimensions, None);
        assert_eq!(p.store.object(&data.storage_key).unwrap().content_type, "image/png");
    }

    #[test]
    fn storage_failure_is_clean() {
        let p = Pipeline::new(
            MockCodec::new(Format::Jpeg, 10, 10),
            UploadValidator::default(),
            UnreachableStore,
            MemoryMetadataStore::new(),
        );
        let outcome = p.ingest(&mock_payload(100), &UploadConfig::default());

        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert_eq!(error.code, ErrorCode::StorageFailed);
        assert_eq!(error.storage_key, None);
        assert!(p.records.is_empty());
    }

    #[test]
    fn metadata_failure_keeps_object_and_reports_key() {
        let p = Pipeline::new(
            MockCodec::new(Format::Jpeg, 10, 10),
            UploadValidator::default(),
            MemoryObjectStore::new("https://cdn.test"),
            RejectingMetadataStore,
        );
        let outcome = p.ingest(&mock_payload(100), &UploadConfig::default());

        assert!(!outcome.success);
        assert!(outcome.data.is_none());
        let error = outcome.error.unwrap();
        assert_eq!(error.code, ErrorCode::MetadataFailed);
        let key = error.storage_key.unwrap();
        assert!(p.store.get(&key).unwrap().is_some());
        assert_eq!(error.public_url.unwrap(), format!("https://cdn.test/{key}"));
    }

    // =========================================================================
    // Outcome JSON
    // =========================================================================

    #[test]
    fn success_json_shape() {
        let p = pipeline(MockCodec::new(Format::Jpeg, 10, 10));
        let outcome = p.ingest(&mock_payload(100), &UploadConfig::default());
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        let data = &json["data"];
        for field in [
            "recordId",
            "storageKey",
            "publicUrl",
            "originalSizeBytes",
            "compressedSizeBytes",
            "compressionRatioPercent",
            "format",
            "dimensions",
        ] {
            assert!(data.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn error_code_display_matches_json() {
        for code in [
            ErrorCode::InvalidFileType,
            ErrorCode::EmptyFile,
            ErrorCode::FileTooLarge,
            ErrorCode::InvalidFilename,
            ErrorCode::StorageFailed,
            ErrorCode::MetadataFailed,
        ] {
            assert_eq!(serde_json::to_value(code).unwrap(), code.to_string());
        }
    }

    #[test]
    fn failure_json_shape() {
        let p = pipeline(MockCodec::new(Format::Jpeg, 10, 10));
        let outcome = p.ingest(
            &ImagePayload::new(vec![1], "text/plain", "a.txt"),
            &UploadConfig::default(),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["code"], "INVALID_FILE_TYPE");
        assert!(json["error"]["message"].as_str().unwrap().contains("text/plain"));
    }

    // =========================================================================
    // Real codec and batches
    // =========================================================================

    #[test]
    fn real_corrupt_png_falls_back() {
        let p = pipeline(RustCodec::new());
        let payload = corrupt_png_payload();
        let data = p.ingest(&payload, &UploadConfig::default()).data.unwrap();
        assert!(!data.compressed);
        assert_eq!(data.compressed_size_bytes, payload.size_bytes());
        assert_eq!(p.store.get(&data.storage_key).unwrap(), Some(payload.bytes));
    }

    #[test]
    fn real_thumbnail_preset() {
        let p = pipeline(RustCodec::new());
        let config = UploadConfig {
            compression_strategy: Preset::Thumbnail,
            ..UploadConfig::default()
        };
        let data = p.ingest(&jpeg_payload(1200, 800), &config).data.unwrap();
        assert_eq!(data.dimensions, Some(Dimensions::new(400, 267)));
        assert_eq!(data.format, Some(Format::WebP));
    }

    #[test]
    fn batch_keeps_input_order() {
        let p = pipeline(RustCodec::new());
        let items: Vec<_> = (0..6)
            .map(|i| {
                let payload = if i % 2 == 0 {
                    png_payload(20 + i, 10)
                } else {
                    ImagePayload::new(vec![1], "text/plain", "x.txt")
                };
                let config = UploadConfig {
                    filename: Some(format!("item-{i}")),
                    ..UploadConfig::default()
                };
                (payload, config)
            })
            .collect();

        let outcomes = p.ingest_batch(&items);
        assert_eq!(outcomes.len(), 6);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.success, i % 2 == 0, "item {i}");
            if let Some(data) = &outcome.data {
                assert!(data.storage_key.starts_with(&format!("uploads/item-{i}-")));
                assert_eq!(data.dimensions, Some(Dimensions::new(20 + i as u32, 10)));
            }
        }
        assert_eq!(p.records.len(), 3);
    }
}
