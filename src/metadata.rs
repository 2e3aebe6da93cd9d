//! Metadata store clients.
//!
//! One [`ImageRecord`] is written per successfully stored upload when the
//! caller asks for persistence. Records are only ever inserted; there is no
//! update or delete path.
//!
//! ## Stores
//!
//! - [`JsonlMetadataStore`] appends one JSON object per line to a file. Each
//!   line is `{"id": "...", ...record}`. Appends are serialized by a mutex so
//!   concurrent ingests never interleave partial lines.
//! - [`MemoryMetadataStore`] keeps records in a vector.
//!
//! Ids are random UUID v4 strings in both stores.

use crate::imaging::{Dimensions, Format};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Metadata store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Everything persisted about one stored upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub storage_key: String,
    pub public_url: String,
    pub original_size_bytes: u64,
    pub compressed_size_bytes: u64,
    pub compression_ratio_percent: i64,
    /// Format of the stored bytes. `None` when the original was stored and
    /// could not be identified.
    pub format: Option<Format>,
    pub dimensions: Option<Dimensions>,
    pub owner_id: Option<String>,
    pub visibility: Visibility,
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Hex SHA-256 of the stored bytes.
    pub content_hash: String,
    pub created_at_ms: u64,
}

pub trait MetadataStore: Sync {
    fn insert(&self, record: &ImageRecord) -> Result<RecordId, DbError>;
}

/// One line of the JSONL file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: ImageRecord,
}

// =========================================================================
// JSON lines
// =========================================================================

#[derive(Debug)]
pub struct JsonlMetadataStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlMetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back. A missing file is an empty store.
    pub fn load(&self) -> Result<Vec<StoredRecord>, DbError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(DbError::from))
            .collect()
    }
}

impl MetadataStore for JsonlMetadataStore {
    fn insert(&self, record: &ImageRecord) -> Result<RecordId, DbError> {
        let id = RecordId::generate();
        let mut line = serde_json::to_string(&StoredRecord {
            id: id.clone(),
            record: record.clone(),
        })?;
        line.push('\n');

        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(id)
    }
}

// =========================================================================
// In-memory
// =========================================================================

#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: Mutex<Vec<StoredRecord>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.records
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn insert(&self, record: &ImageRecord) -> Result<RecordId, DbError> {
        let id = RecordId::generate();
        self.records
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(StoredRecord {
                id: id.clone(),
                record: record.clone(),
            });
        Ok(id)
    }
}
