//! Object store clients.
//!
//! The pipeline writes each upload once through [`ObjectStore::put`]. The
//! store never retries; a failed put leaves nothing behind. [`ObjectStore::get`]
//! is an independent read used to reconcile orphaned objects and to verify
//! writes in tests.
//!
//! | Store | Backing |
//! |---|---|
//! | [`FsObjectStore`] | A directory; objects written to a temp file then renamed into place |
//! | [`MemoryObjectStore`] | A mutex-guarded map, for embedding and tests |

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("IO error writing '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// What a successful put reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutResult {
    pub url: String,
    pub size_bytes: u64,
    /// Hex SHA-256 of the stored bytes.
    pub sha256: String,
}

impl PutResult {
    fn new(url: String, bytes: &[u8]) -> Self {
        Self {
            url,
            size_bytes: bytes.len() as u64,
            sha256: sha256_hex(bytes),
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub trait ObjectStore: Sync {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<PutResult, StoreError>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Keys are relative `/`-separated paths. Anything that could escape the
/// store root is refused.
fn check_key(key: &str) -> Result<(), StoreError> {
    let escapes = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|s| matches!(s, "" | "." | ".."));
    if escapes {
        Err(StoreError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

fn public_url(base_url: &str, key: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), key)
}

// =========================================================================
// Filesystem
// =========================================================================

/// Directory-backed store. `{root}/{key}` holds the bytes; the public URL is
/// `{base_url}/{key}`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    base_url: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<PutResult, StoreError> {
        check_key(key)?;
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };

        let dest = self.path_for(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp = dest.with_file_name(format!(
            ".{}.{}.tmp",
            dest.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            uuid::Uuid::new_v4().simple()
        ));
        if let Err(e) = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, &dest)) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(e));
        }

        Ok(PutResult::new(public_url(&self.base_url, key), bytes))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        check_key(key)?;
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

// =========================================================================
// In-memory
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    base_url: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::default(),
        }
    }

    fn objects(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects().keys().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects().get(key).cloned()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<PutResult, StoreError> {
        check_key(key)?;
        self.objects().insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(PutResult::new(public_url(&self.base_url, key), bytes))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.objects().get(key).map(|object| object.bytes.clone()))
    }
}
