//! Application configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` in the config directory overrides
//! any subset of keys.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [limits]
//! accepted_types = ["jpeg", "jpg", "png", "webp", "gif", "avif", "tiff"]
//! max_upload_bytes = 52428800   # 50MB
//! max_filename_length = 255
//!
//! [storage]
//! root = "objects"                              # Object store directory
//! public_base_url = "http://localhost:8080/objects"
//!
//! [metadata]
//! path = "images.jsonl"                         # Metadata store file
//!
//! [upload]
//! path = "uploads"            # Storage key prefix
//! preset = "auto"             # auto | gallery | thumbnail | admin
//! enable_compression = true
//! save_to_database = true
//! visibility = "public"       # public | private
//! # owner_id = "user-1"
//!
//! [processing]
//! max_processes = 4           # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Relative paths in `[storage]` and `[metadata]` resolve against the config
//! directory. Unknown keys are rejected to catch typos early.

use crate::ingest::UploadConfig;
use crate::metadata::Visibility;
use crate::preset::Preset;
use crate::validate::UploadLimits;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Upload validation limits.
    pub limits: UploadLimits,
    /// Object store location.
    pub storage: StorageConfig,
    /// Metadata store location.
    pub metadata: MetadataConfig,
    /// Defaults for each upload.
    pub upload: UploadDefaults,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.accepted_types.is_empty() {
            return Err(ConfigError::Validation(
                "limits.accepted_types must not be empty".into(),
            ));
        }
        if self.limits.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "limits.max_upload_bytes must be positive".into(),
            ));
        }
        if self.limits.max_filename_length == 0 {
            return Err(ConfigError::Validation(
                "limits.max_filename_length must be positive".into(),
            ));
        }
        if self.storage.public_base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.public_base_url must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("objects"),
            public_base_url: "http://localhost:8080/objects".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn root_in(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.root)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    pub path: PathBuf,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("images.jsonl"),
        }
    }
}

impl MetadataConfig {
    pub fn path_in(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.path)
    }
}

/// Upload settings applied when the caller does not override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadDefaults {
    pub path: String,
    pub preset: Preset,
    pub enable_compression: bool,
    pub save_to_database: bool,
    pub visibility: Visibility,
    pub owner_id: Option<String>,
}

impl Default for UploadDefaults {
    fn default() -> Self {
        let upload = UploadConfig::default();
        Self {
            path: upload.path,
            preset: upload.compression_strategy,
            enable_compression: upload.enable_compression,
            save_to_database: upload.save_to_database,
            visibility: upload.visibility,
            owner_id: upload.owner_id,
        }
    }
}

impl UploadDefaults {
    pub fn to_upload_config(&self) -> UploadConfig {
        UploadConfig {
            path: self.path.clone(),
            enable_compression: self.enable_compression,
            compression_strategy: self.preset,
            save_to_database: self.save_to_database,
            visibility: self.visibility,
            owner_id: self.owner_id.clone(),
            ..UploadConfig::default()
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel ingest workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Canvas Ingest Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Only keys you want to override are needed.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Upload validation
# ---------------------------------------------------------------------------
[limits]
# Accepted image subtypes, matched against the declared image/<subtype>
# content type (case-insensitive, parameters ignored).
accepted_types = ["jpeg", "jpg", "png", "webp", "gif", "avif", "tiff"]

# Hard ceiling on upload size in bytes (50MB).
max_upload_bytes = 52428800

# Longest accepted filename, in characters.
max_filename_length = 255

# ---------------------------------------------------------------------------
# Object store
# ---------------------------------------------------------------------------
[storage]
# Directory holding stored objects. Relative to the config directory.
root = "objects"

# Public URL prefix; an object's URL is <public_base_url>/<storage key>.
public_base_url = "http://localhost:8080/objects"

# ---------------------------------------------------------------------------
# Metadata store
# ---------------------------------------------------------------------------
[metadata]
# JSON-lines file receiving one record per upload. Relative to the config
# directory.
path = "images.jsonl"

# ---------------------------------------------------------------------------
# Upload defaults
# ---------------------------------------------------------------------------
[upload]
# Storage key prefix.
path = "uploads"

# Compression preset: auto, gallery, thumbnail or admin.
#   auto      - picks quality, bounds and budget from the original size
#   gallery   - 0.80 quality, 1920px, 800KB budget, balanced
#   thumbnail - 0.70 quality, 400px, 100KB budget, size
#   admin     - 0.85 quality, 2560px, 1500KB budget, quality
preset = "auto"

# Compress before storing. When compression fails the original is stored.
enable_compression = true

# Write a metadata record after storing.
save_to_database = true

# public or private.
visibility = "public"

# Owner recorded on every upload.
# owner_id = "user-1"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel ingest workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
