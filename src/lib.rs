//! # Canvas Ingest
//!
//! Adaptive image compression and an upload ingestion pipeline for
//! user-supplied and AI-generated art.
//!
//! # Architecture: Two Layers
//!
//! ```text
//! 1. Compress   payload + options   →  CompressionResult   (pure, no I/O)
//! 2. Ingest     payload + config    →  UploadOutcome       (validate → compress → store → record)
//! ```
//!
//! The compression engine is a pure function of its inputs: no filesystem, no
//! network, no state between calls. The ingestion pipeline drives one upload
//! through its collaborators (validator, object store, metadata store) and
//! always returns a definite success or failure.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Codec trait, pure-Rust codec, dimension planner, format selector |
//! | [`compress`] | Compression engine: strategy-adjusted quality and the bounded encode loop |
//! | [`preset`] | Named option bundles (`auto`, `gallery`, `thumbnail`, `admin`) |
//! | [`validate`] | Upload checks run before any side effect |
//! | [`naming`] | Generated filenames and storage key normalization |
//! | [`storage`] | Object store trait with filesystem and in-memory stores |
//! | [`metadata`] | Metadata store trait with JSON-lines and in-memory stores |
//! | [`ingest`] | The ingestion pipeline and its JSON outcome |
//! | [`config`] | `config.toml` loading, validation and merging |
//! | [`types`] | The shared [`ImagePayload`](types::ImagePayload) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Best-Effort Budgets
//!
//! The engine tries at most five encodes and never drops below quality 0.5.
//! A result over budget is still a result: callers see
//! `compressedSizeBytes > maxSizeBytes` and choose their own policy.
//!
//! ## Compression Never Fails An Upload
//!
//! Decode and encode errors inside ingestion are logged and the original bytes
//! are stored instead. Only validation, storage and metadata failures surface
//! as `success: false`.
//!
//! ## No Rollback On Metadata Failure
//!
//! Storage is written before metadata. When the metadata insert fails the
//! stored object is kept and its key is returned in the error, so no upload is
//! silently discarded. Reconciling orphans is an operator task.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate (Lanczos3 resampling) and
//! `rav1e` (AVIF encoding), both pure Rust. The binary has no system image
//! libraries to install.
//!
//! ## Collaborators Behind Traits
//!
//! [`imaging::ImageCodec`], [`validate::Validator`], [`storage::ObjectStore`]
//! and [`metadata::MetadataStore`] are the seams. The crate ships filesystem
//! and in-memory implementations; other backends plug in without touching
//! the pipeline.

pub mod compress;
pub mod config;
pub mod imaging;
pub mod ingest;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod preset;
pub mod storage;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
