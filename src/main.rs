use canvas_ingest::config::{self, AppConfig};
use canvas_ingest::imaging::{Format, RustCodec};
use canvas_ingest::ingest::{Pipeline, UploadConfig, UploadOutcome};
use canvas_ingest::metadata::{JsonlMetadataStore, Visibility};
use canvas_ingest::preset::Preset;
use canvas_ingest::storage::FsObjectStore;
use canvas_ingest::types::ImagePayload;
use canvas_ingest::validate::UploadValidator;
use canvas_ingest::{compress, output};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "canvas-ingest")]
#[command(about = "Adaptive image compression and ingestion")]
#[command(long_about = "\
Adaptive image compression and ingestion

Shrinks images toward a byte budget and stores them with a metadata record.

Pipeline for each uploaded file:

  validate → compress → derive key → store → record

  validate   content type, size (50MB) and filename checks; nothing is written on rejection
  compress   preset picks quality, bounds and budget; failures fall back to the original
  store      bytes land under <storage.root>/<upload.path>/<filename>
  record     one JSON line appended to <metadata.path>; on failure the stored
             object is kept and reported as orphaned

Presets:
  auto       tiered by original size (>5MB, >2MB, >1MB, smaller)
  gallery    0.80 quality, 1920px, 800KB, balanced
  thumbnail  0.70 quality, 400px, 100KB, size
  admin      0.85 quality, 2560px, 1500KB, quality

Logging is controlled by RUST_LOG (default: info).

Run 'canvas-ingest gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml; relative store paths resolve here
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress one image without storing it
    Compress {
        file: PathBuf,
        /// auto, gallery, thumbnail or admin
        #[arg(long, default_value_t = Preset::Auto)]
        preset: Preset,
        /// Output path (default: next to the input, with the new extension)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate, compress, store and record images
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Storage key prefix (overrides [upload] path)
        #[arg(long)]
        path: Option<String>,
        /// Stored filename stem; only valid with a single file
        #[arg(long)]
        filename: Option<String>,
        /// Override the compression preset
        #[arg(long)]
        preset: Option<Preset>,
        /// Store the original bytes
        #[arg(long)]
        no_compress: bool,
        /// Skip the metadata record
        #[arg(long)]
        no_record: bool,
        /// Mark uploads private
        #[arg(long)]
        private: bool,
        /// Owner recorded with each upload
        #[arg(long)]
        owner: Option<String>,
        /// Extra metadata as KEY=VALUE, repeatable
        #[arg(long = "meta", value_parser = parse_meta)]
        meta: Vec<(String, String)>,
        /// Print outcomes as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Compress {
            file,
            preset,
            output: out,
        } => {
            let payload = read_payload(&file)?;
            let options = preset.options(payload.size_bytes());
            let result = compress::compress(&payload, &options)?;
            let out = out.unwrap_or_else(|| file.with_extension(result.format.extension()));
            std::fs::write(&out, &result.bytes)?;
            output::print_compress_result(
                &display_name(&file),
                &out.display().to_string(),
                &result,
                options.max_size_bytes,
            );
        }
        Command::Ingest {
            files,
            path,
            filename,
            preset,
            no_compress,
            no_record,
            private,
            owner,
            meta,
            json,
        } => {
            if filename.is_some() && files.len() > 1 {
                return Err("--filename can only be used with a single file".into());
            }

            let app = config::load_config(&cli.config_dir)?;
            init_thread_pool(&app.processing);

            let mut upload = app.upload.to_upload_config();
            if let Some(path) = path {
                upload.path = path;
            }
            if let Some(preset) = preset {
                upload.compression_strategy = preset;
            }
            upload.filename = filename;
            upload.enable_compression &= !no_compress;
            upload.save_to_database &= !no_record;
            if private {
                upload.visibility = Visibility::Private;
            }
            if owner.is_some() {
                upload.owner_id = owner;
            }
            upload.metadata.extend(
                meta.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v))),
            );

            let outcomes = ingest_files(&app, &cli.config_dir, &files, &upload)?;
            let all_ok = outcomes.iter().all(|(_, o)| o.success);

            if json {
                let list: Vec<&UploadOutcome> = outcomes.iter().map(|(_, o)| o).collect();
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                output::print_ingest_outcomes(&outcomes);
            }

            if !all_ok {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn ingest_files(
    app: &AppConfig,
    config_dir: &Path,
    files: &[PathBuf],
    upload: &UploadConfig,
) -> Result<Vec<(String, UploadOutcome)>, Box<dyn std::error::Error>> {
    let pipeline = Pipeline::new(
        RustCodec::new(),
        UploadValidator::new(app.limits.clone()),
        FsObjectStore::new(
            app.storage.root_in(config_dir),
            app.storage.public_base_url.clone(),
        ),
        JsonlMetadataStore::new(app.metadata.path_in(config_dir)),
    );

    let items = files
        .iter()
        .map(|file| Ok((read_payload(file)?, upload.clone())))
        .collect::<Result<Vec<_>, std::io::Error>>()?;

    let outcomes = pipeline.ingest_batch(&items);
    Ok(files.iter().map(|f| display_name(f)).zip(outcomes).collect())
}

/// Read a file as an upload, declaring the content type from its extension.
fn read_payload(file: &Path) -> std::io::Result<ImagePayload> {
    let bytes = std::fs::read(file)?;
    let content_type = file
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(Format::from_extension)
        .map_or("application/octet-stream", Format::mime);
    Ok(ImagePayload::new(bytes, content_type, display_name(file)))
}

fn display_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

fn parse_meta(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Log to stderr, filtered by RUST_LOG (default: info).
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
