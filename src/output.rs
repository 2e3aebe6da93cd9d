//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Compress
//!
//! ```text
//! sunset.jpg → sunset.webp
//!     Format: jpeg → webp
//!     Dimensions: 1600x1067
//!     Size: 6.0 MB → 412.3 KB (93% smaller)
//!     Quality: 0.70 after 1 attempt
//!     Budget: 600.0 KB (met)
//!     Time: 412ms
//! ```
//!
//! ## Ingest
//!
//! ```text
//! 001 sunset.jpg → uploads/1718035200123-k3x9qa.webp
//!     Size: 6.0 MB → 412.3 KB (93% smaller)
//!     Image: webp 1600x1067
//!     Record: 0f8fad5b-d9cb-469f-a165-70867728950e
//! 002 broken.png → uploads/1718035200125-p01zzq.png
//!     Size: 264 B (stored original)
//! 003 notes.pdf ✗ INVALID_FILE_TYPE
//!     Unsupported content type 'application/pdf'
//!
//! Ingested 2 of 3 files
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::compress::CompressionResult;
use crate::ingest::UploadOutcome;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count in binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// `93% smaller`, `12% larger` or `same size`.
fn ratio_phrase(ratio: i64) -> String {
    match ratio {
        0 => "same size".to_string(),
        r if r > 0 => format!("{r}% smaller"),
        r => format!("{}% larger", -r),
    }
}

fn size_line(original: u64, stored: u64, ratio: i64) -> String {
    format!(
        "{}Size: {} → {} ({})",
        indent(1),
        format_bytes(original),
        format_bytes(stored),
        ratio_phrase(ratio)
    )
}

// ============================================================================
// Compress
// ============================================================================

pub fn format_compress_result(
    source_name: &str,
    output_name: &str,
    result: &CompressionResult,
    budget: u64,
) -> Vec<String> {
    let attempts = result.attempts.len();
    vec![
        format!("{source_name} → {output_name}"),
        format!("{}Format: {} → {}", indent(1), result.source_format, result.format),
        format!(
            "{}Dimensions: {}x{}",
            indent(1),
            result.dimensions.width,
            result.dimensions.height
        ),
        size_line(
            result.original_size_bytes as u64,
            result.compressed_size_bytes as u64,
            result.compression_ratio_percent,
        ),
        format!(
            "{}Quality: {} after {} attempt{}",
            indent(1),
            result.quality_used,
            attempts,
            if attempts == 1 { "" } else { "s" }
        ),
        format!(
            "{}Budget: {} ({})",
            indent(1),
            format_bytes(budget),
            if result.within_budget(budget) { "met" } else { "exceeded" }
        ),
        format!("{}Time: {}ms", indent(1), result.processing_time_ms),
    ]
}

pub fn print_compress_result(
    source_name: &str,
    output_name: &str,
    result: &CompressionResult,
    budget: u64,
) {
    for line in format_compress_result(source_name, output_name, result, budget) {
        println!("{line}");
    }
}

// ============================================================================
// Ingest
// ============================================================================

/// One entry per input file, in input order.
pub fn format_ingest_outcomes(outcomes: &[(String, UploadOutcome)]) -> Vec<String> {
    let mut lines = Vec::new();

    for (i, (name, outcome)) in outcomes.iter().enumerate() {
        let header = format_index(i + 1);
        match (&outcome.data, &outcome.error) {
            (Some(data), _) => {
                lines.push(format!("{header} {name} → {}", data.storage_key));
                if data.compressed {
                    lines.push(size_line(
                        data.original_size_bytes,
                        data.compressed_size_bytes,
                        data.compression_ratio_percent,
                    ));
                } else {
                    lines.push(format!(
                        "{}Size: {} (stored original)",
                        indent(1),
                        format_bytes(data.compressed_size_bytes)
                    ));
                }
                match (data.format, data.dimensions) {
                    (Some(format), Some(dims)) => lines.push(format!(
                        "{}Image: {format} {}x{}",
                        indent(1),
                        dims.width,
                        dims.height
                    )),
                    (Some(format), None) => lines.push(format!("{}Image: {format}", indent(1))),
                    _ => {}
                }
                if let Some(id) = &data.record_id {
                    lines.push(format!("{}Record: {id}", indent(1)));
                }
            }
            (None, Some(error)) => {
                lines.push(format!("{header} {name} ✗ {}", error.code));
                lines.push(format!("{}{}", indent(1), error.message));
                if let Some(key) = &error.storage_key {
                    lines.push(format!("{}Orphaned object: {key}", indent(1)));
                }
            }
            (None, None) => lines.push(format!("{header} {name} ✗ {}", outcome.message)),
        }
    }

    let succeeded = outcomes.iter().filter(|(_, o)| o.success).count();
    lines.push(String::new());
    lines.push(format!(
        "Ingested {succeeded} of {} file{}",
        outcomes.len(),
        if outcomes.len() == 1 { "" } else { "s" }
    ));
    lines
}

pub fn print_ingest_outcomes(outcomes: &[(String, UploadOutcome)]) {
    for line in format_ingest_outcomes(outcomes) {
        println!("{line}");
    }
}
