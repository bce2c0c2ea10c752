//! Storage key conventions.
//!
//! Key layout:
//!
//! - temp object: `temp/{date}/{unique_id}-{filename}`
//! - permanent object: `public/{date}/{stem}/{unique_id}-{filename}`
//! - thumbnail: `public/{date}/{stem}/thumbnails/{size}x{size}`
//!
//! `{stem}` is the temp file name without its final extension. Every function here
//! is pure, so a redelivered job always lands on the same keys.

use crate::constants::{PUBLIC_PREFIX, TEMP_PREFIX, THUMBNAILS_DIR};
use crate::error::{PipelineError, PipelineResult};

/// Check that a temp key has the `temp/{date}/{file}` shape.
pub fn validate_temp_key(temp_key: &str) -> PipelineResult<()> {
    if !temp_key.starts_with(TEMP_PREFIX) || temp_key.len() <= TEMP_PREFIX.len() {
        return Err(PipelineError::MalformedJob(format!(
            "temp key must start with '{}': {}",
            TEMP_PREFIX, temp_key
        )));
    }
    if temp_key.contains("..") || temp_key.contains('\\') {
        return Err(PipelineError::MalformedJob(format!(
            "temp key contains invalid characters: {}",
            temp_key
        )));
    }

    let segments: Vec<&str> = temp_key.split('/').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(PipelineError::MalformedJob(format!(
            "temp key must look like temp/<date>/<file>: {}",
            temp_key
        )));
    }

    Ok(())
}

/// Derive the permanent key for a temp key.
pub fn permanent_key(temp_key: &str) -> PipelineResult<String> {
    validate_temp_key(temp_key)?;

    let mut segments = temp_key.rsplit('/');
    let filename = segments.next().unwrap_or_default();
    let date = segments.next().unwrap_or_default();

    Ok(format!(
        "{}{}/{}/{}",
        PUBLIC_PREFIX,
        date,
        file_stem(filename),
        filename
    ))
}

/// Derive the key of one thumbnail rendition of a permanent object.
pub fn thumbnail_key(permanent_key: &str, size: u32) -> String {
    match permanent_key.rsplit_once('/') {
        Some((dir, _)) => format!("{}/{}/{}", dir, THUMBNAILS_DIR, size_label(size)),
        None => format!("{}/{}", THUMBNAILS_DIR, size_label(size)),
    }
}

/// Label of a square rendition, e.g. `100x100`.
pub fn size_label(size: u32) -> String {
    format!("{}x{}", size, size)
}

fn file_stem(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    }
}
