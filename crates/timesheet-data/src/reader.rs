//! Export discovery and loading.
//!
//! Finds the per-student export files in the input directory and reads them
//! into lines, tolerating the Latin-1 encoding produced by older exporters.

use std::path::{Path, PathBuf};

use timesheet_core::error::{AuditError, Result};
use tracing::{debug, warn};

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all files with `extension` directly inside `dir`, sorted by path.
pub fn find_export_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AuditError::DataPathNotFound(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case(extension))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    debug!("Found {} export files in {}", files.len(), dir.display());
    Ok(files)
}

/// Read `path` and split it into lines without line terminators.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|source| AuditError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_text(&bytes).lines().map(str::to_string).collect())
}

/// Decode bytes as UTF-8, falling back to Latin-1 when they are not valid
/// UTF-8. A leading UTF-8 byte-order mark is dropped.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.strip_prefix('\u{feff}').unwrap_or(text).to_string(),
        // Latin-1 maps every byte to the code point of the same value.
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// File stem of `path`, used as owner name when an export carries none.
pub fn file_stem_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
