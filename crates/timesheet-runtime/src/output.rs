//! Persisting reports, normalized tables and the run summary.

use std::path::{Path, PathBuf};

use timesheet_core::error::{AuditError, Result};
use timesheet_core::models::StudentDataset;
use timesheet_core::policy::ViolationReport;
use timesheet_data::table::encode_normalized;

/// File name of the JSON run summary inside the output directory.
pub const SUMMARY_FILE_NAME: &str = "run_summary.json";

/// Path of the violation report for `owner_name`.
pub fn report_path(output_dir: &Path, owner_name: &str) -> PathBuf {
    output_dir.join(format!("{owner_name}_result.txt"))
}

/// Path of the normalized table for `owner_name`.
pub fn normalized_path(normalized_dir: &Path, owner_name: &str) -> PathBuf {
    normalized_dir.join(format!("{owner_name}.csv"))
}

/// Write `report` for `owner_name` and return the written path.
pub fn write_report(
    output_dir: &Path,
    owner_name: &str,
    report: &ViolationReport,
) -> Result<PathBuf> {
    let path = report_path(output_dir, owner_name);
    write_atomic(&path, report.to_string().as_bytes())?;
    Ok(path)
}

/// Write a report that records why `source` could not be audited.
pub fn write_failure_report(
    output_dir: &Path,
    owner_name: &str,
    source: &Path,
    error: &AuditError,
) -> Result<PathBuf> {
    let path = report_path(output_dir, owner_name);
    let content = format!("Could not audit {}: {}\n", source.display(), error);
    write_atomic(&path, content.as_bytes())?;
    Ok(path)
}

/// Write the normalized `date;hours` table of `dataset`.
pub fn write_normalized(normalized_dir: &Path, dataset: &StudentDataset) -> Result<PathBuf> {
    let path = normalized_path(normalized_dir, &dataset.owner_name);
    write_atomic(&path, &encode_normalized(dataset)?)?;
    Ok(path)
}

/// Atomically write `bytes` to `path`, creating parent directories if needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_error = |source| AuditError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }

    // Write to a temp file then rename for atomicity.
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    std::fs::write(&tmp, bytes).map_err(write_error)?;
    std::fs::rename(&tmp, path).map_err(write_error)?;

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
