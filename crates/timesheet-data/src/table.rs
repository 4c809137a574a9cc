//! Normalized per-student tables (`date;hours`).

use std::path::Path;

use timesheet_core::error::{AuditError, Result};
use timesheet_core::models::{StudentDataset, TimeRecord, ZERO_DURATION};

/// Column names of a normalized table.
pub const NORMALIZED_HEADER: [&str; 2] = ["date", "hours"];

/// Serialize `dataset` as a semicolon-separated `date;hours` table.
pub fn encode_normalized(dataset: &StudentDataset) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());

    writer
        .write_record(NORMALIZED_HEADER)
        .map_err(std::io::Error::from)?;
    for record in &dataset.records {
        writer
            .write_record([record.date.as_str(), record.duration.as_str()])
            .map_err(std::io::Error::from)?;
    }

    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

/// Read a normalized table written by [`encode_normalized`].
///
/// Rows without a date or with an empty or zero duration are dropped so the
/// record invariants hold for hand-edited tables as well.
pub fn read_normalized(path: &Path, owner_name: &str) -> Result<StudentDataset> {
    let bytes = std::fs::read(path).map_err(|source| AuditError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    decode_normalized(&bytes, owner_name)
}

/// Parse the bytes of a normalized table.
pub fn decode_normalized(bytes: &[u8], owner_name: &str) -> Result<StudentDataset> {
    let text = crate::reader::decode_text(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(|e| extraction_error(&e))?;
    let names: Vec<&str> = headers.iter().map(str::trim).collect();
    if names != NORMALIZED_HEADER {
        return Err(AuditError::Extraction {
            line: 1,
            reason: format!("expected header date;hours, found {}", names.join(";")),
        });
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| extraction_error(&e))?;
        let date = row.get(0).unwrap_or_default().trim();
        let hours = row.get(1).unwrap_or_default().trim();
        if date.is_empty() || hours.is_empty() || hours == ZERO_DURATION {
            continue;
        }
        records.push(TimeRecord::new(date, hours));
    }

    Ok(StudentDataset {
        owner_name: owner_name.to_string(),
        records,
    })
}

fn extraction_error(e: &csv::Error) -> AuditError {
    AuditError::Extraction {
        line: e.position().map(|p| p.line() as usize).unwrap_or(0),
        reason: e.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dataset() -> StudentDataset {
        StudentDataset {
            owner_name: "Mueller_Anna".to_string(),
            records: vec![
                TimeRecord::new("04.03.2024", "04:00:00"),
                TimeRecord::new("01.03.2024", "08:30:00"),
            ],
        }
    }

    #[test]
    fn test_encode_writes_header_and_rows() {
        let bytes = encode_normalized(&dataset()).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "date;hours\n04.03.2024;04:00:00\n01.03.2024;08:30:00\n"
        );
    }

    #[test]
    fn test_encode_empty_dataset_writes_header_only() {
        let empty = StudentDataset {
            owner_name: "X_Y".to_string(),
            records: vec![],
        };
        let bytes = encode_normalized(&empty).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "date;hours\n");
    }

    #[test]
    fn test_read_normalized_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Mueller_Anna.csv");
        std::fs::write(&path, encode_normalized(&dataset()).unwrap()).unwrap();

        let loaded = read_normalized(&path, "Mueller_Anna").unwrap();
        assert_eq!(loaded, dataset());
    }

    #[test]
    fn test_decode_drops_zero_and_empty_rows() {
        let text = "date;hours\n01.03.2024;00:00:00\n;02:00:00\n02.03.2024;\n03.03.2024;01:00:00\n";
        let loaded = decode_normalized(text.as_bytes(), "A_B").unwrap();
        assert_eq!(
            loaded.records,
            vec![TimeRecord::new("03.03.2024", "01:00:00")]
        );
    }

    #[test]
    fn test_decode_rejects_unexpected_header() {
        let err = decode_normalized(b"datum;stunden\n01.03.2024;01:00:00\n", "A_B").unwrap_err();
        assert!(matches!(err, AuditError::Extraction { line: 1, .. }));
    }

    #[test]
    fn test_decode_rejects_ragged_rows() {
        let err = decode_normalized(b"date;hours\n01.03.2024;01:00:00;extra\n", "A_B")
            .unwrap_err();
        assert!(matches!(err, AuditError::Extraction { .. }));
    }
}
