//! Calendar-week lookup table.
//!
//! Each table row is `label_prefix;label_suffix;date_1;date_2;...`, e.g.
//! `KW;9;26.02.2024;27.02.2024;...`. The week label is prefix and suffix
//! joined by a space (`"KW 9"`).

use std::collections::HashMap;
use std::path::Path;

use timesheet_core::error::{AuditError, Result};
use tracing::{debug, warn};

use crate::reader::decode_text;

/// One calendar week and the dates it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekRow {
    pub label: String,
    pub dates: Vec<String>,
}

/// Immutable mapping from calendar date to week label.
#[derive(Debug, Clone, Default)]
pub struct CalendarWeekIndex {
    weeks: Vec<WeekRow>,
    by_date: HashMap<String, usize>,
}

impl CalendarWeekIndex {
    /// Build the index from table rows.
    ///
    /// Rows whose cells are all empty are skipped. Any other row must have a
    /// non-empty label prefix and suffix. When a date appears in several rows
    /// the first row wins.
    pub fn from_rows<I, R, S>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut weeks = Vec::new();
        let mut by_date = HashMap::new();

        for (row_number, row) in rows.into_iter().enumerate() {
            let cells: Vec<String> = row
                .into_iter()
                .map(|cell| cell.as_ref().trim().to_string())
                .collect();

            if cells.iter().all(String::is_empty) {
                continue;
            }

            let (prefix, suffix) = match (cells.first(), cells.get(1)) {
                (Some(prefix), Some(suffix)) if !prefix.is_empty() && !suffix.is_empty() => {
                    (prefix, suffix)
                }
                _ => {
                    return Err(AuditError::IndexLoad(format!(
                        "row {} needs a label prefix and suffix: {:?}",
                        row_number + 1,
                        cells
                    )))
                }
            };

            let label = format!("{prefix} {suffix}");
            let position = weeks.len();
            let dates: Vec<String> = cells[2..]
                .iter()
                .filter(|date| !date.is_empty())
                .cloned()
                .collect();

            for date in &dates {
                if let Some(&first) = by_date.get(date) {
                    let first_label: &WeekRow = &weeks[first];
                    warn!(
                        "Date {} listed in both {} and {}; keeping {}",
                        date, first_label.label, label, first_label.label
                    );
                } else {
                    by_date.insert(date.clone(), position);
                }
            }

            weeks.push(WeekRow { label, dates });
        }

        if weeks.is_empty() {
            return Err(AuditError::IndexLoad(
                "table does not contain any week".to_string(),
            ));
        }

        Ok(Self { weeks, by_date })
    }

    /// Load a semicolon-separated table from `path`.
    ///
    /// When `has_header` is set the first row is treated as column names.
    pub fn load(path: &Path, has_header: bool) -> Result<Self> {
        if !path.is_file() {
            return Err(AuditError::IndexLoad(format!(
                "{} does not exist",
                path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(has_header)
            .flexible(true)
            .from_path(path)
            .map_err(|e| AuditError::IndexLoad(format!("{}: {}", path.display(), e)))?;

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record =
                record.map_err(|e| AuditError::IndexLoad(format!("{}: {}", path.display(), e)))?;
            rows.push(
                record
                    .iter()
                    .map(decode_text)
                    .collect::<Vec<String>>(),
            );
        }

        let index = Self::from_rows(rows)?;
        debug!(
            "Loaded {} calendar weeks ({} dates) from {}",
            index.weeks.len(),
            index.by_date.len(),
            path.display()
        );
        Ok(index)
    }

    /// Label of the first week containing `date`.
    pub fn lookup(&self, date: &str) -> Option<&str> {
        self.by_date
            .get(date.trim())
            .map(|&position| self.weeks[position].label.as_str())
    }

    /// Table position of the week labelled `label`.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.weeks.iter().position(|week| week.label == label)
    }

    pub fn weeks(&self) -> &[WeekRow] {
        &self.weeks
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn index(rows: &[&[&str]]) -> Result<CalendarWeekIndex> {
        CalendarWeekIndex::from_rows(rows.iter().map(|row| row.iter().copied()))
    }

    #[test]
    fn test_lookup_joins_prefix_and_suffix() {
        let idx = index(&[
            &["KW", "9", "26.02.2024", "01.03.2024"],
            &["KW", "10", "04.03.2024"],
        ])
        .unwrap();
        assert_eq!(idx.lookup("01.03.2024"), Some("KW 9"));
        assert_eq!(idx.lookup("04.03.2024"), Some("KW 10"));
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn test_lookup_unknown_date_is_none() {
        let idx = index(&[&["KW", "9", "26.02.2024"]]).unwrap();
        assert_eq!(idx.lookup("31.12.2030"), None);
    }

    #[test]
    fn test_first_row_wins_for_duplicate_dates() {
        let idx = index(&[
            &["KW", "52", "30.12.2024"],
            &["KW", "1", "30.12.2024", "02.01.2025"],
        ])
        .unwrap();
        assert_eq!(idx.lookup("30.12.2024"), Some("KW 52"));
        assert_eq!(idx.lookup("02.01.2025"), Some("KW 1"));
    }

    #[test]
    fn test_week_without_dates_is_kept() {
        let idx = index(&[&["KW", "1"], &["KW", "2", "08.01.2024", ""]]).unwrap();
        assert_eq!(idx.weeks()[0].dates.len(), 0);
        assert_eq!(idx.weeks()[1].dates, vec!["08.01.2024"]);
        assert_eq!(idx.position("KW 2"), Some(1));
        assert_eq!(idx.position("KW 3"), None);
    }

    #[test]
    fn test_missing_label_columns_is_error() {
        assert!(matches!(
            index(&[&["KW"]]),
            Err(AuditError::IndexLoad(_))
        ));
        assert!(matches!(
            index(&[&["", "3", "15.01.2024"]]),
            Err(AuditError::IndexLoad(_))
        ));
    }

    #[test]
    fn test_blank_rows_skipped_but_empty_table_is_error() {
        assert!(matches!(
            index(&[&["", "", ""]]),
            Err(AuditError::IndexLoad(_))
        ));
    }

    #[test]
    fn test_load_from_file_with_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("KW.csv");
        std::fs::write(
            &path,
            "KW;Nr;Mo;Di\nKW;9;26.02.2024;27.02.2024\nKW;10;04.03.2024\n;;;\n",
        )
        .unwrap();

        let idx = CalendarWeekIndex::load(&path, true).unwrap();
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.lookup("27.02.2024"), Some("KW 9"));
        assert_eq!(idx.lookup("04.03.2024"), Some("KW 10"));
        assert_eq!(idx.lookup("Mo"), None);
    }

    #[test]
    fn test_load_without_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("KW.csv");
        std::fs::write(&path, "KW;9;26.02.2024\n").unwrap();

        let idx = CalendarWeekIndex::load(&path, false).unwrap();
        assert_eq!(idx.lookup("26.02.2024"), Some("KW 9"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = CalendarWeekIndex::load(Path::new("/tmp/no-such-kw-table.csv"), true)
            .unwrap_err();
        assert!(matches!(err, AuditError::IndexLoad(_)));
    }
}
