//! Extraction of time records from raw attendance exports.
//!
//! An export is a semicolon-separated file whose rows do not share a schema:
//! one fixed row carries the student's name, time entries start at another
//! fixed row, and a summary line closes the list of entries. The layout is
//! described by an [`ExportSchema`].

use regex::Regex;
use timesheet_core::error::{AuditError, Result};
use timesheet_core::models::{ExportSchema, StudentDataset, TimeRecord};
use tracing::{debug, warn};

/// Characters removed from owner names so they can be used as file names.
const UNSAFE_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

// ── RecordExtractor ───────────────────────────────────────────────────────────

/// Turns the lines of one export into a [`StudentDataset`].
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    schema: ExportSchema,
    terminator: Regex,
}

impl RecordExtractor {
    /// Build an extractor; fails when the schema's terminator is not a valid
    /// regular expression.
    pub fn new(schema: ExportSchema) -> Result<Self> {
        let terminator = Regex::new(&schema.terminator).map_err(|e| {
            AuditError::Config(format!("invalid terminator pattern: {e}"))
        })?;
        Ok(Self { schema, terminator })
    }

    pub fn schema(&self) -> &ExportSchema {
        &self.schema
    }

    /// Extract the owner name and all retained time records from `lines`.
    ///
    /// `fallback_name` is used when the export ends before the name row.
    /// Rows at or after the first terminator line are never emitted.
    pub fn extract<S: AsRef<str>>(
        &self,
        lines: &[S],
        fallback_name: &str,
    ) -> Result<StudentDataset> {
        let schema = &self.schema;
        let mut owner_name = None;
        let mut in_entries = true;
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (index, line) in lines.iter().enumerate() {
            let line = line.as_ref();

            if in_entries && self.terminator.is_match(line) {
                in_entries = false;
            }

            if index == schema.name_row {
                owner_name = Some(self.parse_owner_name(line, index)?);
            }

            if in_entries && index >= schema.data_start_row {
                match self.parse_entry(line, index)? {
                    Some(record) => records.push(record),
                    None => skipped += 1,
                }
            }

            // Nothing left to extract once both the name and the entries are done.
            if !in_entries && index >= schema.name_row {
                break;
            }
        }

        let owner_name = match owner_name {
            Some(name) => name,
            None => {
                warn!(
                    "Export ends before name row {}; using {:?} as owner name",
                    schema.name_row, fallback_name
                );
                sanitize_name(fallback_name)
            }
        };

        debug!(
            "Extracted {} records for {} ({} rows skipped)",
            records.len(),
            owner_name,
            skipped
        );

        Ok(StudentDataset {
            owner_name,
            records,
        })
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        line.split(self.schema.delimiter).map(clean_field).collect()
    }

    fn parse_owner_name(&self, line: &str, index: usize) -> Result<String> {
        let fields = self.split(line);
        let needed = self.schema.min_name_fields();
        if fields.len() < needed {
            return Err(AuditError::Extraction {
                line: index + 1,
                reason: format!(
                    "name row needs at least {needed} fields, found {}",
                    fields.len()
                ),
            });
        }

        let surname = sanitize_name(fields[self.schema.surname_field]);
        let first_name = sanitize_name(fields[self.schema.first_name_field]);
        if surname.is_empty() && first_name.is_empty() {
            return Err(AuditError::Extraction {
                line: index + 1,
                reason: "name row contains no name".to_string(),
            });
        }

        Ok(format!("{surname}_{first_name}"))
    }

    /// `Ok(None)` for rows that carry no worked time.
    fn parse_entry(&self, line: &str, index: usize) -> Result<Option<TimeRecord>> {
        let fields = self.split(line);

        // Rows without a date carry no time, however short they are.
        let date = match fields.get(self.schema.date_field) {
            Some(date) if !date.is_empty() => *date,
            _ => return Ok(None),
        };

        let duration = match fields.get(self.schema.duration_field) {
            Some(duration) => *duration,
            None => {
                return Err(AuditError::Extraction {
                    line: index + 1,
                    reason: format!(
                        "time entry needs at least {} fields, found {}",
                        self.schema.min_data_fields(),
                        fields.len()
                    ),
                })
            }
        };
        if duration.is_empty() || duration == self.schema.zero_duration {
            return Ok(None);
        }

        Ok(Some(TimeRecord::new(date, duration)))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn clean_field(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

/// Remove all whitespace and path-unsafe characters from a name part.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !UNSAFE_NAME_CHARS.contains(c))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an export in the default layout: header rows, the name on row 7,
    /// `entries` from row 14 on, then the summary line and `trailer`.
    fn export(entries: &[&str], trailer: &[&str]) -> Vec<String> {
        let mut lines: Vec<String> = (0..7).map(|i| format!("Kopfzeile {i};;;;;")).collect();
        lines.push("Name:;Müller ; ;;Vorname:; Anna Lena ;".to_string());
        lines.extend((8..14).map(|i| format!("Info {i};;;;;")));
        lines.extend(entries.iter().map(|e| e.to_string()));
        lines.push(";Summe der Einsatzzeiten;;;42:00:00;".to_string());
        lines.extend(trailer.iter().map(|t| t.to_string()));
        lines
    }

    fn extractor() -> RecordExtractor {
        RecordExtractor::new(ExportSchema::default()).unwrap()
    }

    #[test]
    fn test_extracts_owner_name_without_whitespace() {
        let dataset = extractor().extract(&export(&[], &[]), "fallback").unwrap();
        assert_eq!(dataset.owner_name, "Müller_AnnaLena");
    }

    #[test]
    fn test_extracts_records_in_file_order() {
        let lines = export(
            &[
                "Mo;04.03.2024;08:00;12:00;04:00:00;",
                "Fr;01.03.2024;09:00;17:30;08:30:00;",
            ],
            &[],
        );
        let dataset = extractor().extract(&lines, "fallback").unwrap();
        assert_eq!(
            dataset.records,
            vec![
                TimeRecord::new("04.03.2024", "04:00:00"),
                TimeRecord::new("01.03.2024", "08:30:00"),
            ]
        );
    }

    #[test]
    fn test_skips_empty_dates_zero_durations_and_blank_rows() {
        let lines = export(
            &[
                "Sa;;;;;",
                "So;03.03.2024;;;00:00:00;",
                "",
                "Mo;04.03.2024;;;;",
                "Di;05.03.2024;10:00;12:00;02:00:00;",
            ],
            &[],
        );
        let dataset = extractor().extract(&lines, "fallback").unwrap();
        assert_eq!(
            dataset.records,
            vec![TimeRecord::new("05.03.2024", "02:00:00")]
        );
        assert!(dataset
            .records
            .iter()
            .all(|r| !r.date.is_empty() && r.duration != ZERO));
    }

    const ZERO: &str = "00:00:00";

    #[test]
    fn test_rows_after_terminator_are_ignored() {
        let lines = export(
            &["Mo;04.03.2024;;;04:00:00;"],
            &[
                "Mo;11.03.2024;;;05:00:00;",
                "Di;12.03.2024;;;06:00:00;",
                "garbage",
            ],
        );
        let dataset = extractor().extract(&lines, "fallback").unwrap();
        assert_eq!(dataset.records.len(), 1);
        assert_eq!(dataset.records[0].date, "04.03.2024");
    }

    #[test]
    fn test_rows_before_data_start_are_ignored() {
        let mut lines = export(&[], &[]);
        lines[10] = "Mo;04.03.2024;;;04:00:00;".to_string();
        let dataset = extractor().extract(&lines, "fallback").unwrap();
        assert!(dataset.records.is_empty());
    }

    #[test]
    fn test_terminator_before_data_start_yields_no_records() {
        let mut lines = export(&["Mo;04.03.2024;;;04:00:00;"], &[]);
        lines[9] = "Summe der Einsatzzeiten".to_string();
        let dataset = extractor().extract(&lines, "fallback").unwrap();
        assert!(dataset.records.is_empty());
        assert_eq!(dataset.owner_name, "Müller_AnnaLena");
    }

    #[test]
    fn test_short_entry_row_is_extraction_error() {
        let lines = export(&["Mo;04.03.2024"], &[]);
        let err = extractor().extract(&lines, "fallback").unwrap_err();
        match err {
            AuditError::Extraction { line, .. } => assert_eq!(line, 15),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_row_without_date_is_skipped() {
        let lines = export(
            &[
                "Mo;04.03.2024;;;04:00:00;",
                "KW 10;",
                "x;",
                "Summe",
                "Di;05.03.2024;;;02:00:00;",
            ],
            &[],
        );
        let dataset = extractor().extract(&lines, "fallback").unwrap();
        assert_eq!(
            dataset.records,
            vec![
                TimeRecord::new("04.03.2024", "04:00:00"),
                TimeRecord::new("05.03.2024", "02:00:00"),
            ]
        );
    }

    #[test]
    fn test_short_name_row_is_extraction_error() {
        let mut lines = export(&[], &[]);
        lines[7] = "Name:;Müller".to_string();
        let err = extractor().extract(&lines, "fallback").unwrap_err();
        assert!(matches!(err, AuditError::Extraction { line: 8, .. }));
    }

    #[test]
    fn test_short_export_uses_fallback_name() {
        let lines = vec!["Kopfzeile;;", "Kopfzeile;;"];
        let dataset = extractor().extract(&lines, "Mueller Anna").unwrap();
        assert_eq!(dataset.owner_name, "MuellerAnna");
        assert!(dataset.records.is_empty());
    }

    #[test]
    fn test_quoted_fields_are_unquoted() {
        let lines = export(&["\"Mo\";\"04.03.2024\";;;\"04:00:00\";"], &[]);
        let dataset = extractor().extract(&lines, "fallback").unwrap();
        assert_eq!(
            dataset.records,
            vec![TimeRecord::new("04.03.2024", "04:00:00")]
        );
    }

    #[test]
    fn test_custom_schema() {
        let schema = ExportSchema {
            name_row: 0,
            data_start_row: 1,
            terminator: "^TOTAL".to_string(),
            surname_field: 0,
            first_name_field: 1,
            date_field: 0,
            duration_field: 1,
            ..ExportSchema::default()
        };
        let lines = vec![
            "Schmidt;Ben",
            "01.03.2024;03:00:00",
            "02.03.2024;00:00:00",
            "TOTAL;03:00:00",
            "03.03.2024;05:00:00",
        ];
        let dataset = RecordExtractor::new(schema)
            .unwrap()
            .extract(&lines, "fallback")
            .unwrap();
        assert_eq!(dataset.owner_name, "Schmidt_Ben");
        assert_eq!(
            dataset.records,
            vec![TimeRecord::new("01.03.2024", "03:00:00")]
        );
    }

    #[test]
    fn test_invalid_terminator_pattern() {
        let schema = ExportSchema {
            terminator: "(unclosed".to_string(),
            ..ExportSchema::default()
        };
        assert!(matches!(
            RecordExtractor::new(schema),
            Err(AuditError::Config(_))
        ));
    }

    #[test]
    fn test_sanitize_name_drops_separators() {
        assert_eq!(sanitize_name(" von der/Au "), "vonderAu");
        assert_eq!(sanitize_name("O'Neil\t"), "O'Neil");
    }
}
