use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One retained row of a raw export: the worked date and the duration string
/// exactly as exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRecord {
    /// Calendar date in `DD.MM.YYYY` form.
    pub date: String,
    /// Worked time in `H:MM:SS` form. Never empty and never the zero sentinel.
    pub duration: String,
}

impl TimeRecord {
    pub fn new(date: impl Into<String>, duration: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            duration: duration.into(),
        }
    }
}

/// All retained records of one student, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentDataset {
    /// Filesystem-safe owner name, e.g. `"Mueller_Anna"`.
    pub owner_name: String,
    /// Records in the order they appear in the export.
    pub records: Vec<TimeRecord>,
}

// ── ExportSchema ──────────────────────────────────────────────────────────────

/// Row and field layout of a raw attendance export.
///
/// All row numbers and field positions are 0-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSchema {
    /// Row holding the student's surname and first name.
    pub name_row: usize,
    /// First row that may contain a time entry.
    pub data_start_row: usize,
    /// Regular expression; the first matching line ends the time entries.
    pub terminator: String,
    /// Duration value that marks a day without worked time.
    pub zero_duration: String,
    /// Field separator used by the export.
    pub delimiter: char,
    pub surname_field: usize,
    pub first_name_field: usize,
    pub date_field: usize,
    pub duration_field: usize,
}

/// Marker line that closes the list of time entries in an export.
pub const DEFAULT_TERMINATOR: &str = "Summe der Einsatzzeiten";

/// Duration written for days without worked time.
pub const ZERO_DURATION: &str = "00:00:00";

impl Default for ExportSchema {
    fn default() -> Self {
        Self {
            name_row: 7,
            data_start_row: 14,
            terminator: DEFAULT_TERMINATOR.to_string(),
            zero_duration: ZERO_DURATION.to_string(),
            delimiter: ';',
            surname_field: 1,
            first_name_field: 5,
            date_field: 1,
            duration_field: 4,
        }
    }
}

impl ExportSchema {
    /// Number of fields a time-entry row must have.
    pub fn min_data_fields(&self) -> usize {
        self.date_field.max(self.duration_field) + 1
    }

    /// Number of fields the name row must have.
    pub fn min_name_fields(&self) -> usize {
        self.surname_field.max(self.first_name_field) + 1
    }
}

// ── PeriodTotals ──────────────────────────────────────────────────────────────

/// Hours accumulated per period key (week label or month key).
///
/// Keys keep the order in which they were first added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodTotals {
    order: Vec<String>,
    hours: HashMap<String, f64>,
}

impl PeriodTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `hours` to the bucket `key`, creating it at zero if absent.
    pub fn add(&mut self, key: &str, hours: f64) {
        match self.hours.get_mut(key) {
            Some(total) => *total += hours,
            None => {
                self.order.push(key.to_string());
                self.hours.insert(key.to_string(), hours);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.hours.get(key).copied()
    }

    /// Iterate `(key, hours)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.order
            .iter()
            .map(move |key| (key.as_str(), self.hours[key]))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    /// Sum over all buckets.
    pub fn total(&self) -> f64 {
        self.hours.values().sum()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Reorder keys by `key_fn`. Ties keep their current relative order.
    pub fn sort_by_key<K: Ord>(&mut self, mut key_fn: impl FnMut(&str) -> K) {
        self.order.sort_by_cached_key(|key| key_fn(key));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_matches_export_layout() {
        let schema = ExportSchema::default();
        assert_eq!(schema.name_row, 7);
        assert_eq!(schema.data_start_row, 14);
        assert_eq!(schema.terminator, "Summe der Einsatzzeiten");
        assert_eq!(schema.zero_duration, "00:00:00");
        assert_eq!(schema.delimiter, ';');
        assert_eq!(schema.min_data_fields(), 5);
        assert_eq!(schema.min_name_fields(), 6);
    }

    #[test]
    fn test_schema_partial_json_uses_defaults() {
        let schema: ExportSchema =
            serde_json::from_str(r#"{"name_row": 2, "data_start_row": 5}"#).unwrap();
        assert_eq!(schema.name_row, 2);
        assert_eq!(schema.data_start_row, 5);
        assert_eq!(schema.terminator, DEFAULT_TERMINATOR);
        assert_eq!(schema.duration_field, 4);
    }

    #[test]
    fn test_period_totals_accumulates() {
        let mut totals = PeriodTotals::new();
        totals.add("KW 1", 4.0);
        totals.add("KW 1", 2.5);
        assert_eq!(totals.get("KW 1"), Some(6.5));
        assert_eq!(totals.len(), 1);
    }

    #[test]
    fn test_period_totals_keeps_first_seen_order() {
        let mut totals = PeriodTotals::new();
        totals.add("KW 9", 1.0);
        totals.add("KW 2", 1.0);
        totals.add("KW 9", 1.0);
        totals.add("KW 5", 1.0);
        let keys: Vec<&str> = totals.keys().collect();
        assert_eq!(keys, vec!["KW 9", "KW 2", "KW 5"]);
    }

    #[test]
    fn test_period_totals_sort_by_key() {
        let mut totals = PeriodTotals::new();
        totals.add("b", 1.0);
        totals.add("c", 2.0);
        totals.add("a", 3.0);
        totals.sort_by_key(|k| k.to_string());
        let pairs: Vec<(&str, f64)> = totals.iter().collect();
        assert_eq!(pairs, vec![("a", 3.0), ("b", 1.0), ("c", 2.0)]);
    }

    #[test]
    fn test_period_totals_total_and_empty() {
        let mut totals = PeriodTotals::new();
        assert!(totals.is_empty());
        assert_eq!(totals.total(), 0.0);
        totals.add("032024", 1.5);
        totals.add("042024", 2.0);
        assert!((totals.total() - 3.5).abs() < 1e-9);
        assert!(totals.get("052024").is_none());
    }
}
