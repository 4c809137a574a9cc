use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the timesheet audit.
#[derive(Error, Debug)]
pub enum AuditError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A raw export does not have the expected row layout.
    #[error("Malformed export at line {line}: {reason}")]
    Extraction { line: usize, reason: String },

    /// A duration string is not of the form `H:MM[:SS]`.
    #[error("Malformed duration: {0:?}")]
    MalformedDuration(String),

    /// A date string is not of the form `DD.MM.YYYY`.
    #[error("Malformed date: {0:?}")]
    MalformedDate(String),

    /// The calendar-week table is missing or malformed.
    #[error("Could not load calendar-week table: {0}")]
    IndexLoad(String),

    /// An output file could not be persisted.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The expected input directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the timesheet crates.
pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = AuditError::FileRead {
            path: PathBuf::from("/exports/mueller.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/exports/mueller.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_extraction() {
        let err = AuditError::Extraction {
            line: 7,
            reason: "expected at least 6 fields, found 2".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed export at line 7: expected at least 6 fields, found 2"
        );
    }

    #[test]
    fn test_error_display_malformed_duration() {
        let err = AuditError::MalformedDuration("ab:30".to_string());
        assert_eq!(err.to_string(), "Malformed duration: \"ab:30\"");
    }

    #[test]
    fn test_error_display_index_load() {
        let err = AuditError::IndexLoad("row 3 has 1 column".to_string());
        assert_eq!(
            err.to_string(),
            "Could not load calendar-week table: row 3 has 1 column"
        );
    }

    #[test]
    fn test_error_display_write() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AuditError::Write {
            path: PathBuf::from("/output/Mueller_Anna_result.txt"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to write /output/Mueller_Anna_result.txt"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_error_display_data_path_not_found() {
        let err = AuditError::DataPathNotFound(PathBuf::from("/missing/dir"));
        assert_eq!(err.to_string(), "Data path not found: /missing/dir");
    }

    #[test]
    fn test_error_display_config() {
        let err = AuditError::Config("weekly cap must be non-negative".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: weekly cap must be non-negative"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AuditError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: AuditError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
