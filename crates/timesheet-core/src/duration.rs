use crate::error::{AuditError, Result};

// ── DurationParser ────────────────────────────────────────────────────────────

/// Converts exported duration strings into fractional hours.
pub struct DurationParser;

impl DurationParser {
    /// Parse `H...H:MM[:SS]` into `hours + minutes / 60`.
    ///
    /// The hour segment may have any number of digits, the minute segment must
    /// have exactly two. Seconds are ignored and nothing is rounded.
    ///
    /// ```
    /// use timesheet_core::duration::DurationParser;
    ///
    /// assert_eq!(DurationParser::parse("08:30:00").unwrap(), 8.5);
    /// assert_eq!(DurationParser::parse("0:15:00").unwrap(), 0.25);
    /// assert!(DurationParser::parse("8.5").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<f64> {
        let trimmed = value.trim();
        let malformed = || AuditError::MalformedDuration(value.to_string());

        let mut segments = trimmed.split(':');
        let hours = segments.next().ok_or_else(malformed)?;
        let minutes = segments.next().ok_or_else(malformed)?;

        if !is_digits(hours) || !is_digits(minutes) || minutes.len() != 2 {
            return Err(malformed());
        }

        let hours: u32 = hours.parse().map_err(|_| malformed())?;
        let minutes: u32 = minutes.parse().map_err(|_| malformed())?;

        Ok(f64::from(hours) + f64::from(minutes) / 60.0)
    }
}

fn is_digits(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_half_hour() {
        assert_eq!(DurationParser::parse("08:30:00").unwrap(), 8.5);
    }

    #[test]
    fn test_parse_single_digit_hours() {
        assert_eq!(DurationParser::parse("0:15:00").unwrap(), 0.25);
    }

    #[test]
    fn test_parse_many_hour_digits() {
        assert_eq!(DurationParser::parse("120:45:00").unwrap(), 120.75);
    }

    #[test]
    fn test_parse_ignores_seconds() {
        assert_eq!(DurationParser::parse("01:00:59").unwrap(), 1.0);
    }

    #[test]
    fn test_parse_without_seconds() {
        assert_eq!(DurationParser::parse("2:30").unwrap(), 2.5);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(DurationParser::parse(" 03:00:00\r").unwrap(), 3.0);
    }

    #[test]
    fn test_parse_does_not_round() {
        let hours = DurationParser::parse("00:10:00").unwrap();
        assert!((hours - 10.0 / 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        let err = DurationParser::parse("0830").unwrap_err();
        assert!(matches!(err, AuditError::MalformedDuration(s) if s == "0830"));
    }

    #[test]
    fn test_parse_rejects_non_numeric_hours() {
        assert!(DurationParser::parse("ab:30:00").is_err());
        assert!(DurationParser::parse(":30:00").is_err());
        assert!(DurationParser::parse("-1:30:00").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_minutes() {
        assert!(DurationParser::parse("08:3:00").is_err());
        assert!(DurationParser::parse("08:xx:00").is_err());
        assert!(DurationParser::parse("08:").is_err());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(DurationParser::parse("").is_err());
    }

    #[test]
    fn test_parse_is_monotonic() {
        let mut previous = -1.0;
        for hours in 0..12 {
            for minutes in 0..60 {
                let value = DurationParser::parse(&format!("{hours:02}:{minutes:02}:00")).unwrap();
                assert!(value > previous, "{hours}:{minutes} not increasing");
                previous = value;
            }
        }
    }
}
