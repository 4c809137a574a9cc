//! Hour aggregation over calendar weeks and calendar months.

use std::collections::HashSet;

use timesheet_core::duration::DurationParser;
use timesheet_core::error::{AuditError, Result};
use timesheet_core::models::{PeriodTotals, TimeRecord};

use crate::calendar::CalendarWeekIndex;

// ── Result types ──────────────────────────────────────────────────────────────

/// Weekly totals plus the dates that matched no calendar week.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklyAggregation {
    pub totals: PeriodTotals,
    /// Distinct unmatched dates in first-seen order.
    pub unmatched_dates: Vec<String>,
}

/// Both aggregations of one student's records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentTotals {
    /// Keyed by week label, e.g. `"KW 9"`.
    pub weekly: PeriodTotals,
    /// Keyed by `"MMYYYY"`, e.g. `"032024"`.
    pub monthly: PeriodTotals,
    pub unmatched_dates: Vec<String>,
}

// ── HoursAggregator ───────────────────────────────────────────────────────────

/// Stateless helper that sums worked hours per week and per month.
pub struct HoursAggregator;

impl HoursAggregator {
    /// Run the weekly and the monthly fold over `records`.
    ///
    /// Records whose date is not in `index` count toward their month only.
    pub fn aggregate(records: &[TimeRecord], index: &CalendarWeekIndex) -> Result<StudentTotals> {
        let weekly = Self::aggregate_weekly(records, index)?;
        let monthly = Self::aggregate_monthly(records)?;
        Ok(StudentTotals {
            weekly: weekly.totals,
            monthly,
            unmatched_dates: weekly.unmatched_dates,
        })
    }

    /// Sum hours per calendar week. Keys appear in the order their first
    /// record appears.
    pub fn aggregate_weekly(
        records: &[TimeRecord],
        index: &CalendarWeekIndex,
    ) -> Result<WeeklyAggregation> {
        let mut aggregation = WeeklyAggregation::default();
        let mut seen_unmatched = HashSet::new();

        for record in records {
            let hours = DurationParser::parse(&record.duration)?;
            match index.lookup(&record.date) {
                Some(label) => aggregation.totals.add(label, hours),
                None => {
                    if seen_unmatched.insert(record.date.as_str()) {
                        aggregation.unmatched_dates.push(record.date.clone());
                    }
                }
            }
        }

        Ok(aggregation)
    }

    /// Sum hours per calendar month, keyed `"MMYYYY"`.
    pub fn aggregate_monthly(records: &[TimeRecord]) -> Result<PeriodTotals> {
        let mut totals = PeriodTotals::new();
        for record in records {
            let hours = DurationParser::parse(&record.duration)?;
            totals.add(&Self::month_key(&record.date)?, hours);
        }
        Ok(totals)
    }

    /// Month key of a `DD.MM.YYYY` date: characters 3..5 followed by 6..10.
    pub fn month_key(date: &str) -> Result<String> {
        let date = date.trim();
        match (date.get(3..5), date.get(6..10)) {
            (Some(month), Some(year)) if is_digits(month) && is_digits(year) => {
                Ok(format!("{month}{year}"))
            }
            _ => Err(AuditError::MalformedDate(date.to_string())),
        }
    }

    /// Sort key that orders month keys by year, then month.
    pub fn month_order(key: &str) -> (String, String) {
        let month = key.get(..2).unwrap_or_default().to_string();
        let year = key.get(2..).unwrap_or_default().to_string();
        (year, month)
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
