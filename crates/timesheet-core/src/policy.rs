use crate::error::{AuditError, Result};
use crate::formatting::format_month_key;
use crate::models::PeriodTotals;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Limits ────────────────────────────────────────────────────────────────────

/// Maximum hours a student may work in one calendar week.
pub const DEFAULT_WEEKLY_CAP: f64 = 10.0;

/// Maximum hours a student may work in one calendar month.
pub const DEFAULT_MONTHLY_CAP: f64 = 20.0;

/// Weekly and monthly work-hour caps applied to one student.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourLimits {
    pub weekly_cap: f64,
    pub monthly_cap: f64,
}

impl Default for HourLimits {
    fn default() -> Self {
        Self {
            weekly_cap: DEFAULT_WEEKLY_CAP,
            monthly_cap: DEFAULT_MONTHLY_CAP,
        }
    }
}

impl HourLimits {
    /// Build limits, rejecting negative or non-finite caps.
    pub fn new(weekly_cap: f64, monthly_cap: f64) -> Result<Self> {
        validate_cap("weekly", weekly_cap)?;
        validate_cap("monthly", monthly_cap)?;
        Ok(Self {
            weekly_cap,
            monthly_cap,
        })
    }

    /// Apply the caps present in `overrides` on top of `self`.
    pub fn with_override(&self, overrides: &LimitOverride) -> Result<Self> {
        Self::new(
            overrides.weekly_cap.unwrap_or(self.weekly_cap),
            overrides.monthly_cap.unwrap_or(self.monthly_cap),
        )
    }
}

fn validate_cap(name: &str, cap: f64) -> Result<()> {
    if cap.is_finite() && cap >= 0.0 {
        Ok(())
    } else {
        Err(AuditError::Config(format!(
            "{name} cap must be a non-negative number, got {cap}"
        )))
    }
}

/// Per-student replacement for one or both caps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_cap: Option<f64>,
}

// ── ReportOrder ───────────────────────────────────────────────────────────────

/// Order in which violating weeks and months are listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportOrder {
    /// Order in which each period first appears in the student's records.
    #[default]
    FirstSeen,
    /// Calendar-table order for weeks, year then month for months.
    Chronological,
}

impl FromStr for ReportOrder {
    type Err = AuditError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "first-seen" => Ok(ReportOrder::FirstSeen),
            "chronological" => Ok(ReportOrder::Chronological),
            other => Err(AuditError::Config(format!("unknown report order: {other}"))),
        }
    }
}

impl ReportOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportOrder::FirstSeen => "first-seen",
            ReportOrder::Chronological => "chronological",
        }
    }
}

// ── ViolationReport ───────────────────────────────────────────────────────────

/// Weeks and months in which a student worked more than allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationReport {
    pub weekly_cap: f64,
    pub monthly_cap: f64,
    /// Week labels over the weekly cap, e.g. `"KW 9"`.
    pub weeks: Vec<String>,
    /// Months over the monthly cap as `"MM.YYYY"`.
    pub months: Vec<String>,
}

impl ViolationReport {
    pub fn violation_count(&self) -> usize {
        self.weeks.len() + self.months.len()
    }

    pub fn is_compliant(&self) -> bool {
        self.violation_count() == 0
    }
}

impl fmt::Display for ViolationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Worked more than {} hours in the following weeks:",
            self.weekly_cap
        )?;
        for week in &self.weeks {
            writeln!(f, "{week}")?;
        }
        writeln!(
            f,
            "Worked more than {} hours in the following months:",
            self.monthly_cap
        )?;
        for month in &self.months {
            writeln!(f, "{month}")?;
        }
        Ok(())
    }
}

// ── PolicyChecker ─────────────────────────────────────────────────────────────

/// Compares aggregated hours against [`HourLimits`].
pub struct PolicyChecker;

impl PolicyChecker {
    /// List every week and month whose total is strictly greater than its
    /// cap, in the iteration order of the given totals.
    pub fn check(
        weekly: &PeriodTotals,
        monthly: &PeriodTotals,
        limits: &HourLimits,
    ) -> ViolationReport {
        let weeks = weekly
            .iter()
            .filter(|(_, hours)| *hours > limits.weekly_cap)
            .map(|(label, _)| label.to_string())
            .collect();

        let months = monthly
            .iter()
            .filter(|(_, hours)| *hours > limits.monthly_cap)
            .map(|(key, _)| format_month_key(key))
            .collect();

        ViolationReport {
            weekly_cap: limits.weekly_cap,
            monthly_cap: limits.monthly_cap,
            weeks,
            months,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
