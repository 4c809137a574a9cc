//! Per-student audit pipeline.
//!
//! Runs extraction → aggregation → policy check → report for every export in
//! the input directory. Each student is processed on its own: a failure is
//! written into that student's report and the run moves on, unless the run is
//! configured to fail fast.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use timesheet_core::error::{AuditError, Result};
use timesheet_core::formatting::format_hours;
use timesheet_core::models::StudentDataset;
use timesheet_core::policy::{HourLimits, PolicyChecker, ReportOrder, ViolationReport};
use timesheet_core::settings::{RunConfig, Stage};
use timesheet_data::aggregator::{HoursAggregator, StudentTotals};
use timesheet_data::calendar::CalendarWeekIndex;
use timesheet_data::extractor::RecordExtractor;
use timesheet_data::reader::{file_stem_name, find_export_files, read_lines};
use timesheet_data::table::read_normalized;
use tracing::{debug, error, info, warn};

use crate::output;

// ── Single-student audit ──────────────────────────────────────────────────────

/// Totals and violations of one student.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentAudit {
    pub owner_name: String,
    pub limits: HourLimits,
    pub totals: StudentTotals,
    pub report: ViolationReport,
}

/// Aggregate `dataset` and check it against `limits`.
pub fn audit_dataset(
    dataset: &StudentDataset,
    index: &CalendarWeekIndex,
    limits: &HourLimits,
    order: ReportOrder,
) -> Result<StudentAudit> {
    let mut totals = HoursAggregator::aggregate(&dataset.records, index)?;

    if order == ReportOrder::Chronological {
        totals
            .weekly
            .sort_by_key(|label| index.position(label).unwrap_or(usize::MAX));
        totals.monthly.sort_by_key(HoursAggregator::month_order);
    }
    sort_dates_chronologically(&mut totals.unmatched_dates);

    let report = PolicyChecker::check(&totals.weekly, &totals.monthly, limits);

    Ok(StudentAudit {
        owner_name: dataset.owner_name.clone(),
        limits: *limits,
        totals,
        report,
    })
}

/// Sort `DD.MM.YYYY` dates by calendar date; unparseable dates go last.
pub fn sort_dates_chronologically(dates: &mut [String]) {
    dates.sort_by_cached_key(|date| {
        let parsed = NaiveDate::parse_from_str(date.trim(), "%d.%m.%Y").ok();
        (parsed.is_none(), parsed)
    });
}

// ── Run summary ───────────────────────────────────────────────────────────────

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StudentOutcome {
    /// The student was checked and a report was written.
    Audited {
        source: PathBuf,
        owner_name: String,
        records: usize,
        weeks_over_cap: Vec<String>,
        months_over_cap: Vec<String>,
        unmatched_dates: Vec<String>,
        report: PathBuf,
    },
    /// The export was normalized but not checked (`preprocess` stage).
    Normalized {
        source: PathBuf,
        owner_name: String,
        records: usize,
        table: PathBuf,
    },
    /// The student could not be processed.
    Failed {
        source: PathBuf,
        owner_name: String,
        error: String,
        report: Option<PathBuf>,
    },
}

impl StudentOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StudentOutcome::Failed { .. })
    }

    pub fn has_violations(&self) -> bool {
        match self {
            StudentOutcome::Audited {
                weeks_over_cap,
                months_over_cap,
                ..
            } => !weeks_over_cap.is_empty() || !months_over_cap.is_empty(),
            _ => false,
        }
    }
}

/// Counts and per-file outcomes of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// RFC 3339 timestamp when the run finished.
    pub generated_at: String,
    pub input_dir: PathBuf,
    pub files_found: usize,
    pub succeeded: usize,
    pub with_violations: usize,
    pub failed: usize,
    pub outcomes: Vec<StudentOutcome>,
}

impl RunSummary {
    fn from_outcomes(input_dir: &Path, outcomes: Vec<StudentOutcome>) -> Self {
        let failed = outcomes.iter().filter(|o| o.is_failure()).count();
        let with_violations = outcomes.iter().filter(|o| o.has_violations()).count();
        Self {
            generated_at: Utc::now().to_rfc3339(),
            input_dir: input_dir.to_path_buf(),
            files_found: outcomes.len(),
            succeeded: outcomes.len() - failed,
            with_violations,
            failed,
            outcomes,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ── AuditRunner ───────────────────────────────────────────────────────────────

/// Drives one audit run over a directory of inputs.
pub struct AuditRunner<'a> {
    config: &'a RunConfig,
    extractor: RecordExtractor,
    /// Absent in the `preprocess` stage, which never checks limits.
    index: Option<CalendarWeekIndex>,
}

impl<'a> AuditRunner<'a> {
    /// Prepare a run. Loading the calendar-week table is the only step whose
    /// failure aborts the whole run up front.
    pub fn new(config: &'a RunConfig) -> Result<Self> {
        let extractor = RecordExtractor::new(config.schema.clone())?;
        debug!(
            "Export layout: name on row {}, entries from row {} until {:?}",
            extractor.schema().name_row,
            extractor.schema().data_start_row,
            extractor.schema().terminator
        );
        let index = match config.stage {
            Stage::Preprocess => None,
            Stage::All | Stage::Check => Some(CalendarWeekIndex::load(
                &config.week_table,
                config.week_table_header,
            )?),
        };
        Ok(Self {
            config,
            extractor,
            index,
        })
    }

    /// Directory scanned for inputs in the configured stage.
    pub fn input_dir(&self) -> &Path {
        match self.config.stage {
            Stage::Check => &self.config.normalized_dir,
            Stage::All | Stage::Preprocess => &self.config.input_dir,
        }
    }

    /// List the input files of the configured stage.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let extension = match self.config.stage {
            Stage::Check => "csv",
            Stage::All | Stage::Preprocess => self.config.extension.as_str(),
        };
        find_export_files(self.input_dir(), extension)
    }

    /// Discover and process all inputs.
    pub fn run(&self) -> Result<RunSummary> {
        let files = self.discover()?;
        self.run_files(&files)
    }

    /// Process `files` one after another and write the run summary.
    ///
    /// Returns `Err` only for fail-fast runs or when the summary itself
    /// cannot be written.
    pub fn run_files(&self, files: &[PathBuf]) -> Result<RunSummary> {
        let mut outcomes = Vec::with_capacity(files.len());
        let mut seen_owners = HashSet::new();

        for path in files {
            let mut owner_name = None;
            let outcome = match self.process_file(path, &mut owner_name) {
                Ok(outcome) => outcome,
                Err(e) => {
                    let owner_name = owner_name.unwrap_or_else(|| file_stem_name(path));
                    error!("Could not audit {}: {}", path.display(), e);
                    if self.config.fail_fast {
                        return Err(e);
                    }
                    self.record_failure(path, owner_name, &e)
                }
            };

            if let Some(owner) = outcome_owner(&outcome) {
                if !seen_owners.insert(owner.to_string()) {
                    warn!(
                        "{} appears in more than one input; the later report replaces the earlier one",
                        owner
                    );
                }
            }
            outcomes.push(outcome);
        }

        let summary = RunSummary::from_outcomes(self.input_dir(), outcomes);
        let summary_path = self.config.output_dir.join(output::SUMMARY_FILE_NAME);
        output::write_atomic(&summary_path, summary.to_json()?.as_bytes())?;
        info!(
            "Processed {} files: {} succeeded, {} with violations, {} failed",
            summary.files_found, summary.succeeded, summary.with_violations, summary.failed
        );

        Ok(summary)
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Run the configured stage for one file. `owner_name` is filled in as
    /// soon as it is known so that failures can be attributed.
    fn process_file(&self, path: &Path, owner_name: &mut Option<String>) -> Result<StudentOutcome> {
        debug!("Processing {}", path.display());

        let dataset = match self.config.stage {
            Stage::Check => read_normalized(path, &file_stem_name(path))?,
            Stage::All | Stage::Preprocess => {
                let lines = read_lines(path)?;
                self.extractor.extract(&lines, &file_stem_name(path))?
            }
        };
        *owner_name = Some(dataset.owner_name.clone());

        if self.config.stage != Stage::Check {
            let table = output::write_normalized(&self.config.normalized_dir, &dataset)?;
            if self.config.stage == Stage::Preprocess {
                info!(
                    "{}: normalized {} records into {}",
                    dataset.owner_name,
                    dataset.records.len(),
                    table.display()
                );
                return Ok(StudentOutcome::Normalized {
                    source: path.to_path_buf(),
                    owner_name: dataset.owner_name,
                    records: dataset.records.len(),
                    table,
                });
            }
        }

        let index = self.index.as_ref().ok_or_else(|| {
            AuditError::Config("calendar-week table was not loaded".to_string())
        })?;
        let limits = self.config.limits_for(&dataset.owner_name)?;
        let audit = audit_dataset(&dataset, index, &limits, self.config.order)?;

        if !audit.totals.unmatched_dates.is_empty() {
            warn!(
                "{}: {} date(s) not in the calendar-week table, counted for months only: {}",
                audit.owner_name,
                audit.totals.unmatched_dates.len(),
                audit.totals.unmatched_dates.join(", ")
            );
        }

        let report = output::write_report(&self.config.output_dir, &audit.owner_name, &audit.report)?;
        if audit.report.is_compliant() {
            info!(
                "{}: {} records, {} in total, within all caps",
                audit.owner_name,
                dataset.records.len(),
                format_hours(audit.totals.monthly.total())
            );
        } else {
            info!(
                "{}: {} records, {} in total, {} week(s) and {} month(s) over cap",
                audit.owner_name,
                dataset.records.len(),
                format_hours(audit.totals.monthly.total()),
                audit.report.weeks.len(),
                audit.report.months.len()
            );
        }

        Ok(StudentOutcome::Audited {
            source: path.to_path_buf(),
            owner_name: audit.owner_name,
            records: dataset.records.len(),
            weeks_over_cap: audit.report.weeks,
            months_over_cap: audit.report.months,
            unmatched_dates: audit.totals.unmatched_dates,
            report,
        })
    }

    fn record_failure(&self, path: &Path, owner_name: String, e: &AuditError) -> StudentOutcome {
        let report =
            match output::write_failure_report(&self.config.output_dir, &owner_name, path, e) {
                Ok(report) => Some(report),
                Err(write_err) => {
                    error!("Could not record failure for {}: {}", owner_name, write_err);
                    None
                }
            };

        StudentOutcome::Failed {
            source: path.to_path_buf(),
            owner_name,
            error: e.to_string(),
            report,
        }
    }
}

fn outcome_owner(outcome: &StudentOutcome) -> Option<&str> {
    match outcome {
        StudentOutcome::Audited { owner_name, .. } | StudentOutcome::Normalized { owner_name, .. } => {
            Some(owner_name.as_str())
        }
        StudentOutcome::Failed { .. } => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
