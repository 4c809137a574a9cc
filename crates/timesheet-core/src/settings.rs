use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AuditError, Result};
use crate::models::ExportSchema;
use crate::policy::{
    HourLimits, LimitOverride, ReportOrder, DEFAULT_MONTHLY_CAP, DEFAULT_WEEKLY_CAP,
};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Audit student timesheets against weekly and monthly work-hour caps
#[derive(Parser, Debug, Clone)]
#[command(
    name = "timesheet-audit",
    about = "Audit student timesheets against weekly and monthly work-hour caps",
    version
)]
pub struct Settings {
    /// Directory holding one raw attendance export per student
    #[arg(long, default_value = "stundenzettel_csv")]
    pub input_dir: PathBuf,

    /// File extension of raw exports
    #[arg(long, default_value = "csv")]
    pub extension: String,

    /// Calendar-week table (label prefix; label suffix; dates...)
    #[arg(long, default_value = "preprocessing/KW.csv")]
    pub week_table: PathBuf,

    /// Directory for normalized per-student tables
    #[arg(long, default_value = "preprocessing/studentData")]
    pub normalized_dir: PathBuf,

    /// Directory for violation reports
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Maximum hours per calendar week
    #[arg(long, default_value_t = DEFAULT_WEEKLY_CAP)]
    pub weekly_cap: f64,

    /// Maximum hours per calendar month
    #[arg(long, default_value_t = DEFAULT_MONTHLY_CAP)]
    pub monthly_cap: f64,

    /// Order of violating weeks and months in reports
    #[arg(long, default_value = "first-seen", value_parser = ["first-seen", "chronological"])]
    pub order: String,

    /// Which part of the pipeline to run
    #[arg(long, default_value = "all", value_parser = ["all", "preprocess", "check"])]
    pub stage: String,

    /// Abort the whole run on the first timesheet that cannot be audited
    #[arg(long)]
    pub fail_fast: bool,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Stage ──────────────────────────────────────────────────────────────────────

/// Pipeline stages selectable with `--stage`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    /// Normalize raw exports and check them in one pass.
    #[default]
    All,
    /// Only write normalized tables.
    Preprocess,
    /// Only check previously written normalized tables.
    Check,
}

impl FromStr for Stage {
    type Err = AuditError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "all" => Ok(Stage::All),
            "preprocess" => Ok(Stage::Preprocess),
            "check" => Ok(Stage::Check),
            other => Err(AuditError::Config(format!("unknown stage: {other}"))),
        }
    }
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::All => "all",
            Stage::Preprocess => "preprocess",
            Stage::Check => "check",
        }
    }
}

// ── AuditConfig ────────────────────────────────────────────────────────────────

/// Optional JSON configuration file.
///
/// Every field is optional; explicit command-line values take precedence.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct AuditConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_table: Option<PathBuf>,
    /// Whether the first row of the calendar-week table is a header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_table_header: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_cap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_cap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<ReportOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<ExportSchema>,
    /// Cap overrides keyed by owner name (e.g. `"Mueller_Anna"`).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub overrides: HashMap<String, LimitOverride>,
}

impl AuditConfig {
    /// Default location: `<config_dir>/timesheet-audit/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| Self::config_path_in(&dir))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join("timesheet-audit").join("config.json")
    }

    /// Load a configuration file. Unlike an absent default file, an explicit
    /// file that cannot be read or parsed is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AuditError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

// ── RunConfig ──────────────────────────────────────────────────────────────────

/// Fully resolved, immutable configuration for one audit run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub extension: String,
    pub week_table: PathBuf,
    pub week_table_header: bool,
    pub normalized_dir: PathBuf,
    pub output_dir: PathBuf,
    pub limits: HourLimits,
    pub order: ReportOrder,
    pub stage: Stage,
    pub schema: ExportSchema,
    pub overrides: HashMap<String, LimitOverride>,
    pub fail_fast: bool,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("stundenzettel_csv"),
            extension: "csv".to_string(),
            week_table: PathBuf::from("preprocessing/KW.csv"),
            week_table_header: true,
            normalized_dir: PathBuf::from("preprocessing/studentData"),
            output_dir: PathBuf::from("output"),
            limits: HourLimits::default(),
            order: ReportOrder::default(),
            stage: Stage::default(),
            schema: ExportSchema::default(),
            overrides: HashMap::new(),
            fail_fast: false,
            log_level: "INFO".to_string(),
            log_file: None,
        }
    }
}

impl RunConfig {
    /// Caps for `owner_name`, with any per-student override applied.
    pub fn limits_for(&self, owner_name: &str) -> Result<HourLimits> {
        match self.overrides.get(owner_name) {
            Some(overrides) => self.limits.with_override(overrides),
            None => Ok(self.limits),
        }
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments, merge the configuration file and resolve the
    /// result into a [`RunConfig`].
    pub fn load() -> Result<RunConfig> {
        Self::load_impl(
            std::env::args_os().collect(),
            AuditConfig::default_path().as_deref(),
        )
    }

    /// Same as [`Settings::load`] but with an explicit argument list and
    /// default config location, so tests can redirect both.
    pub fn load_impl(args: Vec<OsString>, default_config: Option<&Path>) -> Result<RunConfig> {
        // Build raw ArgMatches so we can query ValueSource.
        let matches = Settings::command().get_matches_from(args.clone());
        let settings = Settings::parse_from(args);

        let config = match (&settings.config, default_config) {
            (Some(path), _) => AuditConfig::load_from(path)?,
            (None, Some(path)) if path.exists() => {
                tracing::debug!("Using configuration file {}", path.display());
                AuditConfig::load_from(path)?
            }
            _ => AuditConfig::default(),
        };

        settings.merge(config, &matches)
    }

    /// Combine CLI values with `config`. A file value is used only where the
    /// corresponding flag was not given on the command line.
    fn merge(self, config: AuditConfig, matches: &clap::ArgMatches) -> Result<RunConfig> {
        let pick = |name: &str| !is_arg_explicitly_set(matches, name);

        let input_dir = match config.input_dir {
            Some(v) if pick("input_dir") => v,
            _ => self.input_dir,
        };
        let extension = match config.extension {
            Some(v) if pick("extension") => v,
            _ => self.extension,
        };
        let week_table = match config.week_table {
            Some(v) if pick("week_table") => v,
            _ => self.week_table,
        };
        let normalized_dir = match config.normalized_dir {
            Some(v) if pick("normalized_dir") => v,
            _ => self.normalized_dir,
        };
        let output_dir = match config.output_dir {
            Some(v) if pick("output_dir") => v,
            _ => self.output_dir,
        };
        let weekly_cap = match config.weekly_cap {
            Some(v) if pick("weekly_cap") => v,
            _ => self.weekly_cap,
        };
        let monthly_cap = match config.monthly_cap {
            Some(v) if pick("monthly_cap") => v,
            _ => self.monthly_cap,
        };
        let order = match config.order {
            Some(v) if pick("order") => v,
            _ => self.order.parse()?,
        };

        // --debug overrides log level.
        let log_level = if self.debug {
            "DEBUG".to_string()
        } else {
            self.log_level
        };

        Ok(RunConfig {
            input_dir,
            extension,
            week_table,
            week_table_header: config.week_table_header.unwrap_or(true),
            normalized_dir,
            output_dir,
            limits: HourLimits::new(weekly_cap, monthly_cap)?,
            order,
            stage: self.stage.parse()?,
            schema: config.schema.unwrap_or_default(),
            overrides: config.overrides,
            fail_fast: self.fail_fast,
            log_level,
            log_file: self.log_file,
        })
    }
}

// ── Helper: check if an arg was explicitly set on the command line ─────────────

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
