mod bootstrap;

use anyhow::Result;
use timesheet_core::settings::{RunConfig, Settings, Stage};
use timesheet_runtime::pipeline::{AuditRunner, RunSummary};

fn main() -> Result<()> {
    let config = Settings::load()?;

    bootstrap::setup_logging(&config.log_level, config.log_file.as_ref())?;
    bootstrap::ensure_directories(&config)?;

    tracing::info!("Timesheet audit v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Stage: {}, weekly cap: {}h, monthly cap: {}h, order: {}",
        config.stage.as_str(),
        config.limits.weekly_cap,
        config.limits.monthly_cap,
        config.order.as_str()
    );

    let runner = AuditRunner::new(&config)?;

    for banner in stage_banners(config.stage) {
        println!("{banner}");
    }

    let files = runner.discover()?;
    println!("Found {} files in {}", files.len(), runner.input_dir().display());

    let summary = runner.run_files(&files)?;
    print_summary(&summary);
    println!("{}", done_message(&config));

    if summary.failed > 0 {
        anyhow::bail!(
            "{} of {} students could not be audited",
            summary.failed,
            summary.files_found
        );
    }

    Ok(())
}

/// Progress banners for `stage`. `all` runs both steps per student in one pass,
/// so both banners are printed up front.
fn stage_banners(stage: Stage) -> &'static [&'static str] {
    match stage {
        Stage::All => &["1) Data preprocessing", "2) Calculating results"],
        Stage::Preprocess => &["1) Data preprocessing"],
        Stage::Check => &["2) Calculating results"],
    }
}

fn done_message(config: &RunConfig) -> String {
    match config.stage {
        Stage::Preprocess => format!(
            "Done! Normalized tables were written to {}.",
            config.normalized_dir.display()
        ),
        Stage::All | Stage::Check => format!(
            "Done! Results were written to {}.",
            config.output_dir.display()
        ),
    }
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Processed {} files: {} succeeded, {} with violations, {} failed",
        summary.files_found, summary.succeeded, summary.with_violations, summary.failed
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────
