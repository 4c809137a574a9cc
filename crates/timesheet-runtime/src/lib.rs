//! Runtime orchestration layer for the timesheet audit.
//!
//! Runs the per-student pipeline over a directory of exports and persists
//! reports, normalized tables and the run summary.

pub mod output;
pub mod pipeline;

pub use timesheet_core as core;
pub use timesheet_data as data;
