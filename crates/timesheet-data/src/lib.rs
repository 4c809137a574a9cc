//! Data ingestion layer for the timesheet audit.
//!
//! Responsible for discovering and reading raw attendance exports, extracting
//! time records, loading the calendar-week table, aggregating hours and
//! reading/writing normalized per-student tables.

pub mod aggregator;
pub mod calendar;
pub mod extractor;
pub mod reader;
pub mod table;

pub use timesheet_core as core;
