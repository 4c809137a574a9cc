//! Core types for the timesheet audit.
//!
//! Holds the error type, the record and dataset models, duration parsing,
//! the work-hour policy check and the command-line / file configuration.

pub mod duration;
pub mod error;
pub mod formatting;
pub mod models;
pub mod policy;
pub mod settings;

pub use error::{AuditError, Result};
