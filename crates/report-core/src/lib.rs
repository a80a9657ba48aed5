//! Core types for the attendance report.
//!
//! Holds the domain model, the error type, command-line settings with their
//! persisted last-used values, clock-time parsing and region label handling.

pub mod error;
pub mod formatting;
pub mod models;
pub mod regions;
pub mod settings;
pub mod time_utils;

pub use error::{ReportError, Result};
