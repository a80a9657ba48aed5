//! Data layer for the attendance report.
//!
//! Reads attendance sheets, resolves participant regions, aggregates
//! durations and runs the report pipeline.

pub mod aggregator;
pub mod analysis;
pub mod lookup;
pub mod reader;
pub mod resolver;

pub use report_core as core;
