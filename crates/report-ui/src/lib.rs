//! Terminal preview for the attendance report.
//!
//! Provides themes, the summary view (duration bar chart plus region table)
//! and the preview event loop built on [`ratatui`], along with a plain-text
//! rendering of the same summary for non-interactive output.

pub mod app;
pub mod summary_view;
pub mod themes;

pub use report_core as core;
