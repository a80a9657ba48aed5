//! Export layer for the attendance report.
//!
//! Writes the per-region CSV summary, the per-participant CSV and the HTML
//! report document with embedded SVG charts. Every artifact goes through the
//! [`ReportWriter`] trait so the binary can run each export step in
//! isolation.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use report_core::error::Result;
use report_data::analysis::AttendanceReport;

pub mod chart;
pub mod csv_export;
pub mod html_report;

pub use csv_export::{IdentityCsvWriter, SummaryCsvWriter};
pub use html_report::HtmlReportWriter;

/// Labels stamped onto exported artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportContext {
    pub week: String,
    pub session_no: String,
    pub session_name: String,
    pub date: NaiveDate,
}

/// One export artifact.
pub trait ReportWriter {
    /// Short name used in log lines and the exit summary.
    fn name(&self) -> &'static str;

    /// File name created inside the output directory.
    fn file_name(&self) -> &'static str;

    /// Render `report` into `out_dir`, returning the written path.
    fn write(&self, report: &AttendanceReport, ctx: &ExportContext, out_dir: &Path)
        -> Result<PathBuf>;
}

/// Write `contents` to `path` through a temporary sibling and a rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
