//! CSV exports: the per-region attendance summary and per-participant
//! duration totals.

use std::io::Write;
use std::path::{Path, PathBuf};

use report_core::error::{ReportError, Result};
use report_core::models::{IdentityAggregate, RelevantRegions};
use report_data::analysis::AttendanceReport;
use tracing::debug;

use crate::{write_atomic, ExportContext, ReportWriter};

/// Header of the attendance summary.
pub const SUMMARY_HEADERS: [&str; 7] = [
    "State",
    "Language",
    "Week",
    "Session No.",
    "Session Name",
    "Date",
    "Attendance",
];

/// Header of the per-participant export.
pub const IDENTITY_HEADERS: [&str; 2] = ["Participant", "Total Minutes"];

fn csv_err(e: csv::Error) -> ReportError {
    ReportError::Render(format!("CSV write failed: {}", e))
}

/// Write one row per allow-listed region, in allow-list order.
pub fn write_summary_csv<W: Write>(
    out: W,
    relevant: &RelevantRegions,
    ctx: &ExportContext,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(SUMMARY_HEADERS).map_err(csv_err)?;

    let language = relevant.medium.label();
    let date = ctx.date.format("%Y-%m-%d").to_string();
    for tally in &relevant.ordered {
        let count = tally.count.to_string();
        writer
            .write_record([
                tally.region.as_str(),
                language,
                ctx.week.as_str(),
                ctx.session_no.as_str(),
                ctx.session_name.as_str(),
                date.as_str(),
                count.as_str(),
            ])
            .map_err(csv_err)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write one row per participant with their summed minutes (two decimals).
pub fn write_identity_csv<W: Write>(out: W, totals: &IdentityAggregate) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(IDENTITY_HEADERS).map_err(csv_err)?;
    for (participant, minutes) in totals {
        let minutes = format!("{:.2}", minutes);
        writer
            .write_record([participant.as_str(), minutes.as_str()])
            .map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

// ── Writers ───────────────────────────────────────────────────────────────────

/// `kgbvs_attendance.csv`: the per-region summary.
#[derive(Debug, Default)]
pub struct SummaryCsvWriter;

impl ReportWriter for SummaryCsvWriter {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn file_name(&self) -> &'static str {
        "kgbvs_attendance.csv"
    }

    fn write(&self, report: &AttendanceReport, ctx: &ExportContext, out_dir: &Path) -> Result<PathBuf> {
        let mut buf = Vec::new();
        write_summary_csv(&mut buf, &report.relevant, ctx)?;
        let path = out_dir.join(self.file_name());
        write_atomic(&path, &buf)?;
        debug!("Wrote {} region rows to {}", report.relevant.ordered.len(), path.display());
        Ok(path)
    }
}

/// `participant_durations.csv`: per-participant totals.
#[derive(Debug, Default)]
pub struct IdentityCsvWriter;

impl ReportWriter for IdentityCsvWriter {
    fn name(&self) -> &'static str {
        "identity-csv"
    }

    fn file_name(&self) -> &'static str {
        "participant_durations.csv"
    }

    fn write(&self, report: &AttendanceReport, _ctx: &ExportContext, out_dir: &Path) -> Result<PathBuf> {
        let mut buf = Vec::new();
        write_identity_csv(&mut buf, &report.identity_totals)?;
        let path = out_dir.join(self.file_name());
        write_atomic(&path, &buf)?;
        Ok(path)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
