//! Self-contained HTML report with embedded SVG charts.

use std::path::{Path, PathBuf};

use report_core::error::Result;
use report_core::formatting::{format_count, format_minutes, share_percent};
use report_data::analysis::AttendanceReport;
use tracing::debug;

use crate::chart::{duration_chart_svg, region_chart_svg, OTHER_LABEL};
use crate::{write_atomic, ExportContext, ReportWriter};

/// Document title.
pub const REPORT_TITLE: &str = "Data Analysis Report";

/// Escape HTML special characters.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn styles() -> &'static str {
    r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 20px;
            background-color: #f5f5f5;
        }
        h1, h2 {
            color: #333;
        }
        .meta {
            color: #666;
            font-size: 0.9em;
        }
        table {
            border-collapse: collapse;
            width: 100%;
            background-color: white;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            margin-bottom: 20px;
        }
        th, td {
            border: 1px solid #ddd;
            padding: 8px;
            text-align: left;
        }
        th {
            background-color: #4a90d9;
            color: white;
            font-weight: bold;
        }
        tr:nth-child(even) {
            background-color: #f9f9f9;
        }
        td.count {
            font-family: monospace;
            text-align: right;
        }
        tr.total td {
            font-weight: bold;
        }
        .chart {
            background-color: white;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            margin-bottom: 20px;
            padding: 10px;
        }
        .footer {
            margin-top: 20px;
            font-size: 0.8em;
            color: #888;
            text-align: center;
        }
        "#
}

/// Drop any XML prolog so the SVG can sit inline in HTML.
fn inline_svg(svg: &str) -> &str {
    svg.find("<svg").map(|i| &svg[i..]).unwrap_or(svg)
}

/// Build the complete HTML document for `report`.
pub fn render_html(report: &AttendanceReport, ctx: &ExportContext) -> Result<String> {
    let duration_svg = duration_chart_svg(&report.histogram)?;
    let region_svg = region_chart_svg(&report.relevant)?;

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n");
    html.push_str("<html lang=\"en\">\n");
    html.push_str("<head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str(&format!("    <title>{}</title>\n", REPORT_TITLE));
    html.push_str("    <style>");
    html.push_str(styles());
    html.push_str("</style>\n");
    html.push_str("</head>\n");
    html.push_str("<body>\n");

    html.push_str(&format!("    <h1>{}</h1>\n", REPORT_TITLE));
    html.push_str(&format!(
        "    <p class=\"meta\">{} &middot; Week {} &middot; Session {} ({}) &middot; {}</p>\n",
        escape_html(report.medium.label()),
        escape_html(&ctx.week),
        escape_html(&ctx.session_no),
        escape_html(&ctx.session_name),
        ctx.date.format("%Y-%m-%d"),
    ));

    render_region_section(&mut html, report);
    render_other_regions(&mut html, report);
    render_duration_section(&mut html, report);

    html.push_str("    <h2>Charts</h2>\n");
    for svg in [&duration_svg, &region_svg] {
        html.push_str("    <div class=\"chart\">\n");
        html.push_str(inline_svg(svg));
        html.push_str("\n    </div>\n");
    }

    render_summary(&mut html, report);

    html.push_str("    <div class=\"footer\">\n");
    html.push_str(&format!(
        "        Generated {}\n",
        escape_html(&report.metadata.generated_at)
    ));
    html.push_str("    </div>\n");
    html.push_str("</body>\n");
    html.push_str("</html>\n");

    Ok(html)
}

fn render_region_section(html: &mut String, report: &AttendanceReport) {
    let relevant = &report.relevant;
    let total = relevant.relevant_total() + relevant.other_total;

    html.push_str("    <h2>State Counts</h2>\n");
    html.push_str("    <table>\n");
    html.push_str("        <tr><th>State</th><th>Count</th><th>Share</th></tr>\n");
    for tally in &relevant.ordered {
        html.push_str(&format!(
            "        <tr><td>{}</td><td class=\"count\">{}</td><td class=\"count\">{:.1}%</td></tr>\n",
            escape_html(&tally.region),
            format_count(tally.count),
            share_percent(tally.count, total),
        ));
    }
    html.push_str(&format!(
        "        <tr class=\"total\"><td>{}</td><td class=\"count\">{}</td><td class=\"count\">{:.1}%</td></tr>\n",
        OTHER_LABEL,
        format_count(relevant.other_total),
        share_percent(relevant.other_total, total),
    ));
    html.push_str("    </table>\n");
}

fn render_other_regions(html: &mut String, report: &AttendanceReport) {
    html.push_str("    <h2>Other States</h2>\n");
    if report.other_regions.is_empty() {
        html.push_str("    <p class=\"meta\">None</p>\n");
        return;
    }

    html.push_str("    <table>\n");
    html.push_str("        <tr><th>State</th><th>Count</th></tr>\n");
    for tally in &report.other_regions {
        html.push_str(&format!(
            "        <tr><td>{}</td><td class=\"count\">{}</td></tr>\n",
            escape_html(&tally.region),
            format_count(tally.count),
        ));
    }
    html.push_str("    </table>\n");
}

fn render_duration_section(html: &mut String, report: &AttendanceReport) {
    html.push_str("    <h2>Time Interval Counts</h2>\n");
    html.push_str("    <table>\n");
    html.push_str("        <tr><th>Time Interval</th><th>Count</th></tr>\n");
    for bin in &report.histogram.bins {
        html.push_str(&format!(
            "        <tr><td>{}</td><td class=\"count\">{}</td></tr>\n",
            escape_html(&bin.bucket.label),
            format_count(bin.count),
        ));
    }
    html.push_str("    </table>\n");

    if report.histogram.excluded > 0 {
        html.push_str(&format!(
            "    <p class=\"meta\">{} value(s) below the first interval were left out.</p>\n",
            format_count(report.histogram.excluded)
        ));
    }
}

fn render_summary(html: &mut String, report: &AttendanceReport) {
    let meta = &report.metadata;
    let longest = report
        .identity_totals
        .values()
        .copied()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));

    html.push_str("    <h2>Run Summary</h2>\n");
    html.push_str("    <table>\n");
    let rows = [
        ("Rows read", format_count(meta.rows_read as u64)),
        ("Unique sessions", format_count(meta.unique_sessions as u64)),
        ("Rows with duration", format_count(meta.rows_with_duration as u64)),
        ("Participants", format_count(report.identity_totals.len() as u64)),
        (
            "Longest participant total",
            longest.map(format_minutes).unwrap_or_else(|| "-".to_string()),
        ),
    ];
    for (label, value) in rows {
        html.push_str(&format!(
            "        <tr><td>{}</td><td class=\"count\">{}</td></tr>\n",
            label,
            escape_html(&value)
        ));
    }
    html.push_str("    </table>\n");
}

// ── Writer ────────────────────────────────────────────────────────────────────

/// `data_analysis_report.html`.
#[derive(Debug, Default)]
pub struct HtmlReportWriter;

impl ReportWriter for HtmlReportWriter {
    fn name(&self) -> &'static str {
        "html"
    }

    fn file_name(&self) -> &'static str {
        "data_analysis_report.html"
    }

    fn write(&self, report: &AttendanceReport, ctx: &ExportContext, out_dir: &Path) -> Result<PathBuf> {
        let html = render_html(report, ctx)?;
        let path = out_dir.join(self.file_name());
        write_atomic(&path, html.as_bytes())?;
        debug!("Wrote {} bytes to {}", html.len(), path.display());
        Ok(path)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, sample_report};
    use tempfile::TempDir;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("a&b"), "a&amp;b");
        assert_eq!(escape_html("\"x\""), "&quot;x&quot;");
        assert_eq!(escape_html("'x'"), "&#39;x&#39;");
    }

    #[test]
    fn test_inline_svg_strips_prolog() {
        assert_eq!(inline_svg("<?xml version=\"1.0\"?>\n<svg></svg>"), "<svg></svg>");
        assert_eq!(inline_svg("<svg/>"), "<svg/>");
    }

    #[test]
    fn test_render_html_structure() {
        let html = render_html(&sample_report(), &context()).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Data Analysis Report</title>"));
        assert!(html.contains("<h2>State Counts</h2>"));
        assert!(html.contains("<h2>Other States</h2>"));
        assert!(html.contains("<h2>Time Interval Counts</h2>"));
        assert!(html.contains("Hindi Medium"));
        assert!(html.contains("2024-09-12"));
        assert_eq!(html.matches("<svg").count(), 2);
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_render_html_lists_regions_in_order() {
        let html = render_html(&sample_report(), &context()).unwrap();
        let up = html.find("<td>Uttar Pradesh</td>").unwrap();
        let gujarat = html.find("<td>Gujarat</td>").unwrap();
        let haryana = html.find("<td>Haryana</td>").unwrap();
        assert!(up < gujarat && gujarat < haryana);
        assert!(html.contains("<td>5-20 mins</td>"));
        assert!(html.contains("<td>&lt;1 min</td>"));
    }

    #[test]
    fn test_render_html_escapes_region_names() {
        let html = render_html(&sample_report(), &context()).unwrap();
        assert!(html.contains("<td>Kerala &lt;North&gt;</td>"));
        assert!(!html.contains("<td>Kerala <North></td>"));
    }

    #[test]
    fn test_html_writer_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = HtmlReportWriter
            .write(&sample_report(), &context(), dir.path())
            .unwrap();
        assert!(path.ends_with("data_analysis_report.html"));
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("Run Summary"));
    }
}
