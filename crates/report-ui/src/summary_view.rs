//! Attendance summary view.
//!
//! Renders the duration histogram as a [`ratatui::widgets::BarChart`] next to
//! a bordered region table with a highlighted "Other" row, plus a plain-text
//! rendering of the same data for non-interactive runs.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use report_core::formatting::{format_count, pad_label, share_percent};
use report_data::analysis::AttendanceReport;
use unicode_width::UnicodeWidthStr;

use crate::themes::Theme;

/// Label of the row holding every non-allow-listed region.
const OTHER_LABEL: &str = "Other";

/// Everything the summary view displays.
#[derive(Debug, Clone)]
pub struct SummaryViewData {
    /// Title shown in the header block.
    pub title: String,
    /// Human-readable medium, e.g. `"Hindi Medium"`.
    pub medium: String,
    /// Allow-listed regions in allow-list order with their counts.
    pub regions: Vec<(String, u64)>,
    /// Sessions outside the allow-list.
    pub other_total: u64,
    /// Histogram bars in bucket order.
    pub histogram: Vec<(String, u64)>,
    /// Durations that fell in no bucket.
    pub excluded: u64,
    pub rows_read: usize,
    pub unique_sessions: usize,
    pub rows_with_duration: usize,
}

impl SummaryViewData {
    /// Extract the display values from a finished report.
    pub fn from_report(report: &AttendanceReport, title: &str) -> Self {
        Self {
            title: title.to_string(),
            medium: report.medium.label().to_string(),
            regions: report
                .relevant
                .ordered
                .iter()
                .map(|t| (t.region.clone(), t.count))
                .collect(),
            other_total: report.relevant.other_total,
            histogram: report
                .histogram
                .bins
                .iter()
                .map(|b| (b.bucket.label.clone(), b.count))
                .collect(),
            excluded: report.histogram.excluded,
            rows_read: report.metadata.rows_read,
            unique_sessions: report.metadata.unique_sessions,
            rows_with_duration: report.metadata.rows_with_duration,
        }
    }

    /// Sessions counted in the region table, "Other" included.
    pub fn session_total(&self) -> u64 {
        self.regions.iter().map(|(_, c)| c).sum::<u64>() + self.other_total
    }

    /// `true` when no input row survived loading.
    pub fn is_empty(&self) -> bool {
        self.rows_read == 0
    }
}

// ── Terminal rendering ────────────────────────────────────────────────────────

/// Render the full summary into `area`.
pub fn render_summary_view(frame: &mut Frame, area: Rect, data: &SummaryViewData, theme: &Theme) {
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(10),
        Constraint::Length(3),
    ])
    .areas(area);

    let [chart_area, table_area] =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
            .areas(body_area);

    render_header(frame, header_area, data, theme);
    render_histogram(frame, chart_area, data, theme);
    render_region_table(frame, table_area, data, theme);
    render_footer(frame, footer_area, data, theme);
}

fn render_header(frame: &mut Frame, area: Rect, data: &SummaryViewData, theme: &Theme) {
    let line = Line::from(vec![
        Span::styled(data.title.clone(), theme.header),
        Span::styled(" │ ", theme.separator),
        Span::styled(data.medium.clone(), theme.info),
        Span::styled(" │ ", theme.separator),
        Span::styled("sessions ", theme.label),
        Span::styled(format_count(data.unique_sessions as u64), theme.value),
    ]);
    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn render_histogram(frame: &mut Frame, area: Rect, data: &SummaryViewData, theme: &Theme) {
    let bars: Vec<Bar> = data
        .histogram
        .iter()
        .map(|(label, count)| {
            Bar::default()
                .value(*count)
                .label(Line::from(label.clone()))
                .text_value(format_count(*count))
                .style(theme.bar)
                .value_style(theme.bar_value)
        })
        .collect();

    let slots = data.histogram.len().max(1) as u16;
    // Two columns of border plus one gap per bar.
    let inner = area.width.saturating_sub(2);
    let bar_width = (inner.saturating_sub(slots) / slots).clamp(3, 12);

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Time Interval Counts "),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .label_style(theme.bar_label);

    frame.render_widget(chart, area);
}

fn render_region_table(frame: &mut Frame, area: Rect, data: &SummaryViewData, theme: &Theme) {
    let total = data.session_total();
    let header = Row::new(
        ["State", "Count", "Share"]
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    )
    .height(1);

    let mut rows: Vec<Row> = data
        .regions
        .iter()
        .map(|(region, count)| {
            Row::new(vec![
                Cell::from(region.clone()),
                Cell::from(format_count(*count)),
                Cell::from(format!("{:.1}%", share_percent(*count, total))),
            ])
            .style(theme.count_style(*count))
        })
        .collect();

    rows.push(
        Row::new(vec![
            Cell::from(OTHER_LABEL),
            Cell::from(format_count(data.other_total)),
            Cell::from(format!("{:.1}%", share_percent(data.other_total, total))),
        ])
        .style(theme.table_total),
    );

    let widths = [
        Constraint::Min(18),
        Constraint::Length(8),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(" State Counts "),
        )
        .style(theme.text);

    frame.render_widget(table, area);
}

fn render_footer(frame: &mut Frame, area: Rect, data: &SummaryViewData, theme: &Theme) {
    let mut spans = vec![
        Span::styled("rows ", theme.label),
        Span::styled(format_count(data.rows_read as u64), theme.value),
        Span::styled("  with duration ", theme.label),
        Span::styled(format_count(data.rows_with_duration as u64), theme.value),
    ];
    if data.excluded > 0 {
        spans.push(Span::styled(
            format!("  {} below first interval", format_count(data.excluded)),
            theme.warning,
        ));
    }
    spans.push(Span::styled("  │ q to exit", theme.dim));

    frame.render_widget(
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

/// Render a "no data" placeholder when the input held no usable rows.
pub fn render_no_data(frame: &mut Frame, area: Rect, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No attendance rows found", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(
            "Check the column names and header row of the input file.",
            theme.dim,
        )),
        Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Attendance Report "),
        ),
        area,
    );
}

// ── Plain text ────────────────────────────────────────────────────────────────

/// Render the summary as aligned plain text for stdout.
pub fn plain_text_summary(data: &SummaryViewData) -> String {
    let width = data
        .regions
        .iter()
        .map(|(r, _)| r.as_str())
        .chain(data.histogram.iter().map(|(l, _)| l.as_str()))
        .chain(std::iter::once(OTHER_LABEL))
        .map(UnicodeWidthStr::width)
        .max()
        .unwrap_or(0)
        + 2;

    let mut out = String::new();
    out.push_str(&format!("{} ({})\n", data.title, data.medium));
    out.push_str(&format!(
        "rows {} | sessions {} | with duration {}\n",
        format_count(data.rows_read as u64),
        format_count(data.unique_sessions as u64),
        format_count(data.rows_with_duration as u64),
    ));

    out.push_str("\nState Counts\n");
    for (region, count) in &data.regions {
        out.push_str(&format!("  {}{:>8}\n", pad_label(region, width), format_count(*count)));
    }
    out.push_str(&format!(
        "  {}{:>8}\n",
        pad_label(OTHER_LABEL, width),
        format_count(data.other_total)
    ));

    out.push_str("\nTime Interval Counts\n");
    for (label, count) in &data.histogram {
        out.push_str(&format!("  {}{:>8}\n", pad_label(label, width), format_count(*count)));
    }
    if data.excluded > 0 {
        out.push_str(&format!(
            "  ({} below first interval)\n",
            format_count(data.excluded)
        ));
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
