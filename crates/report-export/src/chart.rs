//! SVG bar charts rendered with plotters.

use plotters::prelude::*;
use report_core::error::{ReportError, Result};
use report_core::models::{OrderedHistogram, RelevantRegions};

const CHART_WIDTH: u32 = 800;
const CHART_HEIGHT: u32 = 480;

const DURATION_BAR: RGBColor = RGBColor(74, 144, 217);
const REGION_BAR: RGBColor = RGBColor(135, 206, 235);

/// Label of the bar holding every non-allow-listed region.
pub const OTHER_LABEL: &str = "Other";

/// A labelled bar chart, independent of the drawing backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChartSpec {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub bars: Vec<(String, u64)>,
}

impl BarChartSpec {
    /// Participation per duration bucket, in bucket order.
    pub fn durations(histogram: &OrderedHistogram) -> Self {
        Self {
            title: "Count of Participation in Different Time Intervals".to_string(),
            x_desc: "Time Interval (minutes)".to_string(),
            y_desc: "Count".to_string(),
            bars: histogram
                .bins
                .iter()
                .map(|bin| (bin.bucket.label.clone(), bin.count))
                .collect(),
        }
    }

    /// Attendance per allow-listed region, followed by the "Other" total.
    pub fn regions(relevant: &RelevantRegions) -> Self {
        let mut bars: Vec<(String, u64)> = relevant
            .ordered
            .iter()
            .map(|t| (t.region.clone(), t.count))
            .collect();
        bars.push((OTHER_LABEL.to_string(), relevant.other_total));

        Self {
            title: format!("Attendance by State ({})", relevant.medium.label()),
            x_desc: "State".to_string(),
            y_desc: "Count".to_string(),
            bars,
        }
    }
}

fn render_err<E: std::fmt::Display>(e: E) -> ReportError {
    ReportError::Render(e.to_string())
}

/// Render `spec` as a standalone SVG document.
pub fn render_svg(spec: &BarChartSpec, color: &RGBColor) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let slots = spec.bars.len().max(1) as u32;
        let peak = spec.bars.iter().map(|(_, count)| *count).max().unwrap_or(0);
        // Headroom above the tallest bar; an empty chart still gets an axis.
        let y_top = (peak + peak / 10).max(peak + 1);

        let mut chart = ChartBuilder::on(&root)
            .caption(&spec.title, ("sans-serif", 22))
            .margin(16)
            .x_label_area_size(70)
            .y_label_area_size(50)
            .build_cartesian_2d((0u32..slots).into_segmented(), 0u64..y_top)
            .map_err(render_err)?;

        let bars = &spec.bars;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(spec.x_desc.as_str())
            .y_desc(spec.y_desc.as_str())
            .x_labels(bars.len().max(1))
            .x_label_formatter(&|value| match value {
                SegmentValue::CenterOf(i) => bars
                    .get(*i as usize)
                    .map(|(label, _)| label.clone())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(color.filled())
                    .margin(10)
                    .data(bars.iter().enumerate().map(|(i, (_, count))| (i as u32, *count))),
            )
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }
    Ok(svg)
}

/// Histogram chart of `histogram` as SVG.
pub fn duration_chart_svg(histogram: &OrderedHistogram) -> Result<String> {
    render_svg(&BarChartSpec::durations(histogram), &DURATION_BAR)
}

/// Region chart of `relevant` as SVG.
pub fn region_chart_svg(relevant: &RelevantRegions) -> Result<String> {
    render_svg(&BarChartSpec::regions(relevant), &REGION_BAR)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
