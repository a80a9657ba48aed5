mod bootstrap;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use report_core::settings::{OutputFormat, ResolverKind, Settings};
use report_data::analysis::{self, AttendanceReport, ReportOptions};
use report_data::reader::{load_input, ColumnMapping};
use report_data::resolver::{CachedResolver, IpInfoResolver, RegionResolver, StaticResolver};
use report_export::html_report::REPORT_TITLE;
use report_export::{
    ExportContext, HtmlReportWriter, IdentityCsvWriter, ReportWriter, SummaryCsvWriter,
};
use report_ui::app::App;
use report_ui::summary_view::{plain_text_summary, SummaryViewData};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    if settings.clear && settings.input.is_none() {
        println!("Cleared saved parameters.");
        return Ok(());
    }
    settings.validate()?;

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Attendance Report v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Medium: {}, Resolver: {:?}, Format: {:?}",
        settings.medium.label(),
        settings.resolver,
        settings.format
    );

    // ── Input ─────────────────────────────────────────────────────────────────
    let input = settings
        .input
        .as_deref()
        .context("an input file or directory is required")?;
    let mapping = ColumnMapping::from_settings(&settings);
    let records = load_input(input, &mapping, settings.header_row)
        .with_context(|| format!("failed to read {}", input.display()))?;
    tracing::info!("Read {} rows from {}", records.len(), input.display());

    // ── Resolver ──────────────────────────────────────────────────────────────
    let (resolver, cache) = build_resolver(&settings)?;

    // ── Pipeline ──────────────────────────────────────────────────────────────
    let options = ReportOptions {
        medium: settings.medium,
        bucket_edges: settings.bucket_edges.clone(),
        meridiem: settings.meridiem,
        histogram_basis: settings.histogram_basis,
        lookup_concurrency: settings.lookup_concurrency as usize,
    };
    let report = analysis::run(&records, resolver, &options).await;

    if let Some(cache) = cache {
        match cache.persist() {
            Ok(()) => tracing::debug!("Region cache holds {} entries", cache.cached_len()),
            Err(e) => tracing::warn!("Could not save region cache: {}", e),
        }
    }

    // ── Display ───────────────────────────────────────────────────────────────
    let view = SummaryViewData::from_report(&report, REPORT_TITLE);
    if settings.preview {
        let result = App::new(&settings.theme).run_preview(view.clone()).await;
        print_summary_if_preview_failed(result, &view);
    } else {
        print!("{}", plain_text_summary(&view));
    }

    // ── Exports ───────────────────────────────────────────────────────────────
    let ctx = ExportContext {
        week: settings.week.clone(),
        session_no: settings.session_no.clone(),
        session_name: settings.session_name.clone(),
        date: settings.report_date()?,
    };
    let writers = selected_writers(settings.format, settings.identity_csv);
    let failed = run_exports(&writers, &report, &ctx, &settings.output_dir);

    if failed > 0 {
        bail!("{} of {} export step(s) failed", failed, writers.len());
    }
    Ok(())
}

/// Build the configured resolver. Network lookups go through the persistent
/// cache unless `--no-cache` was given; the static map is read fresh every
/// run so edits to it take effect. The cache handle is returned for
/// persisting.
fn build_resolver(
    settings: &Settings,
) -> Result<(Arc<dyn RegionResolver>, Option<Arc<CachedResolver>>)> {
    match settings.resolver {
        ResolverKind::Ipinfo => {
            let token = settings
                .ipinfo_token
                .clone()
                .context("--resolver ipinfo requires a token")?;
            let inner: Arc<dyn RegionResolver> = Arc::new(IpInfoResolver::new(
                token,
                Duration::from_secs(settings.lookup_timeout_secs),
            )?);

            if settings.no_cache {
                return Ok((inner, None));
            }
            let cache = Arc::new(CachedResolver::open(inner, CachedResolver::default_cache_path()));
            let shared: Arc<dyn RegionResolver> = cache.clone();
            Ok((shared, Some(cache)))
        }
        ResolverKind::Static => {
            let path = settings
                .region_map
                .as_deref()
                .context("--resolver static requires --region-map")?;
            let resolver = StaticResolver::from_json_file(path)?;
            tracing::info!("Loaded {} region mappings from {}", resolver.len(), path.display());
            Ok((Arc::new(resolver), None))
        }
    }
}

/// A preview that cannot start (no terminal) is not fatal: log it, fall back
/// to the plain summary and carry on to the exports. Returns `true` when the
/// fallback was used.
fn print_summary_if_preview_failed(result: std::io::Result<()>, view: &SummaryViewData) -> bool {
    match result {
        Ok(()) => false,
        Err(e) => {
            tracing::warn!("Terminal preview unavailable: {}", e);
            print!("{}", plain_text_summary(view));
            true
        }
    }
}

/// Writers for the requested artifacts, in the order they run.
fn selected_writers(format: OutputFormat, identity_csv: bool) -> Vec<Box<dyn ReportWriter>> {
    let mut writers: Vec<Box<dyn ReportWriter>> = Vec::new();
    if format.wants_html() {
        writers.push(Box::new(HtmlReportWriter));
    }
    if format.wants_csv() {
        writers.push(Box::new(SummaryCsvWriter));
    }
    if identity_csv {
        writers.push(Box::new(IdentityCsvWriter));
    }
    writers
}

/// Run every writer independently and return how many failed.
fn run_exports(
    writers: &[Box<dyn ReportWriter>],
    report: &AttendanceReport,
    ctx: &ExportContext,
    out_dir: &Path,
) -> usize {
    let mut failed = 0;
    for writer in writers {
        match writer.write(report, ctx, out_dir) {
            Ok(path) => {
                tracing::info!("Wrote {} export to {}", writer.name(), path.display());
                println!("Saved {}", path.display());
            }
            Err(e) => {
                tracing::error!("{} export failed: {}", writer.name(), e);
                failed += 1;
            }
        }
    }
    failed
}

// ── Tests ──────────────────────────────────────────────────────────────────────
