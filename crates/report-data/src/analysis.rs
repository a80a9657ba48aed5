//! Report pipeline.
//!
//! Orchestrates de-duplication, region lookup, duration parsing and
//! bucketing, returning an [`AttendanceReport`] ready for export and display.

use std::sync::Arc;

use chrono::Utc;
use report_core::models::{
    AttendanceRecord, BucketEdges, EnrichedRecord, HistogramBasis, IdentityAggregate,
    MeridiemMode, Medium, OrderedHistogram, OtherRegionsTable, RegionCount, RelevantRegions,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregator::AttendanceAggregator;
use crate::lookup::{resolve_identifiers, DEFAULT_LOOKUP_CONCURRENCY};
use crate::resolver::RegionResolver;

// ── Public types ──────────────────────────────────────────────────────────────

/// Knobs for one pipeline run.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub medium: Medium,
    pub bucket_edges: BucketEdges,
    pub meridiem: MeridiemMode,
    pub histogram_basis: HistogramBasis,
    pub lookup_concurrency: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            medium: Medium::Hindi,
            bucket_edges: BucketEdges::default(),
            meridiem: MeridiemMode::default(),
            histogram_basis: HistogramBasis::default(),
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
        }
    }
}

/// Metadata produced alongside the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// RFC 3339 timestamp when this report was generated.
    pub generated_at: String,
    /// Input rows, duplicates included.
    pub rows_read: usize,
    /// Distinct session identifiers.
    pub unique_sessions: usize,
    /// Rows whose duration parsed.
    pub rows_with_duration: usize,
    /// Histogram inputs that fell in no bucket.
    pub excluded_from_histogram: u64,
    /// Distinct participant identifiers sent to the resolver.
    pub identifiers_resolved: usize,
    /// Wall-clock seconds spent in region lookups.
    pub lookup_time_seconds: f64,
    pub histogram_basis: HistogramBasis,
}

/// The complete output of [`run`].
#[derive(Debug, Clone)]
pub struct AttendanceReport {
    pub medium: Medium,
    /// One region per unique session.
    pub region_counts: RegionCount,
    pub relevant: RelevantRegions,
    pub other_regions: OtherRegionsTable,
    pub histogram: OrderedHistogram,
    pub identity_totals: IdentityAggregate,
    /// Every input row with its region and duration.
    pub records: Vec<EnrichedRecord>,
    pub metadata: ReportMetadata,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full pipeline.
///
/// 1. De-duplicate rows by session identifier (first wins).
/// 2. Resolve the participant of every kept row, bounded by
///    `options.lookup_concurrency`.
/// 3. Tally one region per unique session.
/// 4. Parse a duration for every row and sum it per participant.
/// 5. Bucket per-record or per-participant durations.
/// 6. Split regions into the medium's allow-list and the rest.
pub async fn run(
    records: &[AttendanceRecord],
    resolver: Arc<dyn RegionResolver>,
    options: &ReportOptions,
) -> AttendanceReport {
    // ── Step 1: De-duplicate ──────────────────────────────────────────────────
    let unique = AttendanceAggregator::dedup_by_session(records);

    // ── Step 2: Resolve ───────────────────────────────────────────────────────
    let lookup_start = std::time::Instant::now();
    let lookups = resolve_identifiers(
        unique.iter().map(|r| r.participant_id.as_str()),
        resolver,
        options.lookup_concurrency,
    )
    .await;
    let lookup_time = lookup_start.elapsed().as_secs_f64();

    // ── Step 3: Region counts ─────────────────────────────────────────────────
    let region_counts = AttendanceAggregator::tally_regions(&unique, &lookups);

    // ── Step 4: Durations ─────────────────────────────────────────────────────
    let enriched = AttendanceAggregator::enrich(records, &lookups, options.meridiem);
    let identity_totals = AttendanceAggregator::aggregate_duration_by_identity(&enriched);
    let rows_with_duration = enriched
        .iter()
        .filter(|e| e.duration_minutes.is_some())
        .count();

    // ── Step 5: Histogram ─────────────────────────────────────────────────────
    let histogram = match options.histogram_basis {
        HistogramBasis::Record => AttendanceAggregator::bucketize(
            enriched.iter().filter_map(|e| e.duration_minutes),
            &options.bucket_edges,
        ),
        HistogramBasis::Identity => AttendanceAggregator::bucketize(
            identity_totals.values().copied(),
            &options.bucket_edges,
        ),
    };

    // ── Step 6: Relevant regions ──────────────────────────────────────────────
    let (relevant, other_regions) =
        AttendanceAggregator::filter_and_order_regions(&region_counts, options.medium);

    let metadata = ReportMetadata {
        generated_at: Utc::now().to_rfc3339(),
        rows_read: records.len(),
        unique_sessions: unique.len(),
        rows_with_duration,
        excluded_from_histogram: histogram.excluded,
        identifiers_resolved: lookups.len(),
        lookup_time_seconds: lookup_time,
        histogram_basis: options.histogram_basis,
    };

    info!(
        rows = metadata.rows_read,
        sessions = metadata.unique_sessions,
        with_duration = metadata.rows_with_duration,
        excluded = metadata.excluded_from_histogram,
        "attendance report computed"
    );

    AttendanceReport {
        medium: options.medium,
        region_counts,
        relevant,
        other_regions,
        histogram,
        identity_totals,
        records: enriched,
        metadata,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
