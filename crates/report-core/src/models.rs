use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::formatting::format_edge;
use crate::regions;

/// Region label used whenever a lookup fails or an input is unmapped.
pub const UNKNOWN_REGION: &str = "Unknown";

/// Default duration bucket edges in minutes; the last bucket is unbounded.
pub const DEFAULT_BUCKET_EDGES: &[f64] = &[0.0, 1.0, 5.0, 20.0, 40.0, 60.0, 80.0];

// ── Input records ─────────────────────────────────────────────────────────────

/// One row of the attendance sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Meeting / session identifier. Rows sharing it describe one session.
    pub session_id: String,
    /// Participant identifier (an IP address in the exported sheets).
    pub participant_id: String,
    /// Raw start-time cell, e.g. `"09:00:00"` or `"9:00:00 AM"`.
    pub start_raw: String,
    /// Free-text cell carrying an embedded `HH:MM:SS AM/PM` token.
    pub embedded_raw: String,
    /// Optional free-text location cell.
    #[serde(default)]
    pub location: Option<String>,
}

/// An [`AttendanceRecord`] with its resolved region and computed duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub record: AttendanceRecord,
    /// Canonical region label, [`UNKNOWN_REGION`] when unresolved.
    pub region: String,
    /// Minutes between the start time and the embedded time. May be negative.
    pub duration_minutes: Option<f64>,
}

/// Region name → number of unique sessions attributed to it.
pub type RegionCount = BTreeMap<String, u64>;

/// Participant identifier → summed duration in minutes.
pub type IdentityAggregate = BTreeMap<String, f64>;

/// A region paired with its session count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionTally {
    pub region: String,
    pub count: u64,
}

/// Regions outside the medium's allow-list, sorted by count then name.
pub type OtherRegionsTable = Vec<RegionTally>;

/// The allow-listed regions for one medium plus everything else folded into
/// a single total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantRegions {
    pub medium: Medium,
    /// One entry per allow-listed region, in the allow-list's order.
    pub ordered: Vec<RegionTally>,
    /// Sum of counts for every region not on the allow-list.
    pub other_total: u64,
}

impl RelevantRegions {
    /// Sum of the allow-listed counts.
    pub fn relevant_total(&self) -> u64 {
        self.ordered.iter().map(|t| t.count).sum()
    }
}

// ── Selectors ─────────────────────────────────────────────────────────────────

/// Which allow-list of regions a report run considers relevant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    Hindi,
    English,
}

impl Medium {
    /// Human-readable label written into exports, e.g. `"Hindi Medium"`.
    pub fn label(&self) -> &'static str {
        match self {
            Medium::Hindi => "Hindi Medium",
            Medium::English => "English Medium",
        }
    }

    /// Allow-listed regions in canonical order.
    pub fn allow_list(&self) -> &'static [&'static str] {
        match self {
            Medium::Hindi => regions::HINDI_MEDIUM_REGIONS,
            Medium::English => regions::ENGLISH_MEDIUM_REGIONS,
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How AM/PM suffixes are treated when parsing clock times.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MeridiemMode {
    /// Discard the suffix and read the digits as a 24-hour clock.
    #[default]
    Strip,
    /// Read `HH:MM:SS AM/PM` as a 12-hour clock.
    Honor,
}

/// What one histogram entry represents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HistogramBasis {
    /// One entry per record with a duration.
    #[default]
    Record,
    /// One entry per participant, using their summed duration.
    Identity,
}

// ── Duration buckets ──────────────────────────────────────────────────────────

/// Strictly increasing, finite bucket boundaries. The final bucket extends
/// from the last edge to infinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketEdges(Vec<f64>);

impl BucketEdges {
    /// Validate and wrap `edges`.
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.is_empty() {
            return Err(ReportError::InvalidBucketEdges(
                "at least one edge is required".to_string(),
            ));
        }
        if let Some(bad) = edges.iter().find(|e| !e.is_finite()) {
            return Err(ReportError::InvalidBucketEdges(format!(
                "edge {} is not finite",
                bad
            )));
        }
        if let Some(w) = edges.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ReportError::InvalidBucketEdges(format!(
                "{} is not greater than {}",
                format_edge(w[1]),
                format_edge(w[0])
            )));
        }
        Ok(Self(edges))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of buckets, including the unbounded last one.
    pub fn bucket_count(&self) -> usize {
        self.0.len()
    }

    /// Index of the half-open bucket `[edge_i, edge_i+1)` containing `value`.
    ///
    /// Returns `None` for values below the first edge and for NaN.
    pub fn bucket_index(&self, value: f64) -> Option<usize> {
        if value.is_nan() || value < self.0[0] {
            return None;
        }
        // Number of edges <= value, minus one, is the bucket index.
        let idx = self.0.partition_point(|edge| *edge <= value);
        Some(idx - 1)
    }

    /// The ordered buckets described by these edges.
    pub fn buckets(&self) -> Vec<DurationBucket> {
        let last = self.0.len() - 1;
        self.0
            .iter()
            .enumerate()
            .map(|(i, &lower)| {
                let upper = (i < last).then(|| self.0[i + 1]);
                DurationBucket {
                    label: bucket_label(i, lower, upper),
                    lower,
                    upper,
                }
            })
            .collect()
    }
}

impl Default for BucketEdges {
    fn default() -> Self {
        Self(DEFAULT_BUCKET_EDGES.to_vec())
    }
}

impl FromStr for BucketEdges {
    type Err = ReportError;

    /// Parse a comma-separated list such as `"0,1,5,20"`.
    fn from_str(s: &str) -> Result<Self> {
        let edges = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<f64>().map_err(|_| {
                    ReportError::InvalidBucketEdges(format!("\"{}\" is not a number", part))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        Self::new(edges)
    }
}

/// One half-open minute range of the histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationBucket {
    /// Display label, e.g. `"5-20 mins"`.
    pub label: String,
    /// Inclusive lower bound in minutes.
    pub lower: f64,
    /// Exclusive upper bound, `None` for the final unbounded bucket.
    pub upper: Option<f64>,
}

/// A bucket with the number of values that fell into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub bucket: DurationBucket,
    pub count: u64,
}

/// Histogram over every bucket in order, empty buckets included.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderedHistogram {
    pub bins: Vec<HistogramBin>,
    /// Values that fell in no bucket (negative or below the first edge).
    pub excluded: u64,
}

impl OrderedHistogram {
    /// Total count across all bins, excluding out-of-range values.
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }

    /// Largest single bin count (0 for an empty histogram).
    pub fn max_count(&self) -> u64 {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }
}

fn bucket_label(index: usize, lower: f64, upper: Option<f64>) -> String {
    match upper {
        None => format!("{}+ mins", format_edge(lower)),
        Some(u) if index == 0 && lower == 0.0 => {
            let unit = if u == 1.0 { "min" } else { "mins" };
            format!("<{} {}", format_edge(u), unit)
        }
        Some(u) => format!("{}-{} mins", format_edge(lower), format_edge(u)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
