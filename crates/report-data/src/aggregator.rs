//! Region tallies, duration totals and histograms over attendance records.

use std::collections::{HashMap, HashSet};

use report_core::models::{
    AttendanceRecord, BucketEdges, EnrichedRecord, HistogramBin, IdentityAggregate,
    MeridiemMode, Medium, OrderedHistogram, OtherRegionsTable, RegionCount, RegionTally,
    RelevantRegions, UNKNOWN_REGION,
};
use report_core::regions::{canonicalize_region, is_known_region, region_in_text};
use report_core::time_utils::parse_duration_with;
use tracing::debug;

/// Stateless helper grouping attendance records by region, participant and
/// duration bucket.
pub struct AttendanceAggregator;

impl AttendanceAggregator {
    /// Keep the first record of every session identifier, in input order.
    pub fn dedup_by_session(records: &[AttendanceRecord]) -> Vec<&AttendanceRecord> {
        let mut seen: HashSet<&str> = HashSet::new();
        records
            .iter()
            .filter(|r| seen.insert(r.session_id.as_str()))
            .collect()
    }

    /// Canonical region for `record` given the resolver answers in `lookups`.
    ///
    /// Falls back to a region named in the record's location text when the
    /// lookup is missing or unknown.
    pub fn region_for(record: &AttendanceRecord, lookups: &HashMap<String, String>) -> String {
        let looked_up = lookups
            .get(record.participant_id.trim())
            .map(|r| canonicalize_region(r))
            .unwrap_or_else(|| UNKNOWN_REGION.to_string());
        if looked_up != UNKNOWN_REGION {
            return looked_up;
        }

        let Some(location) = record.location.as_deref() else {
            return looked_up;
        };
        let direct = canonicalize_region(location);
        if is_known_region(&direct) {
            return direct;
        }
        match region_in_text(location) {
            Some(found) => {
                debug!("Region for {} taken from location text", record.participant_id);
                found.to_string()
            }
            None => looked_up,
        }
    }

    /// Count one region per record. Callers pass session-deduplicated
    /// records so the total equals the number of unique sessions.
    pub fn tally_regions(
        unique: &[&AttendanceRecord],
        lookups: &HashMap<String, String>,
    ) -> RegionCount {
        let mut counts = RegionCount::new();
        for record in unique {
            *counts.entry(Self::region_for(record, lookups)).or_insert(0) += 1;
        }
        counts
    }

    /// Split `counts` into the medium's allow-listed regions (allow-list
    /// order, zero-filled) and everything else.
    ///
    /// The second value lists the non-allow-listed regions by count
    /// descending, then name.
    pub fn filter_and_order_regions(
        counts: &RegionCount,
        medium: Medium,
    ) -> (RelevantRegions, OtherRegionsTable) {
        let allow = medium.allow_list();

        let ordered: Vec<RegionTally> = allow
            .iter()
            .map(|region| RegionTally {
                region: (*region).to_string(),
                count: counts.get(*region).copied().unwrap_or(0),
            })
            .collect();

        let mut others: OtherRegionsTable = counts
            .iter()
            .filter(|(region, _)| !allow.contains(&region.as_str()))
            .map(|(region, count)| RegionTally {
                region: region.clone(),
                count: *count,
            })
            .collect();
        others.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.region.cmp(&b.region)));

        let other_total = others.iter().map(|t| t.count).sum();

        (
            RelevantRegions {
                medium,
                ordered,
                other_total,
            },
            others,
        )
    }

    /// Attach region and duration to every record (duplicates included).
    pub fn enrich(
        records: &[AttendanceRecord],
        lookups: &HashMap<String, String>,
        mode: MeridiemMode,
    ) -> Vec<EnrichedRecord> {
        records
            .iter()
            .map(|record| {
                let duration_minutes =
                    parse_duration_with(&record.start_raw, &record.embedded_raw, mode);
                if duration_minutes.is_none() {
                    debug!(
                        session = %record.session_id,
                        "no duration: start={:?} embedded={:?}",
                        record.start_raw,
                        record.embedded_raw
                    );
                }
                EnrichedRecord {
                    record: record.clone(),
                    region: Self::region_for(record, lookups),
                    duration_minutes,
                }
            })
            .collect()
    }

    /// Sum non-null durations per participant. Participants with no
    /// parseable duration are omitted.
    pub fn aggregate_duration_by_identity(records: &[EnrichedRecord]) -> IdentityAggregate {
        let mut totals = IdentityAggregate::new();
        for enriched in records {
            if let Some(minutes) = enriched.duration_minutes {
                *totals
                    .entry(enriched.record.participant_id.clone())
                    .or_insert(0.0) += minutes;
            }
        }
        totals
    }

    /// Count `durations` into the buckets described by `edges`.
    ///
    /// Every bucket is emitted, empty ones with count 0. Values below the
    /// first edge (including negatives) and NaN are counted as `excluded`.
    pub fn bucketize<I>(durations: I, edges: &BucketEdges) -> OrderedHistogram
    where
        I: IntoIterator<Item = f64>,
    {
        let mut counts = vec![0u64; edges.bucket_count()];
        let mut excluded = 0u64;

        for value in durations {
            match edges.bucket_index(value) {
                Some(i) => counts[i] += 1,
                None => excluded += 1,
            }
        }

        OrderedHistogram {
            bins: edges
                .buckets()
                .into_iter()
                .zip(counts)
                .map(|(bucket, count)| HistogramBin { bucket, count })
                .collect(),
            excluded,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(session: &str, participant: &str, start: &str, embedded: &str) -> AttendanceRecord {
        AttendanceRecord {
            session_id: session.to_string(),
            participant_id: participant.to_string(),
            start_raw: start.to_string(),
            embedded_raw: embedded.to_string(),
            location: None,
        }
    }

    fn lookups(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ── dedup_by_session ──────────────────────────────────────────────────────

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let records = vec![
            rec("m1", "a", "", ""),
            rec("m2", "b", "", ""),
            rec("m1", "c", "", ""),
        ];
        let unique = AttendanceAggregator::dedup_by_session(&records);
        let participants: Vec<&str> = unique.iter().map(|r| r.participant_id.as_str()).collect();
        assert_eq!(participants, vec!["a", "b"]);
    }

    // ── region_for / tally_regions ────────────────────────────────────────────

    #[test]
    fn test_region_for_canonicalises_lookup() {
        let record = rec("m1", "1.1.1.1", "", "");
        let map = lookups(&[("1.1.1.1", "UP")]);
        assert_eq!(AttendanceAggregator::region_for(&record, &map), "Uttar Pradesh");
    }

    #[test]
    fn test_region_for_location_fallback() {
        let mut record = rec("m1", "1.1.1.1", "", "");
        record.location = Some("KGBV Imphal, Manipur".to_string());
        let map = lookups(&[("1.1.1.1", "Unknown")]);
        assert_eq!(AttendanceAggregator::region_for(&record, &map), "Manipur");

        record.location = Some("MP".to_string());
        assert_eq!(AttendanceAggregator::region_for(&record, &HashMap::new()), "Madhya Pradesh");

        record.location = Some("somewhere".to_string());
        assert_eq!(AttendanceAggregator::region_for(&record, &map), UNKNOWN_REGION);
    }

    #[test]
    fn test_region_for_lookup_wins_over_location() {
        let mut record = rec("m1", "1.1.1.1", "", "");
        record.location = Some("Gujarat".to_string());
        let map = lookups(&[("1.1.1.1", "Rajasthan")]);
        assert_eq!(AttendanceAggregator::region_for(&record, &map), "Rajasthan");
    }

    #[test]
    fn test_tally_regions_sums_to_unique_sessions() {
        let records = vec![
            rec("m1", "a", "", ""),
            rec("m2", "b", "", ""),
            rec("m1", "b", "", ""),
            rec("m3", "c", "", ""),
        ];
        let map = lookups(&[("a", "Gujarat"), ("b", "Gujarat")]);
        let unique = AttendanceAggregator::dedup_by_session(&records);
        let counts = AttendanceAggregator::tally_regions(&unique, &map);

        assert_eq!(counts.get("Gujarat"), Some(&2));
        assert_eq!(counts.get(UNKNOWN_REGION), Some(&1));
        assert_eq!(counts.values().sum::<u64>(), 3);
    }

    // ── filter_and_order_regions ──────────────────────────────────────────────

    #[test]
    fn test_filter_and_order_zero_fills_in_allow_list_order() {
        let mut counts = RegionCount::new();
        counts.insert("Haryana".to_string(), 4);
        counts.insert("Uttar Pradesh".to_string(), 1);
        counts.insert("Kerala".to_string(), 2);
        counts.insert(UNKNOWN_REGION.to_string(), 3);

        let (relevant, others) =
            AttendanceAggregator::filter_and_order_regions(&counts, Medium::Hindi);

        let order: Vec<(&str, u64)> = relevant
            .ordered
            .iter()
            .map(|t| (t.region.as_str(), t.count))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Uttar Pradesh", 1),
                ("Gujarat", 0),
                ("Jharkhand", 0),
                ("Rajasthan", 0),
                ("Madhya Pradesh", 0),
                ("Haryana", 4),
                ("Himachal Pradesh", 0),
            ]
        );
        assert_eq!(relevant.other_total, 5);
        assert_eq!(relevant.relevant_total() + relevant.other_total, 10);

        let other_names: Vec<&str> = others.iter().map(|t| t.region.as_str()).collect();
        assert_eq!(other_names, vec![UNKNOWN_REGION, "Kerala"]);
    }

    #[test]
    fn test_filter_and_order_other_ties_sorted_by_name() {
        let mut counts = RegionCount::new();
        counts.insert("Kerala".to_string(), 2);
        counts.insert("Bihar".to_string(), 2);
        counts.insert("Gujarat".to_string(), 9);

        let (relevant, others) =
            AttendanceAggregator::filter_and_order_regions(&counts, Medium::English);
        assert_eq!(relevant.relevant_total(), 0);
        assert_eq!(relevant.ordered.len(), 5);
        let names: Vec<&str> = others.iter().map(|t| t.region.as_str()).collect();
        assert_eq!(names, vec!["Gujarat", "Bihar", "Kerala"]);
        assert_eq!(relevant.other_total, 13);
    }

    #[test]
    fn test_filter_and_order_empty_counts() {
        let (relevant, others) =
            AttendanceAggregator::filter_and_order_regions(&RegionCount::new(), Medium::English);
        assert!(relevant.ordered.iter().all(|t| t.count == 0));
        assert_eq!(relevant.other_total, 0);
        assert!(others.is_empty());
    }

    // ── enrich / aggregate_duration_by_identity ───────────────────────────────

    #[test]
    fn test_enrich_keeps_every_row() {
        let records = vec![
            rec("m1", "a", "09:00:00", "09:05:00 AM"),
            rec("m1", "a", "09:00:00", "no time"),
        ];
        let enriched =
            AttendanceAggregator::enrich(&records, &lookups(&[("a", "Gujarat")]), MeridiemMode::Strip);
        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].duration_minutes, Some(5.0));
        assert_eq!(enriched[1].duration_minutes, None);
        assert!(enriched.iter().all(|e| e.region == "Gujarat"));
    }

    #[test]
    fn test_aggregate_duration_by_identity() {
        let records = vec![
            rec("m1", "a", "09:00:00", "09:05:00 AM"),
            rec("m2", "a", "09:00:00", "09:10:00 AM"),
            rec("m3", "b", "09:00:00", "garbage"),
            rec("m4", "c", "09:10:00", "09:05:00 AM"),
        ];
        let enriched = AttendanceAggregator::enrich(&records, &HashMap::new(), MeridiemMode::Strip);
        let totals = AttendanceAggregator::aggregate_duration_by_identity(&enriched);

        assert_eq!(totals.get("a"), Some(&15.0));
        assert!(!totals.contains_key("b"));
        assert_eq!(totals.get("c"), Some(&-5.0));
    }

    // ── bucketize ─────────────────────────────────────────────────────────────

    #[test]
    fn test_bucketize_five_minutes_lands_in_five_to_twenty() {
        let hist = AttendanceAggregator::bucketize([5.0], &BucketEdges::default());
        assert_eq!(hist.bins[2].bucket.label, "5-20 mins");
        assert_eq!(hist.bins[2].count, 1);
        assert_eq!(hist.total(), 1);
    }

    #[test]
    fn test_bucketize_emits_empty_buckets_and_excludes_negatives() {
        let hist =
            AttendanceAggregator::bucketize([0.5, 90.0, -2.0, 300.0], &BucketEdges::default());
        assert_eq!(hist.bins.len(), 7);
        let counts: Vec<u64> = hist.bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 0, 0, 0, 0, 0, 2]);
        assert_eq!(hist.excluded, 1);
    }

    #[test]
    fn test_bucketize_invariant_to_order() {
        let values = vec![0.2, 3.0, 19.9, 20.0, 45.0, 61.0, 81.0, 1.0];
        let mut reversed = values.clone();
        reversed.reverse();
        let edges = BucketEdges::default();
        assert_eq!(
            AttendanceAggregator::bucketize(values, &edges),
            AttendanceAggregator::bucketize(reversed, &edges)
        );
    }

    #[test]
    fn test_bucketize_custom_edges_below_first_edge_excluded() {
        let edges = BucketEdges::new(vec![10.0, 30.0]).unwrap();
        let hist = AttendanceAggregator::bucketize([5.0, 10.0, 29.0, 31.0], &edges);
        let labels: Vec<&str> = hist.bins.iter().map(|b| b.bucket.label.as_str()).collect();
        assert_eq!(labels, vec!["10-30 mins", "30+ mins"]);
        let counts: Vec<u64> = hist.bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 1]);
        assert_eq!(hist.excluded, 1);
    }
}
