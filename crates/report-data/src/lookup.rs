//! Concurrent region resolution with a bounded number of in-flight lookups.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use report_core::models::{AttendanceRecord, RegionCount};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::aggregator::AttendanceAggregator;
use crate::resolver::RegionResolver;

/// Default number of lookups allowed in flight at once.
pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 8;

/// Resolve each distinct, non-empty identifier once.
///
/// At most `concurrency` lookups run at a time. Results are collected into a
/// single map owned by the caller; a panicked lookup task is logged and its
/// identifier left out (and so treated as unknown downstream).
pub async fn resolve_identifiers<'a, I>(
    identifiers: I,
    resolver: Arc<dyn RegionResolver>,
    concurrency: usize,
) -> HashMap<String, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let distinct: BTreeSet<String> = identifiers
        .into_iter()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    debug!(
        resolver = resolver.name(),
        identifiers = distinct.len(),
        concurrency,
        "resolving regions"
    );

    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for identifier in distinct {
        let permits = Arc::clone(&permits);
        let resolver = Arc::clone(&resolver);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            let region = resolver.resolve(&identifier).await;
            (identifier, region)
        });
    }

    let mut regions = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((identifier, region)) => {
                regions.insert(identifier, region);
            }
            Err(e) => warn!("region lookup task failed: {}", e),
        }
    }
    regions
}

/// De-duplicate `records` by session (first wins), resolve each kept row's
/// participant and count one region per unique session.
pub async fn resolve_regions(
    records: &[AttendanceRecord],
    resolver: Arc<dyn RegionResolver>,
    concurrency: usize,
) -> RegionCount {
    let unique = AttendanceAggregator::dedup_by_session(records);
    let lookups = resolve_identifiers(
        unique.iter().map(|r| r.participant_id.as_str()),
        resolver,
        concurrency,
    )
    .await;
    AttendanceAggregator::tally_regions(&unique, &lookups)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
