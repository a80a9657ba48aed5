//! Participant identifier → region lookup.
//!
//! Resolvers never fail: every error path degrades to [`UNKNOWN_REGION`] so a
//! flaky lookup service cannot abort a report run.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use report_core::error::{ReportError, Result};
use report_core::models::UNKNOWN_REGION;
use report_core::settings::APP_DIR_NAME;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// Default lookup service endpoint.
pub const IPINFO_API_BASE: &str = "https://ipinfo.io";

/// Attempts per identifier before giving up.
const MAX_LOOKUP_ATTEMPTS: u32 = 3;

/// Linear back-off step between attempts (0 ms, 100 ms, 200 ms).
const BACKOFF_STEP_MS: u64 = 100;

// ── RegionResolver ────────────────────────────────────────────────────────────

/// Maps a participant identifier to a region label.
#[async_trait]
pub trait RegionResolver: Send + Sync {
    /// Region for `identifier`, or [`UNKNOWN_REGION`] when it cannot be found.
    async fn resolve(&self, identifier: &str) -> String;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;
}

// ── IpInfoResolver ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    region: Option<String>,
}

/// Looks up IP addresses with the ipinfo.io JSON API.
pub struct IpInfoResolver {
    client: Client,
    token: String,
    base_url: String,
}

impl IpInfoResolver {
    /// Create a resolver with a per-request `timeout`.
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(token, timeout, IPINFO_API_BASE)
    }

    /// Same as [`IpInfoResolver::new`] against a different endpoint.
    pub fn with_base_url(
        token: impl Into<String>,
        timeout: Duration,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::Lookup(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_once(&self, ip: IpAddr) -> Result<String> {
        let mut request = self.client.get(format!("{}/{}/json", self.base_url, ip));
        if !self.token.is_empty() {
            request = request.query(&[("token", self.token.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ReportError::Lookup(format!("request for {} failed: {}", ip, e)))?;

        if !response.status().is_success() {
            return Err(ReportError::Lookup(format!(
                "lookup for {} returned {}",
                ip,
                response.status()
            )));
        }

        let body: IpInfoResponse = response
            .json()
            .await
            .map_err(|e| ReportError::Lookup(format!("bad response for {}: {}", ip, e)))?;

        Ok(body
            .region
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_REGION.to_string()))
    }
}

#[async_trait]
impl RegionResolver for IpInfoResolver {
    async fn resolve(&self, identifier: &str) -> String {
        let Ok(ip) = identifier.trim().parse::<IpAddr>() else {
            debug!("\"{}\" is not an IP address; region unknown", identifier);
            return UNKNOWN_REGION.to_string();
        };

        let mut last_error = None;
        for attempt in 0..MAX_LOOKUP_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(BACKOFF_STEP_MS * attempt as u64)).await;
            }
            match self.fetch_once(ip).await {
                Ok(region) => return region,
                Err(e) => {
                    debug!(attempt = attempt + 1, error = %e, "region lookup attempt failed");
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            warn!(ip = %ip, error = %e, "region lookup failed; using {}", UNKNOWN_REGION);
        }
        UNKNOWN_REGION.to_string()
    }

    fn name(&self) -> &'static str {
        "ipinfo"
    }
}

// ── StaticResolver ────────────────────────────────────────────────────────────

/// Answers from a fixed identifier → region map.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    regions: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new(regions: HashMap<String, String>) -> Self {
        Self { regions }
    }

    /// Load a JSON object of `{"identifier": "region"}` pairs.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ReportError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let regions: HashMap<String, String> = serde_json::from_str(&content)?;
        Ok(Self::new(regions))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticResolver {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[async_trait]
impl RegionResolver for StaticResolver {
    async fn resolve(&self, identifier: &str) -> String {
        self.regions
            .get(identifier.trim())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_REGION.to_string())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

// ── CachedResolver ────────────────────────────────────────────────────────────

/// Wraps another resolver with an identifier → region cache that can be
/// persisted as JSON. Only answers other than [`UNKNOWN_REGION`] are cached.
pub struct CachedResolver {
    inner: Arc<dyn RegionResolver>,
    path: Option<PathBuf>,
    entries: Mutex<HashMap<String, String>>,
}

impl CachedResolver {
    /// Default cache file: `~/.attendance-report/cache/regions.json`.
    pub fn default_cache_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join("cache")
            .join("regions.json")
    }

    /// Cache backed by `path`. A missing or unreadable file starts empty.
    pub fn open(inner: Arc<dyn RegionResolver>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries: HashMap<String, String> = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring unreadable region cache {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        debug!("Region cache {} holds {} entries", path.display(), entries.len());

        Self {
            inner,
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    /// Cache that lives only for this process.
    pub fn in_memory(inner: Arc<dyn RegionResolver>) -> Self {
        Self {
            inner,
            path: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.lock().len()
    }

    /// Atomically write the cache to its file; no-op for in-memory caches.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = {
            let entries = self.lock();
            // Sorted keys keep the file diff-friendly.
            let sorted: std::collections::BTreeMap<&String, &String> = entries.iter().collect();
            serde_json::to_string_pretty(&sorted)?
        };

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RegionResolver for CachedResolver {
    async fn resolve(&self, identifier: &str) -> String {
        let key = identifier.trim();
        let cached = self.lock().get(key).cloned();
        if let Some(hit) = cached {
            return hit;
        }

        let region = self.inner.resolve(key).await;
        if region != UNKNOWN_REGION {
            self.lock().insert(key.to_string(), region.clone());
        }
        region
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
