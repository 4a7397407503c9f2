//! In-process analysis cache keyed by a content hash.
//!
//! Entries live for a fixed TTL (24 hours by default). Lookup filters by
//! expiry and removes stale entries as it finds them; an hourly sweeper
//! task exists only to reclaim memory for keys that are never read again.
//! Cache operations never fail: a miss is indistinguishable from "not yet
//! computed", and filling the cache is the caller's job.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Request metadata that participates in the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisKey {
    pub app_id: String,
    pub component_name: String,
    pub environment: String,
    pub version: String,
}

impl AnalysisKey {
    pub fn new(app_id: &str, component_name: &str, environment: &str, version: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            component_name: component_name.to_string(),
            environment: environment.to_string(),
            version: version.to_string(),
        }
    }
}

/// SHA-256 over the raw content followed by the JSON-serialized metadata
/// tuple. The serialization is order-sensitive, so identical content with
/// different metadata always produces a different key.
pub fn generate_analysis_hash(content: &[u8], key: &AnalysisKey) -> String {
    let metadata = serde_json::json!([
        key.app_id,
        key.component_name,
        key.environment,
        key.version,
    ]);

    let mut hasher = Sha256::new();
    hasher.update(content);
    hasher.update(metadata.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    24 * 3600
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct CacheEntry {
    analysis: Value,
    expires_at: DateTime<Utc>,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

/// Process-local analysis cache.
///
/// Constructed explicitly and shared via `Arc`, never through module-level
/// state, so tests get isolated instances and a deployment can swap it for
/// a shared store without touching call sites.
///
/// There is no single-flight de-duplication: concurrent misses for the
/// same key may each trigger an upstream analysis, and the last write
/// wins. The only guarantee is that an entry is never returned past its
/// expiry.
#[derive(Debug)]
pub struct AnalysisCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    stats: RwLock<CacheStats>,
    ttl: ChronoDuration,
    sweep_interval: Duration,
}

impl AnalysisCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
            ttl: ChronoDuration::seconds(config.ttl_secs as i64),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        }
    }

    /// Stored analysis for `hash`, or `None` when absent or expired.
    /// Expired entries are removed on the way out.
    pub fn get(&self, hash: &str) -> Option<Value> {
        self.get_at(hash, Utc::now())
    }

    pub fn get_at(&self, hash: &str, now: DateTime<Utc>) -> Option<Value> {
        let mut entries = self.entries.write();

        match entries.get(hash) {
            Some(entry) if now < entry.expires_at => {
                let analysis = entry.analysis.clone();
                self.stats.write().hits += 1;
                Some(analysis)
            }
            Some(_) => {
                entries.remove(hash);
                debug!(hash, "cache entry expired on lookup");
                let mut stats = self.stats.write();
                stats.misses += 1;
                stats.evictions += 1;
                None
            }
            None => {
                self.stats.write().misses += 1;
                None
            }
        }
    }

    /// Store `analysis` under `hash` with a fresh expiry, overwriting any
    /// prior entry.
    pub fn insert(&self, hash: &str, analysis: Value) {
        self.insert_at(hash, analysis, Utc::now());
    }

    pub fn insert_at(&self, hash: &str, analysis: Value, now: DateTime<Utc>) {
        let entry = CacheEntry {
            analysis,
            expires_at: now + self.ttl,
        };
        self.entries.write().insert(hash.to_string(), entry);
        self.stats.write().inserts += 1;
    }

    /// Drop every expired entry; returns how many were removed. `get`
    /// already filters by expiry, so this only reclaims memory.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        let removed = before - entries.len();

        if removed > 0 {
            debug!(removed, "cache sweep removed expired entries");
            self.stats.write().evictions += removed as u64;
        }
        removed
    }

    /// Periodic sweeper. The handle can be aborted at shutdown; entries
    /// are in-memory only, so nothing needs flushing.
    pub fn spawn_sweeper(cache: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let period = cache.sweep_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so a fresh cache
            // is not swept at startup.
            interval.tick().await;
            loop {
                interval.tick().await;
                cache.sweep();
            }
        })
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.read()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
