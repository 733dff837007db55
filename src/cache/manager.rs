//! Cache Manager Module
//!
//! `AnalysisCache` is the multi-tier engine: a bounded in-memory table with
//! an optional on-disk mirror, LRU eviction, lazy TTL re-validation and
//! usage statistics. It memoizes expensive computed results for concurrent
//! callers; producers only ever see store and fetch with opaque payloads.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::entry::CacheEntry;
use crate::cache::file_tier::{DiskRecordRef, FileTier};
use crate::cache::key::derive_simple_key;
use crate::cache::stats::{CacheStats, StatsSnapshot};
use crate::cache::table::CacheTable;
use crate::cache::{HIGH_WATER_MARK, LOW_WATER_MARK};
use crate::config::CacheConfig;

// == Analysis Cache ==
/// Multi-tier result cache, safe to share across tasks.
///
/// Cloning is cheap and every clone points at the same tiers. All table
/// mutations run under one exclusive lock; fetch probes take the shared
/// lock and record their bookkeeping atomically, so a fetch never blocks
/// another fetch. File I/O always happens outside the table lock.
#[derive(Debug)]
pub struct AnalysisCache<T> {
    /// The bounded memory tier
    inner: Arc<RwLock<CacheTable<T>>>,
    /// Shared performance counters
    stats: Arc<CacheStats>,
    /// On-disk mirror; `None` when disabled or the directory is unusable
    file_tier: Option<FileTier>,
    config: CacheConfig,
}

impl<T> Clone for AnalysisCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            stats: Arc::clone(&self.stats),
            file_tier: self.file_tier.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T> AnalysisCache<T> {
    // == Constructor ==
    /// Builds a cache from configuration. Never fails: an unusable cache
    /// directory disables the file tier for this instance with a warning.
    pub fn new(config: CacheConfig) -> Self {
        let config = config.normalized();

        let file_tier = if config.enable_file_tier {
            match FileTier::new(config.cache_dir.clone()) {
                Ok(tier) => Some(tier),
                Err(err) => {
                    warn!(
                        dir = %config.cache_dir.display(),
                        error = %err,
                        "cache directory unavailable, file tier disabled"
                    );
                    None
                }
            }
        } else {
            None
        };

        Self {
            inner: Arc::new(RwLock::new(CacheTable::new(
                config.max_entries,
                config.max_memory_bytes,
            ))),
            stats: Arc::new(CacheStats::new()),
            file_tier,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Whether the on-disk mirror is active for this instance.
    pub fn file_tier_enabled(&self) -> bool {
        self.file_tier.is_some()
    }

    // == Remove ==
    /// Removes a key from both tiers. Returns true if either copy existed.
    pub async fn remove(&self, key: &str) -> bool {
        let cache_key = derive_simple_key(key);

        let removed_memory = { self.inner.write().await.remove(&cache_key) };

        let mut removed_file = false;
        if let Some(tier) = &self.file_tier {
            match tier.remove(&cache_key).await {
                Ok(removed) => removed_file = removed,
                Err(err) => warn!(key, error = %err, "file tier remove failed"),
            }
        }

        removed_memory || removed_file
    }

    // == Clear All ==
    /// Drops every entry and every cache file.
    pub async fn clear_all(&self) {
        let cleared = { self.inner.write().await.clear() };

        if let Some(tier) = &self.file_tier {
            if let Err(err) = tier.clear().await {
                warn!(error = %err, "file tier clear failed");
            }
        }

        debug!(cleared, "cache cleared");
    }

    // == Clear Expired ==
    /// Removes every expired entry from memory, then every expired file from
    /// disk. Returns the total removed. Fetch already re-validates lazily;
    /// this bounds growth from entries stored and never re-fetched.
    pub async fn clear_expired(&self) -> usize {
        let mut removed = { self.inner.write().await.clear_expired(&self.stats) };

        if let Some(tier) = &self.file_tier {
            match tier.purge_expired().await {
                Ok(purged) => {
                    self.stats.record_expired(purged as u64);
                    removed += purged;
                }
                Err(err) => warn!(error = %err, "file tier purge failed"),
            }
        }

        removed
    }

    // == Is Valid ==
    /// Memory-tier liveness probe without touching bookkeeping. With
    /// `max_age` the entry's own TTL is ignored in favor of the given age
    /// limit in seconds.
    pub async fn is_valid(&self, key: &str, max_age: Option<u64>) -> bool {
        let cache_key = derive_simple_key(key);
        let table = self.inner.read().await;
        match table.get(&cache_key) {
            Some(entry) => match max_age {
                Some(limit) => entry.age_seconds() <= limit as i64,
                None => !entry.is_expired(),
            },
            None => false,
        }
    }

    // == Optimize ==
    /// On-demand pressure relief: expired sweep first, then, if usage still
    /// sits above the high-water mark of the memory bound, eviction by
    /// least-used / longest-idle down to the low-water mark.
    pub async fn optimize(&self) -> OptimizeReport {
        let started = Instant::now();

        let expired_removed = self.clear_expired().await;

        let evicted = {
            self.inner
                .write()
                .await
                .relieve_pressure(HIGH_WATER_MARK, LOW_WATER_MARK, &self.stats)
        };

        let (entries, memory_usage_bytes) = {
            let table = self.inner.read().await;
            (table.len(), table.memory_usage())
        };

        OptimizeReport {
            expired_removed,
            evicted,
            elapsed: started.elapsed(),
            memory_usage_bytes,
            entries,
        }
    }

    // == Stats ==
    /// Read-only snapshot of counters and tier usage.
    pub async fn stats(&self) -> StatsSnapshot {
        let (entries, memory_usage) = {
            let table = self.inner.read().await;
            (table.len(), table.memory_usage())
        };

        let file_tier_bytes = match &self.file_tier {
            Some(tier) => tier.total_size_bytes().await.unwrap_or_else(|err| {
                warn!(error = %err, "file tier size scan failed");
                0
            }),
            None => 0,
        };

        self.stats
            .snapshot(entries, memory_usage, self.config.max_memory_bytes, file_tier_bytes)
    }

    // == Entries ==
    /// Metadata for every memory-tier entry; values are not exposed.
    pub async fn entries(&self) -> Vec<EntryInfo> {
        let table = self.inner.read().await;
        table
            .iter()
            .map(|(key, entry)| EntryInfo {
                key: key.clone(),
                created_at: entry.created_at(),
                last_accessed: entry.last_accessed(),
                ttl_seconds: entry.ttl_seconds(),
                access_count: entry.access_count(),
                size_bytes: entry.size_bytes(),
                expired: entry.is_expired(),
            })
            .collect()
    }
}

impl<T: Serialize> AnalysisCache<T> {
    // == Store ==
    /// Stores a payload under a logical key with an optional TTL (the
    /// configured default otherwise; a zero TTL is corrected to the default).
    ///
    /// The payload is serialized up front, both as the size estimate and as
    /// the file-tier record, so no encoding happens inside the table lock.
    /// A non-serializable payload skips the file tier but still lands in
    /// memory. The evict-then-insert step is one critical section.
    pub async fn store(&self, key: &str, value: T, ttl: Option<u64>) {
        let ttl = ttl.filter(|t| *t > 0).unwrap_or(self.config.default_ttl);
        let cache_key = derive_simple_key(key);
        let created_at = Utc::now();

        let encoded = serde_json::to_vec(&value);
        // size is an estimate (serialized length); 0 when encoding fails
        let size_bytes = encoded.as_ref().map(|b| b.len() as u64).unwrap_or(0);

        let file_payload = match (&self.file_tier, encoded) {
            (Some(_), Ok(_)) => {
                match serde_json::to_vec(&DiskRecordRef {
                    value: &value,
                    created_at,
                    ttl_seconds: ttl,
                    size_bytes,
                    access_count: 0,
                }) {
                    Ok(bytes) => Some(bytes),
                    Err(err) => {
                        warn!(key, error = %err, "record encoding failed, file tier skipped");
                        None
                    }
                }
            }
            (Some(_), Err(err)) => {
                warn!(key, error = %err, "payload not serializable, file tier skipped");
                None
            }
            (None, _) => None,
        };

        {
            let mut table = self.inner.write().await;
            table.insert(
                cache_key.clone(),
                CacheEntry::new(value, ttl, size_bytes),
                &self.stats,
            );
        }

        match (&self.file_tier, file_payload) {
            (Some(tier), Some(bytes)) => {
                if let Err(err) = tier.write(&cache_key, &bytes).await {
                    warn!(key, error = %err, "file tier write failed, entry kept in memory only");
                    discard_stale_record(tier, &cache_key, key).await;
                }
            }
            // a skipped write must not leave a superseded record behind
            (Some(tier), None) => discard_stale_record(tier, &cache_key, key).await,
            (None, _) => {}
        }

        debug!(key, ttl, size_bytes, "stored cache entry");
    }
}

/// Drops whatever record a previous store left for this key, so the disk
/// never holds a value older than the one just stored in memory.
async fn discard_stale_record(tier: &FileTier, cache_key: &str, key: &str) {
    if let Err(err) = tier.remove(cache_key).await {
        warn!(key, error = %err, "stale cache record removal failed");
    }
}

impl<T: Clone + DeserializeOwned> AnalysisCache<T> {
    // == Fetch ==
    /// Looks a logical key up across both tiers.
    ///
    /// Memory hit: bookkeeping bumped, clone returned. Expired in memory:
    /// removed (counted as expired cleanup, not eviction) and the lookup
    /// falls through to disk, where an expired record is deleted the same
    /// way. A live disk record is promoted through the regular insert path,
    /// eviction policy included. Absence is `None`, never an error.
    pub async fn fetch(&self, key: &str) -> Option<T> {
        let cache_key = derive_simple_key(key);

        let mut expired_in_memory = false;
        {
            let table = self.inner.read().await;
            if let Some(entry) = table.get(&cache_key) {
                if !entry.is_expired() {
                    self.stats.record_hit();
                    return Some(entry.access(table.tick()).clone());
                }
                expired_in_memory = true;
            }
        }

        if expired_in_memory {
            let mut table = self.inner.write().await;
            // re-check under the exclusive lock; another caller may have
            // already cleaned it up or re-stored the key
            if table.get(&cache_key).map(|e| e.is_expired()).unwrap_or(false) {
                table.remove(&cache_key);
                self.stats.record_expired(1);
                debug!(key, "expired entry removed on fetch");
            }
        }

        if let Some(tier) = &self.file_tier {
            match tier.read::<T>(&cache_key).await {
                Ok(Some(record)) if !record.is_expired() => {
                    let value = record.value.clone();
                    let entry = CacheEntry::rehydrated(
                        record.value,
                        record.created_at,
                        record.ttl_seconds,
                        record.size_bytes,
                        record.access_count,
                    );
                    {
                        let mut table = self.inner.write().await;
                        // the read being served counts toward the entry's usage
                        entry.access(table.tick());
                        table.insert(cache_key, entry, &self.stats);
                    }
                    self.stats.record_hit();
                    debug!(key, "promoted entry from file tier");
                    return Some(value);
                }
                Ok(Some(_)) => {
                    if let Err(err) = tier.remove(&cache_key).await {
                        warn!(key, error = %err, "failed to delete expired cache file");
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(key, error = %err, "file tier read failed, treating key as absent");
                }
            }
        }

        self.stats.record_miss();
        None
    }
}

// == Optimize Report ==
/// Outcome of a pressure-relief pass, for observability.
#[derive(Debug, Clone)]
pub struct OptimizeReport {
    /// Entries and files removed by the expired sweep
    pub expired_removed: usize,
    /// Entries evicted to reach the low-water mark
    pub evicted: usize,
    pub elapsed: Duration,
    /// Memory usage after the pass
    pub memory_usage_bytes: u64,
    /// Entry count after the pass
    pub entries: usize,
}

// == Entry Info ==
/// Per-entry metadata exposed for inspection; the payload stays opaque.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EntryInfo {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub ttl_seconds: u64,
    pub access_count: u64,
    pub size_bytes: u64,
    pub expired: bool,
}
