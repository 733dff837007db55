//! Cache Statistics Module
//!
//! Tracks cache performance counters and produces read-only snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Shared performance counters.
///
/// Atomic so hot-path reads (hits/misses) never need the table lock.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Successful retrievals, memory or promoted from disk
    hits: AtomicU64,
    /// Retrievals that found nothing live in either tier
    misses: AtomicU64,
    /// Entries removed to satisfy the memory bounds
    evictions: AtomicU64,
    /// Entries and files removed because their TTL had elapsed
    expired_cleanups: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired(&self, count: u64) {
        self.expired_cleanups.fetch_add(count, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn expired_cleanups(&self) -> u64 {
        self.expired_cleanups.load(Ordering::Relaxed)
    }

    // == Snapshot ==
    /// Combines the counters with table and file-tier measurements into one
    /// immutable snapshot.
    pub fn snapshot(
        &self,
        entries: usize,
        memory_usage_bytes: u64,
        max_memory_bytes: Option<u64>,
        file_tier_bytes: u64,
    ) -> StatsSnapshot {
        let hits = self.hits();
        let misses = self.misses();
        StatsSnapshot {
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
            entries,
            memory_usage_bytes,
            max_memory_bytes,
            file_tier_bytes,
            evictions: self.evictions(),
            expired_cleanups: self.expired_cleanups(),
        }
    }
}

/// hits / (hits + misses), or 0.0 before any request.
fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

// == Stats Snapshot ==
/// Point-in-time view of cache health; computing one mutates nothing.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    /// Current number of entries in the memory tier
    pub entries: usize,
    /// Estimated memory usage (sum of entry size estimates)
    pub memory_usage_bytes: u64,
    /// Configured memory bound; `None` means unbounded
    pub max_memory_bytes: Option<u64>,
    /// Total size of the on-disk tier in bytes
    pub file_tier_bytes: u64,
    pub evictions: u64,
    pub expired_cleanups: u64,
}
