//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support and
//! access bookkeeping.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};

// == Cache Entry ==
/// A single cached value plus its metadata.
///
/// Immutable except for access bookkeeping, which uses atomics so a read
/// under a shared lock can still record the access.
#[derive(Debug)]
pub struct CacheEntry<T> {
    /// The stored payload
    value: T,
    /// Creation timestamp; liveness is always derived from this plus the TTL
    created_at: DateTime<Utc>,
    /// Wall-clock time of the last access (Unix milliseconds), for reporting
    last_accessed_ms: AtomicI64,
    /// Logical access clock position, used for LRU ordering
    last_touch: AtomicU64,
    /// Seconds after creation during which the entry may be served
    ttl_seconds: u64,
    /// Number of times the value has been read
    access_count: AtomicU64,
    /// Estimated payload size in bytes (serialized length, not exact)
    size_bytes: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a fresh entry created "now".
    pub fn new(value: T, ttl_seconds: u64, size_bytes: u64) -> Self {
        let now = Utc::now();
        Self {
            value,
            created_at: now,
            last_accessed_ms: AtomicI64::new(now.timestamp_millis()),
            last_touch: AtomicU64::new(0),
            ttl_seconds,
            access_count: AtomicU64::new(0),
            size_bytes,
        }
    }

    /// Rebuilds an entry from a file-tier record, preserving its original
    /// creation time, TTL and access count so remaining liveness carries over.
    pub fn rehydrated(
        value: T,
        created_at: DateTime<Utc>,
        ttl_seconds: u64,
        size_bytes: u64,
        access_count: u64,
    ) -> Self {
        Self {
            value,
            created_at,
            last_accessed_ms: AtomicI64::new(Utc::now().timestamp_millis()),
            last_touch: AtomicU64::new(0),
            ttl_seconds,
            access_count: AtomicU64::new(access_count),
            size_bytes,
        }
    }

    // == Is Expired ==
    /// An entry is live iff `now - created_at <= ttl`; this is re-evaluated
    /// on every read and never cached as state.
    ///
    /// Millisecond precision, so an entry with a 1-second TTL is still live
    /// at 1.0s and expired at 1.001s.
    pub fn is_expired(&self) -> bool {
        self.age_ms() > (self.ttl_seconds as i64).saturating_mul(1000)
    }

    // == Access ==
    /// Side-effecting read: bumps the access counter and both access stamps,
    /// then returns the value.
    ///
    /// `touch` is the caller's logical clock tick; wall-clock milliseconds
    /// can tie under burst access, the logical clock cannot.
    pub fn access(&self, touch: u64) -> &T {
        self.last_accessed_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
        self.last_touch.store(touch, Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed);
        &self.value
    }

    /// Assigns the entry's initial LRU position at insert time.
    pub fn set_touch(&self, touch: u64) {
        self.last_touch.store(touch, Ordering::Relaxed);
    }

    // == Accessors ==
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    pub fn last_touch(&self) -> u64 {
        self.last_touch.load(Ordering::Relaxed)
    }

    /// Last access as a wall-clock timestamp.
    pub fn last_accessed(&self) -> DateTime<Utc> {
        let ms = self.last_accessed_ms.load(Ordering::Relaxed);
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Entry age in whole seconds.
    pub fn age_seconds(&self) -> i64 {
        (Utc::now() - self.created_at).num_seconds()
    }

    fn age_ms(&self) -> i64 {
        (Utc::now() - self.created_at).num_milliseconds()
    }

    /// Remaining TTL in seconds; 0 once expired. Reporting only.
    pub fn ttl_remaining(&self) -> u64 {
        let remaining_ms = (self.ttl_seconds as i64).saturating_mul(1000) - self.age_ms();
        if remaining_ms > 0 {
            (remaining_ms / 1000) as u64
        } else {
            0
        }
    }
}
