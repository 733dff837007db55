//! Memory Table Module
//!
//! The bounded in-memory tier: a key-to-entry map with LRU eviction, expired
//! sweeps and pressure relief. Callers wrap it in a lock; every `&mut`
//! method here is one critical section.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cache::entry::CacheEntry;
use crate::cache::stats::CacheStats;

// == Cache Table ==
/// In-memory entry table with configurable entry-count and byte bounds.
///
/// `memory_usage` equals the sum of entry size estimates whenever no `&mut`
/// method is mid-flight.
#[derive(Debug)]
pub struct CacheTable<T> {
    /// Physical key to entry; keys are unique
    entries: HashMap<String, CacheEntry<T>>,
    /// Logical access clock handed to entries for LRU ordering
    clock: AtomicU64,
    /// Aggregate of entry size estimates
    memory_usage: u64,
    /// Entry-count bound; `None` = unbounded
    max_entries: Option<usize>,
    /// Byte bound; `None` = unbounded
    max_memory: Option<u64>,
}

impl<T> CacheTable<T> {
    // == Constructor ==
    pub fn new(max_entries: Option<usize>, max_memory: Option<u64>) -> Self {
        Self {
            entries: HashMap::new(),
            clock: AtomicU64::new(1),
            memory_usage: 0,
            max_entries,
            max_memory,
        }
    }

    /// Next logical clock value. Shared-lock callers use this to stamp
    /// accesses without taking the write lock.
    pub fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    // == Lookup ==
    pub fn get(&self, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn memory_usage(&self) -> u64 {
        self.memory_usage
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry<T>)> {
        self.entries.iter()
    }

    // == Insert ==
    /// Evict-then-insert as one step: while the insert would break a bound,
    /// the least-recently-accessed entry is removed (counted per victim),
    /// until the bounds hold or the table is empty. Overwriting an existing
    /// key releases its old size first.
    pub fn insert(&mut self, key: String, entry: CacheEntry<T>, stats: &CacheStats) {
        if let Some(old) = self.entries.remove(&key) {
            self.memory_usage = self.memory_usage.saturating_sub(old.size_bytes());
        }

        let incoming = entry.size_bytes();
        while self.would_exceed_bounds(incoming) {
            let Some(victim) = self.lru_key() else { break };
            self.remove(&victim);
            stats.record_eviction();
        }

        entry.set_touch(self.tick());
        self.memory_usage += incoming;
        self.entries.insert(key, entry);
    }

    /// True if inserting `incoming` additional bytes (and one entry) would
    /// break a configured bound. An empty table never reports pressure, so
    /// a single oversized value still gets stored.
    fn would_exceed_bounds(&self, incoming: u64) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        if let Some(max) = self.max_entries {
            if self.entries.len() + 1 > max {
                return true;
            }
        }
        if let Some(max) = self.max_memory {
            if self.memory_usage + incoming > max {
                return true;
            }
        }
        false
    }

    /// Least-recently-accessed key, by logical clock position.
    fn lru_key(&self) -> Option<String> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_touch())
            .map(|(key, _)| key.clone())
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.memory_usage = self.memory_usage.saturating_sub(entry.size_bytes());
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.memory_usage = 0;
        removed
    }

    // == Expired Sweep ==
    /// Removes every expired entry; the count is recorded as expired
    /// cleanups, never as evictions.
    pub fn clear_expired(&mut self, stats: &CacheStats) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }

        stats.record_expired(expired.len() as u64);
        expired.len()
    }

    // == Pressure Relief ==
    /// If usage sits above `high` of the byte bound, evicts least-used,
    /// longest-idle entries (`access_count` asc, then access order) until it
    /// drops to `low` of the bound. No-op when the cache is unbounded.
    pub fn relieve_pressure(&mut self, high: f64, low: f64, stats: &CacheStats) -> usize {
        let Some(max) = self.max_memory else { return 0 };

        let high_water = (max as f64 * high) as u64;
        let low_water = (max as f64 * low) as u64;
        if self.memory_usage <= high_water {
            return 0;
        }

        let mut order: Vec<(String, u64, u64)> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.access_count(), entry.last_touch()))
            .collect();
        order.sort_by_key(|(_, count, touch)| (*count, *touch));

        let mut removed = 0;
        for (key, _, _) in order {
            if self.memory_usage <= low_water {
                break;
            }
            self.remove(&key);
            stats.record_eviction();
            removed += 1;
        }
        removed
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn entry(value: &str, size: u64) -> CacheEntry<String> {
        CacheEntry::new(value.to_string(), 300, size)
    }

    #[test]
    fn test_insert_and_get() {
        let stats = CacheStats::new();
        let mut table = CacheTable::new(None, None);

        table.insert("k1".to_string(), entry("v1", 10), &stats);

        assert_eq!(table.len(), 1);
        assert_eq!(table.memory_usage(), 10);
        let tick = table.tick();
        assert_eq!(table.get("k1").unwrap().access(tick), "v1");
    }

    #[test]
    fn test_overwrite_releases_old_size() {
        let stats = CacheStats::new();
        let mut table = CacheTable::new(None, None);

        table.insert("k1".to_string(), entry("v1", 10), &stats);
        table.insert("k1".to_string(), entry("v2", 30), &stats);

        assert_eq!(table.len(), 1);
        assert_eq!(table.memory_usage(), 30);
        assert_eq!(stats.evictions(), 0);
    }

    #[test]
    fn test_entry_bound_evicts_lru() {
        let stats = CacheStats::new();
        let mut table = CacheTable::new(Some(3), None);

        table.insert("a".to_string(), entry("1", 1), &stats);
        table.insert("b".to_string(), entry("2", 1), &stats);
        table.insert("c".to_string(), entry("3", 1), &stats);
        table.insert("d".to_string(), entry("4", 1), &stats);

        assert_eq!(table.len(), 3);
        assert!(table.get("a").is_none());
        assert!(table.get("d").is_some());
        assert_eq!(stats.evictions(), 1);
    }

    #[test]
    fn test_access_refreshes_lru_position() {
        let stats = CacheStats::new();
        let mut table = CacheTable::new(Some(3), None);

        table.insert("a".to_string(), entry("1", 1), &stats);
        table.insert("b".to_string(), entry("2", 1), &stats);
        table.insert("c".to_string(), entry("3", 1), &stats);

        // touch "a" so "b" becomes the eviction candidate
        let tick = table.tick();
        table.get("a").unwrap().access(tick);

        table.insert("d".to_string(), entry("4", 1), &stats);

        assert!(table.get("a").is_some());
        assert!(table.get("b").is_none());
        assert!(table.get("c").is_some());
        assert!(table.get("d").is_some());
    }

    #[test]
    fn test_memory_bound_evicts_until_fit() {
        let stats = CacheStats::new();
        let mut table = CacheTable::new(None, Some(100));

        table.insert("a".to_string(), entry("1", 40), &stats);
        table.insert("b".to_string(), entry("2", 40), &stats);
        // 40 + 40 + 40 > 100: evicts "a", then fits
        table.insert("c".to_string(), entry("3", 40), &stats);

        assert_eq!(table.len(), 2);
        assert!(table.get("a").is_none());
        assert_eq!(table.memory_usage(), 80);
        assert_eq!(stats.evictions(), 1);
    }

    #[test]
    fn test_oversized_value_still_inserts() {
        let stats = CacheStats::new();
        let mut table = CacheTable::new(None, Some(100));

        table.insert("a".to_string(), entry("1", 40), &stats);
        table.insert("big".to_string(), entry("x", 500), &stats);

        // table was drained but the oversized entry went in
        assert_eq!(table.len(), 1);
        assert!(table.get("big").is_some());
        assert_eq!(table.memory_usage(), 500);
    }

    #[test]
    fn test_remove_adjusts_usage() {
        let stats = CacheStats::new();
        let mut table = CacheTable::new(None, None);

        table.insert("k1".to_string(), entry("v1", 25), &stats);
        assert!(table.remove("k1"));
        assert!(!table.remove("k1"));
        assert_eq!(table.memory_usage(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_clear_expired_counts_separately() {
        let stats = CacheStats::new();
        let mut table = CacheTable::new(None, None);

        table.insert(
            "short".to_string(),
            CacheEntry::new("v".to_string(), 1, 5),
            &stats,
        );
        table.insert(
            "long".to_string(),
            CacheEntry::new("v".to_string(), 300, 5),
            &stats,
        );

        sleep(Duration::from_millis(1100));

        let removed = table.clear_expired(&stats);
        assert_eq!(removed, 1);
        assert_eq!(table.len(), 1);
        assert_eq!(stats.expired_cleanups(), 1);
        assert_eq!(stats.evictions(), 0);

        // nothing left to sweep
        assert_eq!(table.clear_expired(&stats), 0);
    }

    #[test]
    fn test_relieve_pressure_prefers_least_used() {
        let stats = CacheStats::new();
        let mut table = CacheTable::new(None, Some(100));

        table.insert("cold1".to_string(), entry("v", 30), &stats);
        table.insert("cold2".to_string(), entry("v", 30), &stats);
        table.insert("hot".to_string(), entry("v", 30), &stats);

        let tick = table.tick();
        table.get("hot").unwrap().access(tick);

        // 90 > 80% of 100; drain to <= 60
        let removed = table.relieve_pressure(0.8, 0.6, &stats);

        assert_eq!(removed, 1);
        assert!(table.get("cold1").is_none());
        assert!(table.get("hot").is_some());
        assert!(table.memory_usage() <= 60);
    }

    #[test]
    fn test_relieve_pressure_unbounded_is_noop() {
        let stats = CacheStats::new();
        let mut table = CacheTable::new(None, None);

        table.insert("a".to_string(), entry("v", 1_000_000), &stats);
        assert_eq!(table.relieve_pressure(0.8, 0.6, &stats), 0);
        assert_eq!(table.len(), 1);
    }
}
