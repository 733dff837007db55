//! Analysis Cache - a multi-tier in-process result cache
//!
//! Memoizes expensive computed results with per-entry TTL expiration, LRU
//! eviction over a bounded memory tier, an optional on-disk mirror and a
//! background expiration reaper. Safe for concurrent use across tokio tasks.
//!
//! Producers store and fetch opaque payloads by logical key and never see
//! tiering, eviction or expiration:
//!
//! ```no_run
//! use analysis_cache::{AnalysisCache, CacheConfig};
//!
//! # async fn demo() {
//! let cache: AnalysisCache<f64> = AnalysisCache::new(CacheConfig::default());
//! cache.store("stock:000001:rtsi", 72.5, Some(300)).await;
//! let score = cache.fetch("stock:000001:rtsi").await;
//! # let _ = score;
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{
    derive_key, derive_simple_key, AnalysisCache, CacheEntry, CacheStats, EntryInfo,
    OptimizeReport, StatsSnapshot,
};
pub use config::CacheConfig;
pub use error::CacheError;
pub use tasks::{spawn_reaper, ReaperHandle};

use std::sync::OnceLock;

static SHARED: OnceLock<AnalysisCache<serde_json::Value>> = OnceLock::new();

/// Process-wide cache over JSON payloads, configured from the environment on
/// first use. Prefer constructing an explicit [`AnalysisCache`] and passing
/// it to producers; this accessor exists for the outermost composition
/// boundary where threading an instance through is not practical.
pub fn shared_cache() -> &'static AnalysisCache<serde_json::Value> {
    SHARED.get_or_init(|| AnalysisCache::new(CacheConfig::from_env()))
}
