//! Cache Module
//!
//! Multi-tier (memory + disk) result caching with TTL expiration and LRU
//! eviction.

mod entry;
mod file_tier;
mod key;
mod manager;
mod stats;
mod table;


// Re-export public types
pub use entry::CacheEntry;
pub use key::{derive_key, derive_simple_key};
pub use manager::{AnalysisCache, EntryInfo, OptimizeReport};
pub use stats::{CacheStats, StatsSnapshot};

// == Public Constants ==
/// Memory-usage fraction above which `optimize` starts pressure eviction
pub const HIGH_WATER_MARK: f64 = 0.8;

/// Memory-usage fraction pressure eviction drains down to
pub const LOW_WATER_MARK: f64 = 0.6;
