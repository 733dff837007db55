//! Configuration Module
//!
//! Cache configuration with environment-variable loading and hard defaults.
//! Invalid values are silently corrected to the defaults rather than raised:
//! the cache is an optimization layer and must never refuse to start.

use std::env;
use std::path::PathBuf;

/// Default TTL applied when a store gives none (seconds).
pub const DEFAULT_TTL_SECONDS: u64 = 300;

/// Default interval between reaper sweeps (seconds).
pub const DEFAULT_REAPER_INTERVAL_SECONDS: u64 = 600;

/// Cache configuration parameters.
///
/// Bounds are `Option`s; `None` means unbounded, which is the default.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Upper bound on the memory tier's estimated byte usage
    pub max_memory_bytes: Option<u64>,
    /// Upper bound on the number of memory-tier entries
    pub max_entries: Option<usize>,
    /// Directory holding the on-disk tier
    pub cache_dir: PathBuf,
    /// Whether the on-disk mirror is maintained at all
    pub enable_file_tier: bool,
    /// TTL in seconds for entries stored without an explicit TTL
    pub default_ttl: u64,
    /// Seconds between background expiration sweeps
    pub reaper_interval: u64,
}

impl CacheConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_MEMORY_BYTES` - memory bound in bytes (default: unbounded)
    /// - `CACHE_MAX_ENTRIES` - entry-count bound (default: unbounded)
    /// - `CACHE_DIR` - cache directory (default: `cache/` beside the executable)
    /// - `CACHE_FILE_TIER` - enable the disk tier (default: true)
    /// - `CACHE_DEFAULT_TTL` - default TTL in seconds (default: 300)
    /// - `CACHE_REAPER_INTERVAL` - sweep interval in seconds (default: 600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_memory_bytes: env::var("CACHE_MAX_MEMORY_BYTES")
                .ok()
                .and_then(|v| v.parse().ok()),
            max_entries: env::var("CACHE_MAX_ENTRIES").ok().and_then(|v| v.parse().ok()),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            enable_file_tier: env::var("CACHE_FILE_TIER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TTL_SECONDS),
            reaper_interval: env::var("CACHE_REAPER_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_REAPER_INTERVAL_SECONDS),
        }
        .normalized()
    }

    /// Corrects invalid settings to the defaults: a zero TTL or interval
    /// would make every entry dead on arrival, and a zero bound is read as
    /// "no bound" rather than "nothing fits".
    pub fn normalized(mut self) -> Self {
        if self.default_ttl == 0 {
            self.default_ttl = DEFAULT_TTL_SECONDS;
        }
        if self.reaper_interval == 0 {
            self.reaper_interval = DEFAULT_REAPER_INTERVAL_SECONDS;
        }
        if self.max_entries == Some(0) {
            self.max_entries = None;
        }
        if self.max_memory_bytes == Some(0) {
            self.max_memory_bytes = None;
        }
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: None,
            max_entries: None,
            cache_dir: default_cache_dir(),
            enable_file_tier: true,
            default_ttl: DEFAULT_TTL_SECONDS,
            reaper_interval: DEFAULT_REAPER_INTERVAL_SECONDS,
        }
    }
}

/// `cache/` next to the running executable, falling back to a relative
/// `cache/` when the executable path is unavailable.
fn default_cache_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("cache")))
        .unwrap_or_else(|| PathBuf::from("cache"))
}
