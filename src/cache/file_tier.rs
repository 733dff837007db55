//! File Tier Module
//!
//! Optional on-disk mirror of the memory table: one JSON record per derived
//! key under the cache directory. A file's existence never implies liveness;
//! every load re-checks the TTL exactly like the memory tier does.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Suffix for cache record files.
const FILE_SUFFIX: &str = "cache";

// == Disk Records ==
/// Borrowing view serialized on store, so the payload is encoded without
/// cloning it out of the entry under construction.
#[derive(Debug, Serialize)]
pub struct DiskRecordRef<'a, T> {
    pub value: &'a T,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    pub size_bytes: u64,
    pub access_count: u64,
}

/// Owned record read back on load.
#[derive(Debug, Deserialize)]
pub struct DiskRecord<T> {
    pub value: T,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub access_count: u64,
}

impl<T> DiskRecord<T> {
    /// Same liveness rule as the memory tier.
    pub fn is_expired(&self) -> bool {
        (Utc::now() - self.created_at).num_milliseconds()
            > (self.ttl_seconds as i64).saturating_mul(1000)
    }
}

/// Metadata-only view for expiry sweeps; skips decoding the payload.
#[derive(Debug, Deserialize)]
struct DiskHeader {
    created_at: DateTime<Utc>,
    ttl_seconds: u64,
}

impl DiskHeader {
    fn is_expired(&self) -> bool {
        (Utc::now() - self.created_at).num_milliseconds()
            > (self.ttl_seconds as i64).saturating_mul(1000)
    }
}

// == File Tier ==
/// Handle to the cache directory. Cheap to clone; all I/O goes through
/// `tokio::fs` so disk latency never sits inside the table lock.
#[derive(Debug, Clone)]
pub struct FileTier {
    dir: PathBuf,
}

impl FileTier {
    // == Constructor ==
    /// Opens the tier, creating the directory if needed.
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, cache_key: &str) -> PathBuf {
        self.dir.join(format!("{cache_key}.{FILE_SUFFIX}"))
    }

    fn is_record_file(path: &Path) -> bool {
        path.extension().map(|ext| ext == FILE_SUFFIX).unwrap_or(false)
    }

    // == Write ==
    /// Persists pre-encoded record bytes. Writes to a temp name then renames,
    /// so the reaper never observes a torn record.
    pub async fn write(&self, cache_key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(cache_key);
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    // == Read ==
    /// Loads the record for a key. `Ok(None)` means no file; corruption and
    /// I/O failures surface as `Err` for the caller to log and swallow.
    pub async fn read<T: DeserializeOwned>(&self, cache_key: &str) -> Result<Option<DiskRecord<T>>> {
        let path = self.path_for(cache_key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    // == Remove ==
    /// Deletes a key's record; `Ok(false)` when no file existed.
    pub async fn remove(&self, cache_key: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.path_for(cache_key)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    // == Clear ==
    /// Deletes every record file, returning the count removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if Self::is_record_file(&path) {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    // == Purge Expired ==
    /// Deletes every record whose TTL has elapsed. Unreadable or corrupt
    /// records are deleted too; they can never be served again anyway.
    pub async fn purge_expired(&self) -> Result<usize> {
        let mut removed = 0;
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if !Self::is_record_file(&path) {
                continue;
            }
            let dead = match tokio::fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<DiskHeader>(&bytes) {
                    Ok(header) => header.is_expired(),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "unreadable cache record, removing");
                        true
                    }
                },
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to read cache record, removing");
                    true
                }
            };
            if dead && tokio::fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    // == Size ==
    /// Total bytes held by record files.
    pub async fn total_size_bytes(&self) -> Result<u64> {
        let mut total = 0;
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            if Self::is_record_file(&item.path()) {
                total += item.metadata().await?.len();
            }
        }
        Ok(total)
    }
}
