//! Error types for the cache
//!
//! Only the file tier produces errors, and every one of them is handled
//! internally as "log and continue": a failed disk operation degrades the
//! affected key to memory-only behavior, it never reaches a caller of the
//! public cache operations. Not-found is not an error; fetch returns `None`.

use thiserror::Error;

// == Cache Error Enum ==
/// File-tier failure modes.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Disk I/O failed (permissions, missing directory, disk full)
    #[error("file tier i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// A payload or record could not be encoded or decoded
    #[error("cache record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for file-tier internals.
pub type Result<T> = std::result::Result<T, CacheError>;
