//! Error types for the store layer.

use std::path::PathBuf;

/// Errors that can occur while reading or persisting a store.
///
/// Memory stores never fail; every variant here comes from the on-disk
/// backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading, writing, or renaming the backing file failed.
    #[error("store i/o failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The in-memory state could not be serialized.
    #[error("store encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The backing file exists but does not hold a valid store document.
    #[error("store document {path} is corrupt: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The configured path cannot hold a store (no parent or file name).
    #[error("invalid store path: {0}")]
    InvalidPath(PathBuf),
}
