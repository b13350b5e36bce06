//! Error types for the offline cache
//!
//! Provides unified error handling using thiserror.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cache::Collection;

// == Cache Error Enum ==
/// Unified error type for the offline cache.
///
/// A cache miss (absent, expired or malformed entry) is never an error; it is
/// reported as `None` by the read operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The store root could not be opened or prepared
    #[error("storage unavailable at {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The store rejected a write or delete
    #[error("write to {collection}/{key} failed: {source}")]
    WriteFailed {
        collection: Collection,
        key: String,
        #[source]
        source: io::Error,
    },

    /// The store could not complete a read
    #[error("read from {collection} failed: {source}")]
    ReadFailed {
        collection: Collection,
        #[source]
        source: io::Error,
    },

    /// The payload could not be encoded into a stored record
    #[error("failed to serialize {collection}/{key}: {source}")]
    Serialization {
        collection: Collection,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored record failed to decode
    #[error("malformed entry {key} in {collection}: {reason}")]
    MalformedEntry {
        collection: Collection,
        key: String,
        reason: String,
    },
}

impl CacheError {
    /// True for errors the read path folds into a miss.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::MalformedEntry { .. })
    }
}

// == Result Type Alias ==
/// Convenience Result type for the offline cache.
pub type Result<T> = std::result::Result<T, CacheError>;
