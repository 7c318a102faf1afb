//! Error types shared by the storage-backed repositories.
//!
//! ERROR HANDLING
//! ==============
//! Storage failures are returned to the caller unchanged. Repositories never
//! retry or evict on their own; the auto-save controller treats failures as
//! transient and retries on its next tick. `NotFound` is not an error here:
//! lookups return `Option`.

/// Stable machine-readable code for an error, surfaced to the UI layer.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The store rejected a write because its capacity is exhausted.
    #[error("storage quota exceeded: write needs {needed} bytes, {available} available")]
    QuotaExceeded { needed: u64, available: u64 },
    /// A stored value could not be parsed as the expected structure.
    #[error("malformed record under `{key}`: {source}")]
    MalformedRecord {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// A value could not be encoded for storage.
    #[error("failed to encode `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "E_QUOTA_EXCEEDED",
            Self::MalformedRecord { .. } => "E_MALFORMED_RECORD",
            Self::Encode { .. } => "E_ENCODE",
            Self::InvalidKey(_) => "E_INVALID_KEY",
            Self::Io(_) => "E_IO",
        }
    }
}

impl StorageError {
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
