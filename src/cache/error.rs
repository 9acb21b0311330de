//! Error types for the cache and its host stores

use thiserror::Error;

/// Failures reported by a host key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write would take the store past its capacity
    #[error("storage quota exceeded: needed {needed} bytes, {available} available")]
    QuotaExceeded { needed: u64, available: u64 },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to persist record: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl StoreError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

/// Errors surfaced by cache writes and provider selection
///
/// Reads never return these; they degrade to a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to serialize cache payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The write still did not fit after the stale sweep and retry
    #[error("storage quota exhausted writing '{key}' after stale sweep")]
    QuotaExhausted { key: String },

    #[error("Unknown cache provider: '{0}'. Valid providers: durable, memory")]
    UnknownProvider(String),

    #[error("no cache directory available on this host")]
    NoCacheDir,
}
