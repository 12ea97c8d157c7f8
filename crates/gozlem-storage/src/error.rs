use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Network, timeout, throttling, or server-side failure. Safe to retry.
    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("store rejected the request: {0}")]
    Rejected(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        StoreError::NotFound { key: key.into() }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("queue file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("queue file version {found} is newer than this build supports ({supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("queue lock poisoned")]
    Poisoned,
}
