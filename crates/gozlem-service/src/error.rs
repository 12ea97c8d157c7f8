use gozlem_core::error::ValidationError;
use gozlem_storage::error::{QueueError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("offline queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("device is offline")]
    Offline,
}

impl ServiceError {
    /// Whether the caller may retry the same operation later.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ServiceError::Offline => true,
            ServiceError::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}
