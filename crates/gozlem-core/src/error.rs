use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown domain tag: {0}")]
    UnknownDomain(String),

    #[error("unknown observation context: {0}")]
    UnknownContext(String),

    #[error("unknown locale: {0}")]
    UnknownLocale(String),

    #[error("unknown risk level: {0}")]
    UnknownRisk(String),
}

/// Local validation failures. These never reach a store or the offline queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("observation note must not be empty")]
    EmptyNote,

    #[error("at least one development domain is required")]
    NoDomains,

    #[error("patch does not change anything")]
    EmptyPatch,

    #[error("observation not found: {0}")]
    NotFound(Uuid),

    #[error("observation {0} was deleted")]
    Deleted(Uuid),

    #[error("observation {0} is still waiting to sync and cannot be edited")]
    PendingSync(Uuid),
}
