//! gozlem-service
//!
//! Observation capture orchestration: the online/offline submit decision,
//! background assessment, offline queue draining, and report assembly.

pub mod assess;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod events;
pub mod media;
pub mod service;
pub mod sync;

pub use service::{Collaborators, ObservationService};
pub use sync::{DrainReport, SyncCoordinator, spawn_auto_sync};
