use gozlem_core::models::domain::RiskLevel;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::sync::DrainReport;

/// Data-changed notifications for views that need to re-fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    ObservationSaved {
        observation_id: Uuid,
        child_id: Uuid,
        pending_sync: bool,
        /// Client id of the queue entry this record replaced, after a drain.
        replaces: Option<Uuid>,
    },
    ObservationUpdated {
        observation_id: Uuid,
        child_id: Uuid,
    },
    ObservationDeleted {
        observation_id: Uuid,
    },
    AssessmentUpdated {
        observation_id: Uuid,
        risk: RiskLevel,
    },
    AssessmentFailed {
        observation_id: Uuid,
        error: String,
    },
    SyncCompleted {
        report: DrainReport,
    },
}

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to current subscribers. Having none is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("change event dropped, no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}
