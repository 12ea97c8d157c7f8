//! Background assessment computation.

use std::sync::Arc;

use gozlem_core::models::observation::Observation;
use gozlem_heuristic::RiskHeuristic;
use gozlem_storage::store::AssessmentStore;
use tokio::task::JoinHandle;

use crate::events::{ChangeEvent, ChangeFeed};

/// Everything a detached assessment task needs, cloned out of the service.
#[derive(Clone)]
pub struct AssessmentJob {
    pub store: Arc<dyn AssessmentStore>,
    pub heuristic: RiskHeuristic,
    pub feed: ChangeFeed,
    pub now: jiff::Timestamp,
}

impl AssessmentJob {
    /// Evaluate `observation` and upsert the result on a detached task.
    ///
    /// Callers may drop the handle. Upsert failures are logged and
    /// published as [`ChangeEvent::AssessmentFailed`].
    pub fn spawn(self, observation: Observation) -> JoinHandle<()> {
        tokio::spawn(async move {
            let eval = self
                .heuristic
                .evaluate(&observation.note, &observation.domains);
            let assessment = eval.into_assessment(observation.id, self.now);
            let risk = assessment.risk;

            match self.store.upsert(assessment).await {
                Ok(_) => {
                    tracing::debug!(
                        observation_id = %observation.id,
                        risk = %risk,
                        "assessment stored"
                    );
                    self.feed.publish(ChangeEvent::AssessmentUpdated {
                        observation_id: observation.id,
                        risk,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        observation_id = %observation.id,
                        error = %e,
                        "failed to store assessment"
                    );
                    self.feed.publish(ChangeEvent::AssessmentFailed {
                        observation_id: observation.id,
                        error: e.to_string(),
                    });
                }
            }
        })
    }
}
