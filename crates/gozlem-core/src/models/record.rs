use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::assessment::Assessment;
use crate::models::domain::RiskLevel;
use crate::models::observation::Observation;

/// An observation joined with its current assessment, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ObservationRecord {
    pub observation: Observation,
    pub assessment: Option<Assessment>,
}

impl ObservationRecord {
    pub fn pending(observation: Observation) -> Self {
        Self {
            observation,
            assessment: None,
        }
    }

    pub fn risk(&self) -> Option<RiskLevel> {
        self.assessment.as_ref().map(|a| a.risk)
    }
}
