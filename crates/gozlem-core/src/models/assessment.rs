use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::models::domain::{Domain, RiskLevel};

/// Per-domain score in `0..=4`. Sparse: only scored domains are present.
pub type DomainScores = BTreeMap<Domain, u8>;

pub const MAX_DOMAIN_SCORE: u8 = 4;

/// Derived risk record, at most one per observation.
///
/// Recomputing replaces the previous record (keyed by `observation_id`);
/// assessments are not historized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Assessment {
    pub observation_id: Uuid,
    pub risk: RiskLevel,
    #[serde(default)]
    pub domain_scores: DomainScores,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub summary: String,
    pub created_at: jiff::Timestamp,
}

impl Assessment {
    /// Mean of the stored domain scores, `None` when nothing was scored.
    pub fn average_score(&self) -> Option<f64> {
        average(&self.domain_scores)
    }
}

pub fn average(scores: &DomainScores) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let total: u32 = scores.values().map(|v| u32::from(*v)).sum();
    Some(f64::from(total) / scores.len() as f64)
}
