use gozlem_core::models::domain::RiskLevel;
use gozlem_core::models::record::ObservationRecord;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RiskDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl RiskDistribution {
    pub fn from_levels(levels: impl IntoIterator<Item = RiskLevel>) -> Self {
        let mut dist = Self::default();
        for level in levels {
            dist.add(level);
        }
        dist
    }

    pub fn add(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
        }
    }

    pub fn count(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }

    /// Majority label with the compatibility tie-break: medium when it is
    /// at least both others, else low when it is at least both others,
    /// else high. No labels at all is low.
    pub fn majority(&self) -> RiskLevel {
        let Self { low, medium, high } = *self;
        if self.total() == 0 {
            RiskLevel::Low
        } else if medium >= low && medium >= high {
            RiskLevel::Medium
        } else if low >= medium && low >= high {
            RiskLevel::Low
        } else {
            RiskLevel::High
        }
    }
}

/// Counts of assessed records per risk level. Unassessed records are skipped.
pub fn risk_distribution(records: &[ObservationRecord]) -> RiskDistribution {
    RiskDistribution::from_levels(records.iter().filter_map(ObservationRecord::risk))
}

pub fn overall_child_risk(levels: impl IntoIterator<Item = RiskLevel>) -> RiskLevel {
    RiskDistribution::from_levels(levels).majority()
}
