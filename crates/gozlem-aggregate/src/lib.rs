//! gozlem-aggregate
//!
//! Per-child and per-class statistics over observation records. Every
//! function is pure: the caller supplies the records and the reference
//! "now", and empty input yields zero-valued results.

pub mod activity;
pub mod distribution;
pub mod domains;
pub mod report;

pub use activity::{DayActivity, activity_by_day, weekly_trend};
pub use distribution::{RiskDistribution, overall_child_risk, risk_distribution};
pub use domains::{domain_frequency, top_domains};
pub use report::{ChildOverview, ClassDigest, DigestFilter, child_overview, class_digest};
