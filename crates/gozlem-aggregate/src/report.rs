use std::collections::{BTreeMap, HashMap};

use gozlem_core::models::domain::{Domain, Locale, RiskLevel};
use gozlem_core::models::record::ObservationRecord;
use gozlem_heuristic::RiskHeuristic;
use gozlem_heuristic::summary::{insufficient_data, join_labels, risk_phrase};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::distribution::{RiskDistribution, overall_child_risk};
use crate::domains::{domain_frequency, top_domains};

pub const CHILD_SUGGESTION_LIMIT: usize = 8;
pub const CLASS_SUGGESTION_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct ChildOverview {
    pub observation_count: usize,
    pub overall_risk: RiskLevel,
    pub distribution: RiskDistribution,
    pub top_domains: Vec<Domain>,
    pub suggestions: Vec<String>,
    pub last_observation_at: Option<jiff::Timestamp>,
    pub summary: String,
}

/// Summarise one child's records.
///
/// Stored risk labels are normalised through [`RiskHeuristic::reassess`]
/// before counting, so older assessments scored under earlier marker lists
/// agree with fresh ones.
pub fn child_overview(records: &[ObservationRecord], heuristic: &RiskHeuristic) -> ChildOverview {
    let locale = heuristic.locale();
    let levels: Vec<RiskLevel> = records
        .iter()
        .filter_map(|r| {
            r.assessment
                .as_ref()
                .map(|a| heuristic.reassess(&r.observation.note, a))
        })
        .collect();

    let distribution = RiskDistribution::from_levels(levels.iter().copied());
    let top: Vec<Domain> = top_domains(&domain_frequency(records), 2)
        .into_iter()
        .map(|(d, _)| d)
        .collect();

    let mut suggestions: Vec<String> = Vec::new();
    for s in records
        .iter()
        .filter_map(|r| r.assessment.as_ref())
        .flat_map(|a| a.suggestions.iter())
    {
        if suggestions.len() == CHILD_SUGGESTION_LIMIT {
            break;
        }
        if !suggestions.contains(s) {
            suggestions.push(s.clone());
        }
    }

    let summary = if records.is_empty() {
        insufficient_data(locale).to_string()
    } else {
        overview_summary(records.len(), &top, &distribution, locale)
    };

    ChildOverview {
        observation_count: records.len(),
        overall_risk: overall_child_risk(levels),
        distribution,
        top_domains: top,
        suggestions,
        last_observation_at: records.iter().map(|r| r.observation.created_at).max(),
        summary,
    }
}

fn overview_summary(
    count: usize,
    top: &[Domain],
    distribution: &RiskDistribution,
    locale: Locale,
) -> String {
    let process = if distribution.high > 0 {
        RiskLevel::High
    } else if distribution.medium > 0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    let phrase = capitalize(risk_phrase(process, locale));
    let domains = join_labels(top, locale);

    match locale {
        Locale::Tr => format!(
            "GENEL DURUM: Son {count} gözlem ağırlıklı olarak {domains} alanlarına odaklanıyor. \
             SÜREÇ ANALİZİ: {phrase}."
        ),
        Locale::En => format!(
            "OVERALL: The last {count} observations focus mainly on {domains}. \
             PROCESS: {phrase}."
        ),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Scope of a class digest. Empty lists match everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DigestFilter {
    pub days: i64,
    pub child_ids: Vec<Uuid>,
    pub domains: Vec<Domain>,
    pub risks: Vec<RiskLevel>,
    pub max_observations: usize,
}

impl Default for DigestFilter {
    fn default() -> Self {
        Self {
            days: 30,
            child_ids: Vec::new(),
            domains: Vec::new(),
            risks: Vec::new(),
            max_observations: 40,
        }
    }
}

impl DigestFilter {
    pub fn since(&self, now: jiff::Timestamp) -> jiff::Timestamp {
        jiff::Timestamp::from_second(now.as_second() - self.days.max(0) * 86_400)
            .unwrap_or(jiff::Timestamp::MIN)
    }

    fn matches(&self, record: &ObservationRecord, since: jiff::Timestamp) -> bool {
        let o = &record.observation;
        o.created_at >= since
            && (self.child_ids.is_empty() || self.child_ids.contains(&o.child_id))
            && (self.domains.is_empty() || o.domains.iter().any(|d| self.domains.contains(d)))
            && (self.risks.is_empty() || record.risk().is_some_and(|r| self.risks.contains(&r)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct ClassDigest {
    pub observation_count: usize,
    pub distribution: RiskDistribution,
    pub domain_counts: BTreeMap<Domain, usize>,
    pub suggestions: Vec<String>,
}

/// Class-level digest of the newest matching records.
///
/// Suggestions are ranked by how many assessments repeat them; ties keep
/// the order they were first seen in.
pub fn class_digest(
    records: &[ObservationRecord],
    filter: &DigestFilter,
    now: jiff::Timestamp,
) -> ClassDigest {
    let since = filter.since(now);
    let mut selected: Vec<&ObservationRecord> =
        records.iter().filter(|r| filter.matches(r, since)).collect();
    selected.sort_by(|a, b| b.observation.created_at.cmp(&a.observation.created_at));
    selected.truncate(filter.max_observations);

    let owned: Vec<ObservationRecord> = selected.into_iter().cloned().collect();

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for s in owned
        .iter()
        .filter_map(|r| r.assessment.as_ref())
        .flat_map(|a| a.suggestions.iter())
    {
        let n = counts.entry(s.as_str()).or_insert(0);
        if *n == 0 {
            order.push(s.as_str());
        }
        *n += 1;
    }
    // Stable sort keeps first-seen order among equal counts.
    order.sort_by_key(|s| std::cmp::Reverse(counts.get(s).copied().unwrap_or(0)));
    let suggestions = order
        .into_iter()
        .take(CLASS_SUGGESTION_LIMIT)
        .map(str::to_string)
        .collect();

    ClassDigest {
        observation_count: owned.len(),
        distribution: crate::distribution::risk_distribution(&owned),
        domain_counts: domain_frequency(&owned),
        suggestions,
    }
}
