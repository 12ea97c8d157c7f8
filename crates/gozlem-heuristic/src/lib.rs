//! gozlem-heuristic
//!
//! Lexical risk heuristic for free-text observations. Pure and
//! deterministic: no I/O, no randomness, never fails.

pub mod explain;
pub mod fold;
pub mod markers;
pub mod suggestions;
pub mod summary;
pub mod vocabulary;

use gozlem_core::models::assessment::{Assessment, DomainScores, MAX_DOMAIN_SCORE, average};
use gozlem_core::models::domain::{Domain, Locale, RiskLevel};
use serde::Serialize;

pub use explain::{RiskExplanation, explain};

/// Score of a tagged domain with no correlated evidence.
pub const BASELINE_SCORE: u8 = 3;
const LOWERED_SCORE: u8 = 2;

/// The assessment-shaped result of a heuristic run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub risk: RiskLevel,
    pub domain_scores: DomainScores,
    pub suggestions: Vec<String>,
    pub summary: String,
}

impl Evaluation {
    pub fn into_assessment(self, observation_id: uuid::Uuid, now: jiff::Timestamp) -> Assessment {
        Assessment {
            observation_id,
            risk: self.risk,
            domain_scores: self.domain_scores,
            suggestions: self.suggestions,
            summary: self.summary,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskHeuristic {
    locale: Locale,
}

impl RiskHeuristic {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Evaluate a fresh note. Markers only; no prior scores.
    pub fn evaluate(&self, note: &str, domains: &[Domain]) -> Evaluation {
        self.evaluate_with_prior(note, domains, None)
    }

    /// Evaluate with previously stored domain scores. When the markers do
    /// not decide the risk, the average of `prior` does.
    pub fn evaluate_with_prior(
        &self,
        note: &str,
        domains: &[Domain],
        prior: Option<&DomainScores>,
    ) -> Evaluation {
        let domains = dedup(domains);
        let folded = fold::fold(note);

        if folded.trim().is_empty() {
            return Evaluation {
                risk: RiskLevel::Low,
                domain_scores: baseline(&domains),
                suggestions: Vec::new(),
                summary: summary::insufficient_data(self.locale).to_string(),
            };
        }

        let hits = markers::scan(&folded);
        let risk = hits
            .verdict()
            .or_else(|| prior.and_then(average).map(markers::risk_from_average))
            .unwrap_or(RiskLevel::Low);

        let domain_scores = score_domains(&folded, &domains, &hits);
        let suggestions = suggestions::pick(&domain_scores, &domains, self.locale);
        let focus = summary::most_represented(&domain_scores, &domains, 2);
        let summary = summary::observation_summary(&focus, risk, self.locale);

        Evaluation {
            risk,
            domain_scores,
            suggestions,
            summary,
        }
    }

    /// Normalise a stored assessment's risk label: markers in `note` first,
    /// then the average of its domain scores, then the stored label.
    pub fn reassess(&self, note: &str, assessment: &Assessment) -> RiskLevel {
        let hits = markers::scan(&fold::fold(note));
        explain::normalised_risk(&hits, assessment)
    }

    pub fn explain(&self, note: &str, assessment: &Assessment) -> RiskExplanation {
        explain::explain(note, assessment, self.locale)
    }
}

fn baseline(domains: &[Domain]) -> DomainScores {
    domains.iter().map(|d| (*d, BASELINE_SCORE)).collect()
}

fn score_domains(folded: &str, domains: &[Domain], hits: &markers::MarkerHits) -> DomainScores {
    let adjusted = match (hits.has_positive(), hits.has_negative()) {
        (true, false) => MAX_DOMAIN_SCORE,
        (false, true) => LOWERED_SCORE,
        _ => return baseline(domains),
    };

    let mentioned: Vec<Domain> = domains
        .iter()
        .copied()
        .filter(|d| vocabulary::mentions(folded, *d))
        .collect();
    let targets: &[Domain] = if mentioned.is_empty() { domains } else { &mentioned };

    domains
        .iter()
        .map(|d| {
            let score = if targets.contains(d) { adjusted } else { BASELINE_SCORE };
            (*d, score)
        })
        .collect()
}

fn dedup(domains: &[Domain]) -> Vec<Domain> {
    let mut out = Vec::with_capacity(domains.len());
    for d in domains {
        if !out.contains(d) {
            out.push(*d);
        }
    }
    out
}
