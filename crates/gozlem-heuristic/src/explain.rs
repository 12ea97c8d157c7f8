use gozlem_core::models::assessment::{Assessment, DomainScores};
use gozlem_core::models::domain::{Domain, Locale, RiskLevel};
use serde::Serialize;
use ts_rs::TS;

use crate::markers::{self, MarkerHits};
use crate::{fold, summary};

/// Scores below this count as a low domain.
pub const LOW_DOMAIN_BELOW: f64 = 2.2;
/// Scores below this (and not low) count as a domain to monitor.
pub const MID_DOMAIN_BELOW: f64 = 2.7;

/// Why an assessment carries its risk label.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct RiskExplanation {
    pub risk: RiskLevel,
    pub severe_markers: Vec<String>,
    pub warn_markers: Vec<String>,
    pub positive_markers: Vec<String>,
    pub low_domains: Vec<Domain>,
    pub mid_domains: Vec<Domain>,
    pub headline: String,
    pub reasons: Vec<String>,
}

/// Build an explanation for `assessment` given the note it was derived from.
/// The risk is normalised with [`crate::reassess`] first.
pub fn explain(note: &str, assessment: &Assessment, locale: Locale) -> RiskExplanation {
    let hits = markers::scan(&fold::fold(note));
    let risk = normalised_risk(&hits, assessment);
    let (low_domains, mid_domains) = split_weak_domains(&assessment.domain_scores);

    let mut reasons = Vec::new();
    if !hits.severe.is_empty() {
        reasons.push(line(locale, ReasonKind::Severe, &hits.severe.join(", ")));
    }
    if !hits.warn.is_empty() {
        reasons.push(line(locale, ReasonKind::Warn, &hits.warn.join(", ")));
    }
    if !hits.positive.is_empty() {
        reasons.push(line(locale, ReasonKind::Positive, &hits.positive.join(", ")));
    }
    if !low_domains.is_empty() {
        reasons.push(line(
            locale,
            ReasonKind::LowDomains,
            &summary::join_labels(&low_domains, locale),
        ));
    }
    if !mid_domains.is_empty() {
        reasons.push(line(
            locale,
            ReasonKind::MidDomains,
            &summary::join_labels(&mid_domains, locale),
        ));
    }
    if reasons.is_empty() {
        reasons.push(match locale {
            Locale::Tr => "Belirgin bir risk işareti bulunamadı.".to_string(),
            Locale::En => "No notable risk signal was found.".to_string(),
        });
    }

    let headline = match locale {
        Locale::Tr => format!("Risk düzeyi: {}", risk.label(locale)),
        Locale::En => format!("Risk level: {}", risk.label(locale)),
    };

    RiskExplanation {
        risk,
        severe_markers: to_owned(&hits.severe),
        warn_markers: to_owned(&hits.warn),
        positive_markers: to_owned(&hits.positive),
        low_domains,
        mid_domains,
        headline,
        reasons,
    }
}

pub(crate) fn normalised_risk(hits: &MarkerHits, assessment: &Assessment) -> RiskLevel {
    hits.verdict()
        .or_else(|| assessment.average_score().map(markers::risk_from_average))
        .unwrap_or(assessment.risk)
}

fn split_weak_domains(scores: &DomainScores) -> (Vec<Domain>, Vec<Domain>) {
    let mut low = Vec::new();
    let mut mid = Vec::new();
    for (domain, score) in scores {
        let score = f64::from(*score);
        if score < LOW_DOMAIN_BELOW {
            low.push(*domain);
        } else if score < MID_DOMAIN_BELOW {
            mid.push(*domain);
        }
    }
    (low, mid)
}

enum ReasonKind {
    Severe,
    Warn,
    Positive,
    LowDomains,
    MidDomains,
}

fn line(locale: Locale, kind: ReasonKind, detail: &str) -> String {
    let prefix = match (locale, kind) {
        (Locale::Tr, ReasonKind::Severe) => "Ciddi davranış işaretleri",
        (Locale::Tr, ReasonKind::Warn) => "Destek ihtiyacı işaretleri",
        (Locale::Tr, ReasonKind::Positive) => "Olumlu işaretler",
        (Locale::Tr, ReasonKind::LowDomains) => "Düşük puanlı alanlar",
        (Locale::Tr, ReasonKind::MidDomains) => "İzlenmesi gereken alanlar",
        (Locale::En, ReasonKind::Severe) => "Severe behaviour markers",
        (Locale::En, ReasonKind::Warn) => "Support-need markers",
        (Locale::En, ReasonKind::Positive) => "Positive markers",
        (Locale::En, ReasonKind::LowDomains) => "Low-scoring domains",
        (Locale::En, ReasonKind::MidDomains) => "Domains to monitor",
    };
    format!("{prefix}: {detail}")
}

fn to_owned(list: &[&'static str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
