use gozlem_core::models::assessment::DomainScores;
use gozlem_core::models::domain::{Domain, Locale, RiskLevel};

/// Risk-calibrated closing phrase.
pub fn risk_phrase(risk: RiskLevel, locale: Locale) -> &'static str {
    match (locale, risk) {
        (Locale::Tr, RiskLevel::Low) => "beceri edinimi beklenen seyrinde ilerliyor",
        (Locale::Tr, RiskLevel::Medium) => "gelişim sürecinde izlenmesi gereken alanlar var",
        (Locale::Tr, RiskLevel::High) => {
            "belirli beceri alanlarında ek destek ihtiyacı sinyalleri mevcut"
        }
        (Locale::En, RiskLevel::Low) => "progressing as expected",
        (Locale::En, RiskLevel::Medium) => "there are areas to monitor",
        (Locale::En, RiskLevel::High) => "there are signals of needing extra support",
    }
}

pub fn insufficient_data(locale: Locale) -> &'static str {
    match locale {
        Locale::Tr => "Değerlendirme için yeterli veri yok.",
        Locale::En => "Insufficient data for an assessment.",
    }
}

/// "A ve B" / "A and B".
pub fn join_labels(domains: &[Domain], locale: Locale) -> String {
    let labels: Vec<&str> = domains.iter().map(|d| d.label(locale)).collect();
    let conj = match locale {
        Locale::Tr => " ve ",
        Locale::En => " and ",
    };
    match labels.split_last() {
        None => String::new(),
        Some((last, [])) => (*last).to_string(),
        Some((last, rest)) => format!("{}{conj}{last}", rest.join(", ")),
    }
}

/// Highest-scoring domains first, ties in tag order.
pub fn most_represented(scores: &DomainScores, domains: &[Domain], n: usize) -> Vec<Domain> {
    let mut ordered: Vec<Domain> = domains.to_vec();
    ordered.sort_by_key(|d| std::cmp::Reverse(scores.get(d).copied().unwrap_or(0)));
    ordered.truncate(n);
    ordered
}

pub fn observation_summary(focus: &[Domain], risk: RiskLevel, locale: Locale) -> String {
    let domains = join_labels(focus, locale);
    let phrase = risk_phrase(risk, locale);
    match locale {
        Locale::Tr => format!("Gözlem ağırlıklı olarak {domains} alanlarına odaklandı; {phrase}."),
        Locale::En => format!("The observation focused mainly on {domains}; {phrase}."),
    }
}
