use std::collections::BTreeMap;

use gozlem_core::models::assessment::Assessment;
use gozlem_core::models::domain::{Domain, Locale, RiskLevel};
use gozlem_heuristic::fold::fold;
use gozlem_heuristic::suggestions;
use gozlem_heuristic::{BASELINE_SCORE, RiskHeuristic};
use uuid::Uuid;

fn tr() -> RiskHeuristic {
    RiskHeuristic::new(Locale::Tr)
}

fn stored(risk: RiskLevel, scores: &[(Domain, u8)]) -> Assessment {
    Assessment {
        observation_id: Uuid::new_v4(),
        risk,
        domain_scores: scores.iter().copied().collect(),
        suggestions: vec![],
        summary: String::new(),
        created_at: jiff::Timestamp::UNIX_EPOCH,
    }
}

#[test]
fn fighting_note_is_high_risk() {
    let eval = tr().evaluate("Çocuk arkadaşıyla kavga etti ve vurdu", &[Domain::Social]);
    assert_eq!(eval.risk, RiskLevel::High);
    assert_eq!(eval.domain_scores.get(&Domain::Social), Some(&2));
    assert_eq!(
        eval.suggestions,
        suggestions::pool(Domain::Social, Locale::Tr)
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
    );
    assert!(eval.summary.contains("Sosyal"));
    assert!(eval.summary.contains("ek destek ihtiyacı"));
}

#[test]
fn independent_success_is_low_risk_under_legacy_tag() {
    let domain: Domain = "cognitive".parse().unwrap();
    assert_eq!(domain, Domain::Math);

    let eval = tr().evaluate("Bağımsız şekilde başardı ve katıldı", &[domain]);
    assert_eq!(eval.risk, RiskLevel::Low);
    assert_eq!(eval.domain_scores.get(&Domain::Math), Some(&4));
}

#[test]
fn four_warn_markers_are_medium_risk() {
    let domain: Domain = "social_emotional".parse().unwrap();
    let eval = tr().evaluate(
        "Zorlandı, yardım istedi, dikkati dağıldı, kurala uymadı",
        &[domain],
    );
    assert_eq!(eval.risk, RiskLevel::Medium);
    assert_eq!(eval.domain_scores.get(&Domain::Social), Some(&2));
}

#[test]
fn unaccented_and_uppercase_spellings_match() {
    let h = tr();
    assert_eq!(h.evaluate("KAVGA ETTİ", &[Domain::Social]).risk, RiskLevel::High);
    assert_eq!(h.evaluate("Arkadasini isirdi", &[Domain::Social]).risk, RiskLevel::High);
    assert_eq!(h.evaluate("İsırdı", &[Domain::Social]).risk, RiskLevel::High);
    assert_eq!(fold("Şekil ÇİZDİ, güldü"), "sekil cizdi, guldu");
}

#[test]
fn few_warn_markers_without_prior_stay_low() {
    let eval = tr().evaluate("Etkinlikte zorlandı.", &[Domain::Art]);
    assert_eq!(eval.risk, RiskLevel::Low);
}

#[test]
fn prior_scores_decide_when_markers_do_not() {
    let h = tr();
    let weak: BTreeMap<Domain, u8> = [(Domain::Math, 2), (Domain::Art, 2)].into();
    let middling: BTreeMap<Domain, u8> = [(Domain::Math, 2), (Domain::Art, 3)].into();
    let strong: BTreeMap<Domain, u8> = [(Domain::Math, 3), (Domain::Art, 3)].into();

    let note = "Etkinlikte zorlandı.";
    let domains = [Domain::Math, Domain::Art];
    assert_eq!(h.evaluate_with_prior(note, &domains, Some(&weak)).risk, RiskLevel::High);
    assert_eq!(
        h.evaluate_with_prior(note, &domains, Some(&middling)).risk,
        RiskLevel::Medium
    );
    assert_eq!(h.evaluate_with_prior(note, &domains, Some(&strong)).risk, RiskLevel::Low);

    // Markers still win over the prior.
    assert_eq!(
        h.evaluate_with_prior("kavga etti", &domains, Some(&strong)).risk,
        RiskLevel::High
    );
}

#[test]
fn empty_note_is_low_with_insufficient_data() {
    let eval = tr().evaluate("   \n", &[Domain::Music, Domain::Art]);
    assert_eq!(eval.risk, RiskLevel::Low);
    assert!(eval.suggestions.is_empty());
    assert!(eval.summary.contains("yeterli veri yok"));
    assert_eq!(eval.domain_scores.len(), 2);
    assert!(eval.domain_scores.values().all(|s| *s == BASELINE_SCORE));
}

#[test]
fn every_tagged_domain_is_scored_in_range() {
    let domains = Domain::ALL;
    for note in [
        "Sakin bir şekilde oyunu tamamladı",
        "Resim yaparken zorlandı",
        "Bugün sınıfta oynadı",
        "kavga",
    ] {
        let eval = tr().evaluate(note, &domains);
        assert_eq!(eval.domain_scores.len(), domains.len());
        assert!(eval.domain_scores.values().all(|s| (2..=4).contains(s)));
    }
}

#[test]
fn suggestions_favour_lower_scored_domains() {
    let eval = tr().evaluate(
        "Resim yaparken zorlandı, yardım istedi, desteğe ihtiyaç duydu",
        &[Domain::Music, Domain::Art],
    );
    assert_eq!(eval.risk, RiskLevel::Medium);
    assert_eq!(eval.domain_scores.get(&Domain::Art), Some(&2));
    assert_eq!(eval.domain_scores.get(&Domain::Music), Some(&3));

    let art = suggestions::pool(Domain::Art, Locale::Tr);
    let music = suggestions::pool(Domain::Music, Locale::Tr);
    assert_eq!(eval.suggestions, vec![art[0], music[0], art[1]]);
}

#[test]
fn suggestions_are_capped_and_unique() {
    let eval = tr().evaluate("Oyunu tamamladı", &Domain::ALL);
    assert_eq!(eval.suggestions.len(), 3);
    let mut unique = eval.suggestions.clone();
    unique.dedup();
    assert_eq!(unique.len(), 3);
}

#[test]
fn evaluation_is_deterministic() {
    let h = tr();
    let note = "Sırasını bekledi ama şarkıda zorlandı";
    let domains = [Domain::Social, Domain::Music];
    assert_eq!(h.evaluate(note, &domains), h.evaluate(note, &domains));
}

#[test]
fn english_summary_uses_calibrated_phrases() {
    let h = RiskHeuristic::new(Locale::En);
    let low = h.evaluate("Bağımsız şekilde başardı", &[Domain::Math]);
    assert!(low.summary.contains("progressing as expected"));
    assert!(low.summary.contains("Math"));

    let high = h.evaluate("kavga etti", &[Domain::Social]);
    assert!(high.summary.contains("signals of needing extra support"));
}

#[test]
fn reassess_prefers_markers_then_average_then_label() {
    let h = tr();
    let a = stored(RiskLevel::Medium, &[(Domain::Math, 3), (Domain::Art, 3)]);
    assert_eq!(h.reassess("Bugün sınıfta oynadı", &a), RiskLevel::Low);
    assert_eq!(h.reassess("kavga etti", &a), RiskLevel::High);

    let unscored = stored(RiskLevel::Medium, &[]);
    assert_eq!(h.reassess("Bugün sınıfta oynadı", &unscored), RiskLevel::Medium);
}

#[test]
fn explanation_lists_markers_and_weak_domains() {
    let a = stored(RiskLevel::High, &[(Domain::Social, 2), (Domain::Math, 4)]);
    let exp = tr().explain("Arkadaşına vurdu, yardım istedi", &a);

    assert_eq!(exp.risk, RiskLevel::High);
    assert_eq!(exp.severe_markers, vec!["vur"]);
    assert_eq!(exp.warn_markers, vec!["yardim"]);
    assert!(exp.positive_markers.is_empty());
    assert_eq!(exp.low_domains, vec![Domain::Social]);
    assert!(exp.mid_domains.is_empty());
    assert_eq!(exp.reasons.len(), 3);
    assert_eq!(exp.headline, "Risk düzeyi: yüksek");
}

#[test]
fn explanation_without_signals_says_so() {
    let a = stored(RiskLevel::Low, &[(Domain::Art, 3)]);
    let exp = RiskHeuristic::new(Locale::En).explain("Painted quietly", &a);
    assert_eq!(exp.risk, RiskLevel::Low);
    assert_eq!(exp.reasons, vec!["No notable risk signal was found."]);
}
