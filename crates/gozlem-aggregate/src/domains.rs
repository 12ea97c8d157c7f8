use std::collections::BTreeMap;

use gozlem_core::models::domain::Domain;
use gozlem_core::models::record::ObservationRecord;

/// How many observations are tagged with each domain. Untagged domains are absent.
pub fn domain_frequency(records: &[ObservationRecord]) -> BTreeMap<Domain, usize> {
    let mut freq = BTreeMap::new();
    for record in records {
        for domain in &record.observation.domains {
            *freq.entry(*domain).or_insert(0) += 1;
        }
    }
    freq
}

/// The `n` most frequent domains, count descending, ties in domain order.
pub fn top_domains(freq: &BTreeMap<Domain, usize>, n: usize) -> Vec<(Domain, usize)> {
    let mut ranked: Vec<(Domain, usize)> = freq.iter().map(|(d, c)| (*d, *c)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}
