use gozlem_core::models::domain::RiskLevel;

/// Aggression or harm. Any hit classifies the note as high risk.
pub const SEVERE: &[&str] = &[
    "kavga",
    "vur",
    "isir",
    "firlat",
    "kendine zarar",
    "siddet",
    "yaral",
];

/// Struggle, prompting, avoidance, restlessness, inattention, rule breaking.
pub const WARN: &[&str] = &[
    "zorlan",
    "yardim",
    "hatirlatma",
    "sinirli",
    "kacin",
    "tereddut",
    "uyari",
    "desteg",
    "destek",
    "zorluk",
    "mudahale",
    "huzursuz",
    "odaklanamad",
    "dikkati dagild",
    "kurala uymadi",
];

/// Success, enthusiasm, independence, sustained participation, calm.
pub const POSITIVE: &[&str] = &[
    "basar",
    "heves",
    "bagimsiz",
    "dogru",
    "katilim",
    "katildi",
    "surdur",
    "ilerle",
    "artti",
    "uzun sure",
    "dengede",
    "yerine yerlestirdi",
    "sakin",
    "tamamladi",
];

/// Distinct number of warn markers needed for a medium classification.
pub const WARN_THRESHOLD: usize = 3;

/// Markers found in a folded note, each list in marker-table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerHits {
    pub severe: Vec<&'static str>,
    pub warn: Vec<&'static str>,
    pub positive: Vec<&'static str>,
}

impl MarkerHits {
    /// First-match-wins decision: severe, then positive, then the warn count.
    /// `None` means the lexical markers did not decide.
    pub fn verdict(&self) -> Option<RiskLevel> {
        if !self.severe.is_empty() {
            Some(RiskLevel::High)
        } else if !self.positive.is_empty() {
            Some(RiskLevel::Low)
        } else if self.warn.len() >= WARN_THRESHOLD {
            Some(RiskLevel::Medium)
        } else {
            None
        }
    }

    pub fn has_negative(&self) -> bool {
        !self.severe.is_empty() || !self.warn.is_empty()
    }

    pub fn has_positive(&self) -> bool {
        !self.positive.is_empty()
    }
}

/// Scan already-folded text.
pub fn scan(folded: &str) -> MarkerHits {
    let found = |list: &[&'static str]| -> Vec<&'static str> {
        list.iter().copied().filter(|m| folded.contains(m)).collect()
    };
    MarkerHits {
        severe: found(SEVERE),
        warn: found(WARN),
        positive: found(POSITIVE),
    }
}

/// Risk from an average domain score: `>= 2.7` low, `>= 2.2` medium, else high.
pub fn risk_from_average(avg: f64) -> RiskLevel {
    if avg >= 2.7 {
        RiskLevel::Low
    } else if avg >= 2.2 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}
