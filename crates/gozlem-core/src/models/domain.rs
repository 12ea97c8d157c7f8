use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

/// Language used for generated summaries, suggestions and explanations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Locale {
    #[default]
    Tr,
    En,
}

impl FromStr for Locale {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tr" => Ok(Self::Tr),
            "en" => Ok(Self::En),
            other => Err(CoreError::UnknownLocale(other.to_string())),
        }
    }
}

/// Development domain tag (2024 preschool programme, seven areas).
///
/// Serialized as the snake_case current tag. Deserialization also accepts
/// the six legacy tags through [`LEGACY_ALIASES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Domain {
    Turkish,
    Math,
    Science,
    Social,
    MotorHealth,
    Art,
    Music,
}

/// Legacy tag → current domain.
///
/// `cognitive → math` is an approximation carried over for compatibility
/// with stored data; it loses information and must not be read as a
/// principled mapping.
pub const LEGACY_ALIASES: &[(&str, Domain)] = &[
    ("cognitive", Domain::Math),
    ("language", Domain::Turkish),
    ("social_emotional", Domain::Social),
    ("fine_motor", Domain::MotorHealth),
    ("gross_motor", Domain::MotorHealth),
    ("self_care", Domain::MotorHealth),
];

impl Domain {
    pub const ALL: [Domain; 7] = [
        Domain::Turkish,
        Domain::Math,
        Domain::Science,
        Domain::Social,
        Domain::MotorHealth,
        Domain::Art,
        Domain::Music,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Turkish => "turkish",
            Domain::Math => "math",
            Domain::Science => "science",
            Domain::Social => "social",
            Domain::MotorHealth => "motor_health",
            Domain::Art => "art",
            Domain::Music => "music",
        }
    }

    pub fn label(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::Tr, Domain::Turkish) => "Türkçe",
            (Locale::Tr, Domain::Math) => "Matematik",
            (Locale::Tr, Domain::Science) => "Fen",
            (Locale::Tr, Domain::Social) => "Sosyal",
            (Locale::Tr, Domain::MotorHealth) => "Hareket ve Sağlık",
            (Locale::Tr, Domain::Art) => "Sanat",
            (Locale::Tr, Domain::Music) => "Müzik",
            (Locale::En, Domain::Turkish) => "Turkish",
            (Locale::En, Domain::Math) => "Math",
            (Locale::En, Domain::Science) => "Science",
            (Locale::En, Domain::Social) => "Social",
            (Locale::En, Domain::MotorHealth) => "Movement and Health",
            (Locale::En, Domain::Art) => "Art",
            (Locale::En, Domain::Music) => "Music",
        }
    }

    /// Resolve a current or legacy tag. Case and surrounding whitespace are ignored.
    pub fn from_tag(tag: &str) -> Option<Domain> {
        let tag = tag.trim().to_ascii_lowercase();
        Domain::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == tag)
            .or_else(|| {
                LEGACY_ALIASES
                    .iter()
                    .find(|(legacy, _)| *legacy == tag)
                    .map(|(_, d)| *d)
            })
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::from_tag(s).ok_or_else(|| CoreError::UnknownDomain(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for Domain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

/// Where the observation took place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ObservationContext {
    #[default]
    Classroom,
    Outdoor,
    Home,
    Other,
}

impl FromStr for ObservationContext {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classroom" => Ok(Self::Classroom),
            "outdoor" => Ok(Self::Outdoor),
            "home" => Ok(Self::Home),
            "other" => Ok(Self::Other),
            other => Err(CoreError::UnknownContext(other.to_string())),
        }
    }
}

/// Heuristic risk classification. Ordered `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn label(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::Tr, RiskLevel::Low) => "düşük",
            (Locale::Tr, RiskLevel::Medium) => "orta",
            (Locale::Tr, RiskLevel::High) => "yüksek",
            (Locale::En, RiskLevel::Low) => "low",
            (Locale::En, RiskLevel::Medium) => "medium",
            (Locale::En, RiskLevel::High) => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(CoreError::UnknownRisk(other.to_string())),
        }
    }
}
