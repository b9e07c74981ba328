//! Case priority heuristic from damage text and model year.
//!
//! Best-effort triage signal: a recent vehicle and a severe-sounding damage
//! description each raise the priority by one tier. `URGENT` exists for
//! manual escalation and is never produced here.

use serde::{Deserialize, Serialize};

/// Damage keywords that mark a description as severe (case-insensitive substring match).
pub const SEVERE_DAMAGE_KEYWORDS: &[&str] = &[
    "severe",
    "major",
    "totaled",
    "extensive",
    "heavy",
    "significant",
];

/// A model year at most this many years old counts as recent.
pub const RECENT_MODEL_YEARS: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CasePriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl CasePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            CasePriority::Low => "LOW",
            CasePriority::Medium => "MEDIUM",
            CasePriority::High => "HIGH",
            CasePriority::Urgent => "URGENT",
        }
    }
}

impl std::fmt::Display for CasePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CasePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(CasePriority::Low),
            "MEDIUM" => Ok(CasePriority::Medium),
            "HIGH" => Ok(CasePriority::High),
            "URGENT" => Ok(CasePriority::Urgent),
            other => Err(format!("unknown case priority: {}", other)),
        }
    }
}

/// Keyword and recency classifier.
#[derive(Debug, Clone)]
pub struct PriorityClassifier {
    keywords: Vec<String>,
    recent_years: i32,
}

impl Default for PriorityClassifier {
    fn default() -> Self {
        Self::new(SEVERE_DAMAGE_KEYWORDS.iter().copied(), RECENT_MODEL_YEARS)
    }
}

impl PriorityClassifier {
    pub fn new<'a>(keywords: impl IntoIterator<Item = &'a str>, recent_years: i32) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            recent_years,
        }
    }

    pub fn is_recent(&self, model_year: Option<i32>, current_year: i32) -> bool {
        model_year
            .and_then(|year| current_year.checked_sub(year))
            .is_some_and(|age| age <= self.recent_years)
    }

    pub fn has_severe_damage(&self, damage: &str) -> bool {
        let damage = damage.to_lowercase();
        self.keywords.iter().any(|kw| damage.contains(kw.as_str()))
    }

    /// Both signals → HIGH, one → MEDIUM, none → LOW.
    ///
    /// `current_year` is supplied by the caller so results do not depend on
    /// the wall clock.
    pub fn classify(&self, damage: &str, model_year: Option<i32>, current_year: i32) -> CasePriority {
        match (
            self.is_recent(model_year, current_year),
            self.has_severe_damage(damage),
        ) {
            (true, true) => CasePriority::High,
            (true, false) | (false, true) => CasePriority::Medium,
            (false, false) => CasePriority::Low,
        }
    }
}

/// Classify with the default keywords and recency window.
pub fn classify(damage: &str, model_year: Option<i32>, current_year: i32) -> CasePriority {
    PriorityClassifier::default().classify(damage, model_year, current_year)
}
