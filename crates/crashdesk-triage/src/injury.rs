//! Injury status whitelist.

use serde::{Deserialize, Serialize};

/// Closed set of injury statuses accepted by persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InjuryStatus {
    #[serde(rename = "No apparent injury")]
    NoApparentInjury,
    #[serde(rename = "Suspected minor injury")]
    SuspectedMinorInjury,
    #[serde(rename = "Suspected serious injury")]
    SuspectedSeriousInjury,
    #[serde(rename = "Fatal injury")]
    FatalInjury,
    #[serde(rename = "Not specified")]
    NotSpecified,
}

impl InjuryStatus {
    pub const ALL: [InjuryStatus; 5] = [
        InjuryStatus::NoApparentInjury,
        InjuryStatus::SuspectedMinorInjury,
        InjuryStatus::SuspectedSeriousInjury,
        InjuryStatus::FatalInjury,
        InjuryStatus::NotSpecified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InjuryStatus::NoApparentInjury => "No apparent injury",
            InjuryStatus::SuspectedMinorInjury => "Suspected minor injury",
            InjuryStatus::SuspectedSeriousInjury => "Suspected serious injury",
            InjuryStatus::FatalInjury => "Fatal injury",
            InjuryStatus::NotSpecified => "Not specified",
        }
    }

    /// Map a parsed value onto the whitelist.
    ///
    /// Only an exact match (after trimming) is accepted; anything else,
    /// including case variants and embellished text, is `NotSpecified`.
    pub fn normalize(value: &str) -> Self {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .unwrap_or(InjuryStatus::NotSpecified)
    }
}

impl std::fmt::Display for InjuryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
