//! Case workflow status.

use serde::{Deserialize, Serialize};

use crashdesk_core::{Error, Result};

/// Lifecycle: NEW → IN_PROGRESS → CLOSED | LOST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    New,
    InProgress,
    Closed,
    Lost,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::New => "NEW",
            CaseStatus::InProgress => "IN_PROGRESS",
            CaseStatus::Closed => "CLOSED",
            CaseStatus::Lost => "LOST",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Closed | CaseStatus::Lost)
    }

    /// Setting the current status again is allowed and changes nothing.
    pub fn can_transition_to(&self, next: CaseStatus) -> bool {
        matches!(
            (self, next),
            (CaseStatus::New, CaseStatus::InProgress)
                | (CaseStatus::InProgress, CaseStatus::Closed)
                | (CaseStatus::InProgress, CaseStatus::Lost)
        ) || *self == next
    }

    pub fn transition(&self, next: CaseStatus) -> Result<CaseStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "NEW" => Ok(CaseStatus::New),
            "IN_PROGRESS" => Ok(CaseStatus::InProgress),
            "CLOSED" => Ok(CaseStatus::Closed),
            "LOST" => Ok(CaseStatus::Lost),
            other => Err(format!("unknown case status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert_eq!(CaseStatus::New.transition(CaseStatus::InProgress).unwrap(), CaseStatus::InProgress);
        assert!(CaseStatus::InProgress.can_transition_to(CaseStatus::Closed));
        assert!(CaseStatus::InProgress.can_transition_to(CaseStatus::Lost));
        assert!(CaseStatus::Closed.can_transition_to(CaseStatus::Closed));
    }

    #[test]
    fn test_rejected_transitions() {
        for (from, to) in [
            (CaseStatus::New, CaseStatus::Closed),
            (CaseStatus::New, CaseStatus::Lost),
            (CaseStatus::InProgress, CaseStatus::New),
            (CaseStatus::Closed, CaseStatus::InProgress),
            (CaseStatus::Lost, CaseStatus::Closed),
        ] {
            let err = from.transition(to).unwrap_err();
            assert!(matches!(err, Error::InvalidTransition { .. }), "{} -> {}", from, to);
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("in progress".parse::<CaseStatus>(), Ok(CaseStatus::InProgress));
        assert_eq!("IN_PROGRESS".parse::<CaseStatus>(), Ok(CaseStatus::InProgress));
        assert!("reopened".parse::<CaseStatus>().is_err());
        assert!(CaseStatus::Lost.is_terminal());
    }
}
