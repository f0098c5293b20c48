//! Conversational phase labels attached to every coach question.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse label for the intent of a coach question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Clarify,
    Assumptions,
    Appreciate,
    Contextual,
}

impl Phase {
    /// Every phase a response may carry.
    pub const ALL: [Phase; 4] = [
        Phase::Clarify,
        Phase::Assumptions,
        Phase::Appreciate,
        Phase::Contextual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Clarify => "clarify",
            Phase::Assumptions => "assumptions",
            Phase::Appreciate => "appreciate",
            Phase::Contextual => "contextual",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clarify" => Ok(Phase::Clarify),
            "assumptions" => Ok(Phase::Assumptions),
            "appreciate" => Ok(Phase::Appreciate),
            "contextual" => Ok(Phase::Contextual),
            other => Err(format!("unknown phase: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_string_form_round_trips() {
        for phase in Phase::ALL {
            assert_eq!(phase.as_str().parse::<Phase>(), Ok(phase));
        }
    }

    #[test]
    fn phase_serializes_lowercase() {
        let json = serde_json::to_string(&Phase::Assumptions).unwrap();
        assert_eq!(json, "\"assumptions\"");
    }

    #[test]
    fn unknown_phase_is_rejected() {
        assert!("reflect".parse::<Phase>().is_err());
    }
}
