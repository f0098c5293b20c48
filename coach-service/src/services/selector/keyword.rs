//! Deterministic keyword rules; the fallback for every other strategy.

use super::{Selection, Source};
use crate::models::Phase;

struct KeywordRule {
    triggers: &'static [&'static str],
    question: &'static str,
    phase: Phase,
}

/// Evaluated in order; the first rule with a matching trigger wins.
const RULES: [KeywordRule; 3] = [
    KeywordRule {
        triggers: &["want", "goal"],
        question: "What specifically would success look like for you?",
        phase: Phase::Clarify,
    },
    KeywordRule {
        triggers: &["because", "think"],
        question: "What assumptions are you making about that?",
        phase: Phase::Assumptions,
    },
    KeywordRule {
        triggers: &["love", "like"],
        question: "What do you love about this?",
        phase: Phase::Appreciate,
    },
];

pub const DEFAULT_QUESTION: &str = "What do you mean by that exactly?";

/// Pick a question by substring match on the lowercased message.
pub fn select(message: &str) -> Selection {
    let lowered = message.to_lowercase();

    RULES
        .iter()
        .find(|rule| rule.triggers.iter().any(|t| lowered.contains(t)))
        .map(|rule| Selection::new(rule.question, rule.phase, Source::Keyword))
        .unwrap_or_else(|| Selection::new(DEFAULT_QUESTION, Phase::Clarify, Source::Keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(message: &str) -> (String, Phase) {
        let s = select(message);
        (s.question, s.phase)
    }

    #[test]
    fn goal_and_want_ask_for_success_criteria() {
        for message in ["My goal is to ship", "I WANT more time", "goals matter"] {
            assert_eq!(
                pair(message),
                (
                    "What specifically would success look like for you?".to_string(),
                    Phase::Clarify
                )
            );
        }
    }

    #[test]
    fn because_and_think_probe_assumptions() {
        assert_eq!(
            pair("I think because my team disagrees"),
            (
                "What assumptions are you making about that?".to_string(),
                Phase::Assumptions
            )
        );
    }

    #[test]
    fn love_and_like_ask_for_appreciation() {
        assert_eq!(
            pair("I really like my garden"),
            ("What do you love about this?".to_string(), Phase::Appreciate)
        );
    }

    #[test]
    fn no_trigger_asks_for_clarification() {
        assert_eq!(
            pair("the sky is blue today"),
            (DEFAULT_QUESTION.to_string(), Phase::Clarify)
        );
    }

    #[test]
    fn earlier_rules_take_priority() {
        assert_eq!(pair("I love it because I want it").1, Phase::Clarify);
        assert_eq!(pair("I love it because it is fun").1, Phase::Assumptions);
    }

    #[test]
    fn triggers_match_inside_words() {
        assert_eq!(pair("that seems unlikely").1, Phase::Appreciate);
    }

    #[test]
    fn empty_message_still_gets_a_question() {
        let s = select("");
        assert_eq!(s.question, DEFAULT_QUESTION);
        assert_eq!(s.source, Source::Keyword);
    }
}
