//! Mapping from cluster labels to coach questions.

use super::{Selection, Source};
use crate::models::Phase;
use rand::seq::SliceRandom;

struct ClusterQuestions {
    phase: Phase,
    variants: &'static [&'static str],
}

/// Indexed by cluster label. The first variant is the canonical question.
const CLUSTER_QUESTIONS: [ClusterQuestions; 3] = [
    ClusterQuestions {
        phase: Phase::Clarify,
        variants: &[
            "What specifically would success look like for you?",
            "How would you know you had achieved it?",
            "What would be different if this worked out?",
        ],
    },
    ClusterQuestions {
        phase: Phase::Assumptions,
        variants: &[
            "What assumptions are you making about that?",
            "What evidence supports that view?",
            "How might someone else see this differently?",
        ],
    },
    ClusterQuestions {
        phase: Phase::Appreciate,
        variants: &[
            "What do you love about this?",
            "What makes this meaningful to you?",
            "When did you first notice you enjoyed this?",
        ],
    },
];

/// Question for a cluster label, or `None` if the label has no mapping.
///
/// With `varied`, one of the label's variants is picked uniformly at random.
pub fn select(label: usize, varied: bool) -> Option<Selection> {
    let entry = CLUSTER_QUESTIONS.get(label)?;
    let question = if varied {
        entry
            .variants
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(entry.variants[0])
    } else {
        entry.variants[0]
    };
    Some(Selection::new(question, entry.phase, Source::Cluster))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_map_positionally() {
        assert_eq!(select(0, false).unwrap().phase, Phase::Clarify);
        assert_eq!(select(1, false).unwrap().phase, Phase::Assumptions);
        assert_eq!(select(2, false).unwrap().phase, Phase::Appreciate);
        assert_eq!(
            select(1, false).unwrap().question,
            "What assumptions are you making about that?"
        );
    }

    #[test]
    fn unmapped_label_yields_none() {
        assert!(select(3, false).is_none());
    }

    #[test]
    fn varied_questions_stay_within_the_phase() {
        for _ in 0..20 {
            let s = select(2, true).unwrap();
            assert_eq!(s.phase, Phase::Appreciate);
            assert!(CLUSTER_QUESTIONS[2].variants.contains(&s.question.as_str()));
        }
    }
}
