//! Generative strategy: delegate question wording to a text-generation model.

use super::{Selection, SelectorError, Source};
use crate::models::{Phase, Turn};
use crate::services::metrics;
use crate::services::providers::{GenerationParams, TextProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const CUE_MARKER: &str = "Coach:";

/// Appended when the model's output is not phrased as a question.
pub const FOLLOW_UP: &str = "What makes you feel that way?";

const INSTRUCTION: &str = "You are a Socratic coach. Reply with one short, open-ended \
question that helps the user reflect on what they just said.";

#[derive(Debug, Clone)]
pub struct GenerativeSettings {
    pub params: GenerationParams,
    pub timeout: Duration,
    /// Previous turns embedded in the prompt.
    pub history_window: usize,
}

impl Default for GenerativeSettings {
    fn default() -> Self {
        Self {
            params: GenerationParams::default(),
            timeout: Duration::from_millis(5000),
            history_window: 3,
        }
    }
}

pub struct GenerativeQuestioner {
    provider: Arc<dyn TextProvider>,
    settings: GenerativeSettings,
}

impl GenerativeQuestioner {
    pub fn new(provider: Arc<dyn TextProvider>, settings: GenerativeSettings) -> Self {
        Self { provider, settings }
    }

    /// Ask the model for a question; the call is dropped once the timeout elapses.
    pub async fn generate(&self, message: &str, history: &[Turn]) -> Result<Selection, SelectorError> {
        let prompt = build_prompt(message, history, self.settings.history_window);
        let started = Instant::now();

        let outcome = tokio::time::timeout(
            self.settings.timeout,
            self.provider.generate(&prompt, &self.settings.params),
        )
        .await;

        let elapsed = started.elapsed().as_secs_f64();
        let response = match outcome {
            Err(_) => {
                metrics::record_generation(self.provider.name(), "timeout", elapsed);
                return Err(SelectorError::GenerationTimeout(self.settings.timeout));
            }
            Ok(Err(e)) => {
                metrics::record_generation(self.provider.name(), e.kind(), elapsed);
                return Err(SelectorError::GenerationUnavailable(e));
            }
            Ok(Ok(response)) => {
                metrics::record_generation(self.provider.name(), "ok", elapsed);
                response
            }
        };

        let question =
            extract_question(&response.text, &prompt).ok_or(SelectorError::EmptyGeneration)?;

        Ok(Selection::new(question, Phase::Contextual, Source::Generative))
    }
}

/// Instruction, recent turns, then the new message followed by the cue marker.
pub fn build_prompt(message: &str, history: &[Turn], window: usize) -> String {
    let mut prompt = String::from(INSTRUCTION);
    prompt.push_str("\n\n");

    let start = history.len().saturating_sub(window);
    for turn in &history[start..] {
        prompt.push_str(&format!(
            "User: {}\n{} {}\n",
            turn.user_text.trim(),
            CUE_MARKER,
            turn.coach_question
        ));
    }

    prompt.push_str(&format!("User: {}\n{}", message.trim(), CUE_MARKER));
    prompt
}

/// Pull the first line of the continuation and force it into question form.
///
/// Backends may echo the prompt before the continuation; without an echo the
/// whole output is the continuation, optionally opening with the cue marker.
/// Returns `None` when nothing usable was generated.
pub fn extract_question(generated: &str, prompt: &str) -> Option<String> {
    let continuation = generated.strip_prefix(prompt).unwrap_or(generated);
    let continuation = continuation.trim_start();
    let continuation = continuation
        .strip_prefix(CUE_MARKER)
        .unwrap_or(continuation);

    let line = continuation.lines().next()?.trim();
    if line.is_empty() {
        return None;
    }

    if line.ends_with('?') {
        Some(line.to_string())
    } else {
        Some(format!("{} {}", line, FOLLOW_UP))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::{MockBehavior, MockTextProvider};

    fn questioner(behavior: MockBehavior, timeout: Duration) -> GenerativeQuestioner {
        GenerativeQuestioner::new(
            Arc::new(MockTextProvider::new(behavior)),
            GenerativeSettings {
                timeout,
                ..Default::default()
            },
        )
    }

    #[test]
    fn prompt_ends_with_cue_marker() {
        let prompt = build_prompt("  I want to learn piano ", &[], 3);
        assert!(prompt.starts_with("You are a Socratic coach."));
        assert!(prompt.ends_with("User: I want to learn piano\nCoach:"));
    }

    #[test]
    fn prompt_keeps_only_recent_turns() {
        let history: Vec<Turn> = (0..5)
            .map(|i| Turn::new(format!("message {}", i), format!("question {}?", i), Phase::Clarify))
            .collect();
        let prompt = build_prompt("latest", &history, 2);
        assert!(!prompt.contains("message 2"));
        assert!(prompt.contains("User: message 3\nCoach: question 3?"));
        assert!(prompt.contains("User: message 4\nCoach: question 4?"));
    }

    #[test]
    fn extract_strips_echoed_prompt() {
        let prompt = build_prompt("hello", &[], 0);
        let generated = format!("{} Why does that matter to you?\nUser: more", prompt);
        assert_eq!(
            extract_question(&generated, &prompt).as_deref(),
            Some("Why does that matter to you?")
        );
    }

    #[test]
    fn extract_strips_leading_cue_marker() {
        let generated = "Coach:   What do you fear most?  \nUser: spiders";
        assert_eq!(
            extract_question(generated, "unrelated prompt").as_deref(),
            Some("What do you fear most?")
        );
    }

    #[test]
    fn extract_keeps_first_line_of_unechoed_continuation() {
        let prompt = build_prompt("I want a new job", &[], 3);
        let generated = " What would a new job give you?\nUser: more money\nCoach: Why money";
        assert_eq!(
            extract_question(generated, &prompt).as_deref(),
            Some("What would a new job give you?")
        );
    }

    #[test]
    fn statements_get_follow_up_question() {
        assert_eq!(
            extract_question("That sounds hard.", "prompt").as_deref(),
            Some("That sounds hard. What makes you feel that way?")
        );
    }

    #[test]
    fn blank_generation_is_rejected() {
        assert_eq!(extract_question("Coach:   \n  ", "prompt"), None);
    }

    #[tokio::test]
    async fn successful_generation_is_contextual() {
        let q = questioner(
            MockBehavior::Reply {
                text: "What would you try first?".to_string(),
                echo_prompt: true,
            },
            Duration::from_secs(1),
        );
        let selection = q.generate("I want to change jobs", &[]).await.unwrap();
        assert_eq!(selection.question, "What would you try first?");
        assert_eq!(selection.phase, Phase::Contextual);
        assert_eq!(selection.source, Source::Generative);
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let q = questioner(
            MockBehavior::Delay {
                delay: Duration::from_millis(500),
                text: "too late?".to_string(),
            },
            Duration::from_millis(20),
        );
        let err = q.generate("hello", &[]).await.unwrap_err();
        assert!(matches!(err, SelectorError::GenerationTimeout(_)));
    }

    #[tokio::test]
    async fn backend_failure_is_unavailable() {
        let q = questioner(MockBehavior::Fail, Duration::from_secs(1));
        let err = q.generate("hello", &[]).await.unwrap_err();
        assert!(matches!(err, SelectorError::GenerationUnavailable(_)));
    }
}
