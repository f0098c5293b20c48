//! Mock provider for tests and for running without a generation backend.

use super::{GenerationParams, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::time::Duration;

/// What the mock does when asked to generate.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Reply with a fixed text, echoing the prompt first when `echo_prompt`.
    Reply { text: String, echo_prompt: bool },
    /// Sleep before replying; used to exercise timeouts.
    Delay { delay: Duration, text: String },
    /// Fail with an API error.
    Fail,
    /// Behave like an unconfigured backend.
    Disabled,
}

/// Mock text provider.
pub struct MockTextProvider {
    behavior: MockBehavior,
}

impl MockTextProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self { behavior }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Reply {
            text: text.into(),
            echo_prompt: true,
        })
    }

    pub fn disabled() -> Self {
        Self::new(MockBehavior::Disabled)
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        match &self.behavior {
            MockBehavior::Reply { text, echo_prompt } => {
                let text = if *echo_prompt {
                    format!("{} {}", prompt, text)
                } else {
                    text.clone()
                };
                Ok(ProviderResponse { text })
            }
            MockBehavior::Delay { delay, text } => {
                tokio::time::sleep(*delay).await;
                Ok(ProviderResponse { text: text.clone() })
            }
            MockBehavior::Fail => Err(ProviderError::ApiError(
                "mock provider failure".to_string(),
            )),
            MockBehavior::Disabled => Err(ProviderError::NotConfigured(
                "no text-generation endpoint configured".to_string(),
            )),
        }
    }
}
