//! Hosted text-generation provider.
//!
//! Speaks the Hugging Face inference wire format:
//! `POST {endpoint}/models/{model}` with `{"inputs", "parameters"}` and a
//! response of `[{"generated_text": ...}]`. Text-generation-inference servers
//! return a bare object instead of an array; both shapes are accepted.

use super::{GenerationParams, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider configuration.
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Transport-level ceiling; the strategy applies its own shorter timeout.
    pub request_timeout: Duration,
}

pub struct HuggingFaceTextProvider {
    config: HuggingFaceConfig,
    client: Client,
}

impl HuggingFaceTextProvider {
    pub fn new(config: HuggingFaceConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/models/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

#[derive(Debug, Serialize)]
struct GenerateParameters {
    max_new_tokens: u32,
    num_return_sequences: u32,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerateResponse {
    Batch(Vec<GeneratedText>),
    Single(GeneratedText),
}

#[async_trait]
impl TextProvider for HuggingFaceTextProvider {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = GenerateRequest {
            inputs: prompt,
            parameters: GenerateParameters {
                max_new_tokens: params.max_new_tokens,
                num_return_sequences: params.num_return_sequences,
                do_sample: true,
            },
        };

        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Sending request to text-generation endpoint"
        );

        let mut builder = self.client.post(self.api_url()).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "text-generation error {}: {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text = match body {
            GenerateResponse::Batch(mut items) if !items.is_empty() => {
                items.swap_remove(0).generated_text
            }
            GenerateResponse::Batch(_) => {
                return Err(ProviderError::InvalidResponse(
                    "no generations returned".to_string(),
                ))
            }
            GenerateResponse::Single(item) => item.generated_text,
        };

        Ok(ProviderResponse { text })
    }
}
