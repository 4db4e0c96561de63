//! Generation providers.
//!
//! [`OpenAiGenerator`] calls `POST /v1/chat/completions` with the grounded
//! prompt built by the answer pipeline; [`DisabledGenerator`] refuses every
//! request, which the pipeline reports as `generation_unavailable`.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use docqa_core::error::GenerationError;
use docqa_core::generation::{Generator, Prompt};

use crate::config::GenerationConfig;
use crate::openai::{api_key_from_env, CallError, OpenAiClient};

pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _prompt: &Prompt) -> Result<String, GenerationError> {
        Err(GenerationError::Disabled)
    }
}

pub struct OpenAiGenerator {
    client: OpenAiClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for OpenAI provider"))?;
        let client = OpenAiClient::new(
            &config.url,
            api_key,
            config.timeout_secs,
            config.max_retries,
        )?;
        Ok(Self {
            client,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let json = self
            .client
            .post_json("/v1/chat/completions", &body)
            .await
            .map_err(|e| match e {
                CallError::Timeout => GenerationError::Timeout(self.timeout_secs),
                CallError::Unreachable(m) => GenerationError::Unreachable(m),
                CallError::Rejected { status, body } => GenerationError::Rejected { status, body },
                CallError::InvalidResponse(m) => GenerationError::InvalidResponse(m),
            })?;

        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(|c| c.trim().to_string())
            .ok_or_else(|| {
                GenerationError::InvalidResponse("missing choices[0].message.content".to_string())
            })
    }
}

/// Create the generator selected by `[generation].provider`.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => {
            let key = api_key_from_env(&config.api_key_env)?;
            Ok(Arc::new(OpenAiGenerator::new(config, key)?))
        }
        other => bail!("Unknown generation provider: {}", other),
    }
}
