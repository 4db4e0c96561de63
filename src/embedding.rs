//! Embedding providers.
//!
//! Concrete implementations of [`docqa_core::embedding::Embedder`]:
//! - **[`DisabledEmbedder`]**: always fails; used when embeddings are not configured.
//! - **[`OpenAiEmbedder`]**: calls `POST /v1/embeddings` with retry and backoff
//!   (see [`crate::openai`]).
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use docqa::config::EmbeddingConfig;
//! # use docqa::embedding::create_embedder;
//! # use docqa_core::embedding::Embedder;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "disabled");
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use docqa_core::embedding::Embedder;
use docqa_core::error::EmbeddingError;

use crate::config::EmbeddingConfig;
use crate::openai::{api_key_from_env, CallError, OpenAiClient};

// ============ Disabled Provider ============

/// An embedder that refuses every request.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Disabled)
    }
}

// ============ OpenAI Provider ============

/// Embedder backed by the OpenAI embeddings API.
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
    dims: usize,
    timeout_secs: u64,
}

impl OpenAiEmbedder {
    /// # Errors
    ///
    /// Returns an error if `model` or `dims` is not set in config.
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;
        let client = OpenAiClient::new(
            &config.url,
            api_key,
            config.timeout_secs,
            config.max_retries,
        )?;
        Ok(Self {
            client,
            model,
            dims,
            timeout_secs: config.timeout_secs,
        })
    }

    #[cfg(test)]
    fn with_client(mut self, f: impl FnOnce(OpenAiClient) -> OpenAiClient) -> Self {
        self.client = f(self.client);
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = self
            .client
            .post_json("/v1/embeddings", &body)
            .await
            .map_err(|e| match e {
                CallError::Timeout => EmbeddingError::Timeout(self.timeout_secs),
                CallError::Unreachable(m) => EmbeddingError::Unreachable(m),
                CallError::Rejected { status, body } => EmbeddingError::Rejected { status, body },
                CallError::InvalidResponse(m) => EmbeddingError::InvalidResponse(m),
            })?;
        parse_embeddings_response(&json)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_embeddings_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let invalid = |m: &str| EmbeddingError::InvalidResponse(m.to_string());

    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| invalid("missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| invalid("missing embedding"))?;
        let vec = embedding
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| invalid("non-numeric embedding value"))?;
        indexed.push((index, vec));
    }

    // Sort by index to ensure order matches input
    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

/// Create the embedder selected by `[embedding].provider`.
///
/// # Errors
///
/// Returns an error for unknown providers, or when the OpenAI provider is
/// selected but the API key variable is unset.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "openai" => {
            let key = api_key_from_env(&config.api_key_env)?;
            Ok(Arc::new(OpenAiEmbedder::new(config, key)?))
        }
        other => bail!("Unknown embedding provider: {}", other),
    }
}
