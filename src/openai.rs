//! Minimal client for OpenAI-compatible JSON endpoints.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use std::time::Duration;

/// Why a request ultimately failed, after retries.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("request timed out")]
    Timeout,
    #[error("service unreachable: {0}")]
    Unreachable(String),
    #[error("request rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: String, timeout_secs: u64, max_retries: u32) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries,
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Override the first backoff delay (tests use milliseconds).
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// POST `body` to `{base_url}{path}` and return the parsed JSON response.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<serde_json::Value, CallError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err = CallError::Unreachable("no attempt made".to_string());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_base * (1u32 << (attempt - 1).min(5));
                tracing::debug!(attempt, ?delay, url = %url, "retrying request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json::<serde_json::Value>()
                            .await
                            .map_err(|e| CallError::InvalidResponse(e.to_string()));
                    }

                    let body_text = response.text().await.unwrap_or_default();

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(status = status.as_u16(), attempt, "transient API error");
                        last_err = CallError::Rejected {
                            status: status.as_u16(),
                            body: body_text,
                        };
                        continue;
                    }

                    // Other client errors are final
                    return Err(CallError::Rejected {
                        status: status.as_u16(),
                        body: body_text,
                    });
                }
                Err(e) if e.is_timeout() => {
                    tracing::warn!(attempt, "request timed out");
                    last_err = CallError::Timeout;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "request failed");
                    last_err = CallError::Unreachable(e.to_string());
                }
            }
        }

        Err(last_err)
    }
}

/// Read the API key from the environment variable `var`.
pub fn api_key_from_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => bail!("{} environment variable not set", var),
    }
}
