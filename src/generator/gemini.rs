//! Google Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{GenerationError, TextGenerator};
use crate::config::schema::GeminiConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Value shipped in the sample `.env`.
pub const PLACEHOLDER_API_KEY: &str = "PASTE_YOUR_GEMINI_API_KEY_HERE";

/// Read the API key from `var`, rejecting unset, empty and placeholder values.
pub fn resolve_api_key(var: &str) -> Result<String, GenerationError> {
    let key = std::env::var(var).unwrap_or_default();
    let key = key.trim();
    if key.is_empty() {
        return Err(GenerationError::MissingApiKey {
            var: var.to_string(),
        });
    }
    if key == PLACEHOLDER_API_KEY {
        return Err(GenerationError::PlaceholderApiKey {
            var: var.to_string(),
        });
    }
    Ok(key.to_string())
}

pub struct GeminiGenerator {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiGenerator {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Build from config, reading the key from the configured variable.
    pub fn from_config(config: &GeminiConfig, timeout: Duration) -> Result<Self, GenerationError> {
        let api_key = resolve_api_key(&config.api_key_env)?;
        Self::new(&config.base_url, &config.model, api_key, timeout)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        tracing::debug!(model = %self.model, "requesting generation");

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        parse_response(&payload)
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_response(payload: &Value) -> Result<String, GenerationError> {
    let parts = payload
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            let reason = payload
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .map(|r| format!("prompt blocked: {}", r))
                .unwrap_or_else(|| "no candidates in response".to_string());
            GenerationError::Malformed(reason)
        })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(text)
}
