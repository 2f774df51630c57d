//! Text completion boundary.
//!
//! Stages never talk HTTP directly: they hand a [`CompletionRequest`] to a
//! [`CompletionService`]. [`LlmClient`] is the production implementation
//! (Anthropic Messages API); tests plug in scripted stubs.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-call model settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    pub model: String,
    pub temperature: f32,
    /// Upper bound for a single call. Enforced by the invoker.
    pub timeout: Duration,
    pub max_tokens: u32,
}

/// One completion call: a stage preamble plus the composed prompt.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub config: &'a CompletionConfig,
}

/// Something that turns a prompt into generated text.
///
/// `Ok(None)` means the service answered but produced no text at all.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Option<String>>;
}

/// A message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Response from the Messages API.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl ApiResponse {
    /// Concatenated text blocks, or `None` when the reply had no text.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(""))
        }
    }
}

const API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API client.
pub struct LlmClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: API_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Point the client at a different endpoint (proxies, local gateways).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Send a single conversation and return the raw API response.
    pub async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        config: &CompletionConfig,
    ) -> Result<ApiResponse> {
        let body = serde_json::json!({
            "model": &config.model,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "system": system,
            "messages": messages,
        });

        let resp = self
            .http
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to call completion API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Completion API error {status}: {body}");
        }

        let parsed = resp
            .json::<ApiResponse>()
            .await
            .context("Failed to parse completion response")?;
        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = ?parsed.stop_reason,
                "Completion usage"
            );
        }
        Ok(parsed)
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Option<String>> {
        let messages = vec![Message {
            role: "user".to_string(),
            content: request.prompt.to_string(),
        }];
        let resp = self.chat(request.system, &messages, request.config).await?;
        Ok(resp.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_blocks_are_joined() {
        let resp: ApiResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Hello, "},{"type":"text","text":"world"}],
                "stop_reason":"end_turn","usage":{"input_tokens":3,"output_tokens":2}}"#,
        )
        .unwrap();
        assert_eq!(resp.text().as_deref(), Some("Hello, world"));
    }

    #[test]
    fn no_text_blocks_is_absent() {
        let resp: ApiResponse = serde_json::from_str(
            r#"{"content":[{"type":"tool_use","id":"x","name":"y","input":{}}],"stop_reason":null,"usage":null}"#,
        )
        .unwrap();
        assert_eq!(resp.text(), None);
    }
}
