//! Debate content generation through an OpenAI-compatible chat-completions API.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::LlmSettings;

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 1000;

/// Raw generator output. Cards are validated by the caller, one by one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDebate {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cards: Vec<GeneratedCard>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCard {
    #[serde(default)]
    pub stance: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The generator could not be reached or answered with a non-success status.
    #[error("content generation request failed: {0:#}")]
    Request(#[source] anyhow::Error),

    /// The generator answered, but not with the expected JSON shape.
    #[error("generated content is malformed: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<GeneratedDebate, GeneratorError>;
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Models sometimes wrap JSON in a markdown fence despite being told not to.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Decode message content into a [`GeneratedDebate`].
pub fn parse_generated(content: &str) -> Result<GeneratedDebate, GeneratorError> {
    serde_json::from_str(strip_code_fence(content))
        .map_err(|e| GeneratorError::Malformed(format!("invalid debate JSON: {e}")))
}

pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(settings: &LlmSettings, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
            "response_format": {"type": "json_object"},
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to call chat completions")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read chat completions body")?;

        if !status.is_success() {
            return Err(anyhow!("OpenAI API error (status {}): {}", status, text));
        }
        Ok(text)
    }
}

#[async_trait]
impl ContentGenerator for OpenAiClient {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<GeneratedDebate, GeneratorError> {
        let raw = self
            .complete(system_prompt, user_prompt)
            .await
            .map_err(GeneratorError::Request)?;

        let parsed: ChatResponse = serde_json::from_str(&raw)
            .map_err(|e| GeneratorError::Malformed(format!("invalid completion envelope: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GeneratorError::Malformed("no choices returned".to_string()))?;

        debug!("Generator returned {} bytes of content", content.len());
        parse_generated(&content)
    }
}
