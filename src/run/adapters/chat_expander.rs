//! Keyword expansion through an OpenAI-compatible chat completions API.

use crate::run::{
    domain::{ExpandedKeywords, KeywordExpansion},
    ports::{ExpanderError, KeywordExpander},
};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const EXPANSION_PROMPT: &str = r#"You are a search keyword expansion engine.
The user supplies one or more topic keywords. For each topic, list related
search keywords: the original keyword, English or local names, core product
lines, associated people, and associated technologies. Return at most 10
keywords per topic.

Answer with strict JSON and no code fences, shaped as:
{"expanded": [{"original": "Apple", "keywords": ["Apple", "iPhone", "iPad", "iOS", "Tim Cook"]}]}"#;

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Connection settings for [`ChatCompletionExpander`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChatExpanderSettings {
    /// API root, for example `https://api.openai.com/v1`.
    pub api_base: String,
    /// Model name; an `openai/` routing prefix is stripped.
    pub model: String,
    /// Bearer token. An empty key disables expansion.
    pub api_key: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Expander backed by a chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionExpander {
    client: reqwest::Client,
    settings: ChatExpanderSettings,
}

impl ChatCompletionExpander {
    /// Creates an expander with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ExpanderError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(settings: ChatExpanderSettings) -> Result<Self, ExpanderError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| ExpanderError::Transport(err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.api_base.trim_end_matches('/')
        )
    }

    /// Builds the chat completion payload for `seeds`.
    pub(crate) fn request_body(
        &self,
        seeds: &[String],
    ) -> Result<serde_json::Value, ExpanderError> {
        let topics = serde_json::to_string(seeds)
            .map_err(|err| ExpanderError::MalformedResponse(err.to_string()))?;
        Ok(serde_json::json!({
            "model": self.settings.model.trim_start_matches("openai/"),
            "messages": [
                {"role": "system", "content": EXPANSION_PROMPT},
                {"role": "user", "content": format!("Topics: {topics}")},
            ],
            "temperature": self.settings.temperature,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ExpansionPayload {
    expanded: Vec<ExpansionEntry>,
}

#[derive(Debug, Deserialize)]
struct ExpansionEntry {
    original: String,
    keywords: Vec<String>,
}

/// Parses the model's answer into expansions aligned to `seeds`.
///
/// Markdown code fences around the JSON are ignored.
///
/// # Errors
///
/// Returns [`ExpanderError::MalformedResponse`] when the answer is not the
/// expected JSON shape or names a seed that was not requested.
pub fn parse_expansion_content(
    seeds: &[String],
    content: &str,
) -> Result<ExpandedKeywords, ExpanderError> {
    let unfenced = content.replace("```json", "").replace("```", "");
    let payload: ExpansionPayload = serde_json::from_str(unfenced.trim())
        .map_err(|err| ExpanderError::MalformedResponse(err.to_string()))?;
    let mut expansions = Vec::with_capacity(payload.expanded.len());
    for entry in payload.expanded {
        if !seeds.contains(&entry.original) {
            return Err(ExpanderError::MalformedResponse(format!(
                "unexpected original keyword {:?}",
                entry.original
            )));
        }
        expansions.push(KeywordExpansion::new(entry.original, entry.keywords));
    }
    Ok(ExpandedKeywords::from_expansions(seeds, expansions))
}

#[async_trait]
impl KeywordExpander for ChatCompletionExpander {
    async fn expand(&self, seeds: &[String]) -> Result<ExpandedKeywords, ExpanderError> {
        if self.settings.api_key.trim().is_empty() {
            return Err(ExpanderError::Disabled);
        }
        let body = self.request_body(seeds)?;
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExpanderError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|err| {
            if err.is_timeout() {
                ExpanderError::Timeout
            } else {
                ExpanderError::MalformedResponse(err.to_string())
            }
        })?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ExpanderError::MalformedResponse("response has no choices".to_owned()))?;
        debug!(seeds = seeds.len(), "expansion response received");
        parse_expansion_content(seeds, &content)
    }
}

fn map_transport_error(err: reqwest::Error) -> ExpanderError {
    if err.is_timeout() {
        ExpanderError::Timeout
    } else {
        ExpanderError::Transport(err.to_string())
    }
}
