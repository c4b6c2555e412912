//! OpenAI-compatible chat completions backend.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::io::config::OpenAiSettings;
use crate::io::generator::Generator;
use crate::io::prompt::PROMPT_GENERATOR_SYSTEM_PROMPT;

/// Everything the backend needs, including the credential.
///
/// The API key is supplied by the caller; this type never reads the
/// environment.
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub settings: OpenAiSettings,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("settings", &self.settings)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generator backed by `POST {base_url}/chat/completions`.
pub struct OpenAiGenerator {
    settings: OpenAiSettings,
    api_key: String,
    system_prompt: String,
    endpoint: String,
    http_client: reqwest::blocking::Client,
}

impl OpenAiGenerator {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        Self::with_system_prompt(config, PROMPT_GENERATOR_SYSTEM_PROMPT)
    }

    pub fn with_system_prompt(config: OpenAiConfig, system_prompt: impl Into<String>) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!("api key must not be empty"));
        }
        if config.settings.base_url.trim().is_empty() {
            return Err(anyhow!("base_url must not be empty"));
        }

        let http_client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(config.settings.timeout_secs))
            .build()
            .context("build http client")?;

        Ok(Self {
            endpoint: chat_endpoint(&config.settings.base_url),
            settings: config.settings,
            api_key: config.api_key,
            system_prompt: system_prompt.into(),
            http_client,
        })
    }
}

impl Generator for OpenAiGenerator {
    #[instrument(skip_all, fields(model = %self.settings.model))]
    fn generate(&self, task: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: task,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        debug!(endpoint = %self.endpoint, "sending chat completion request");
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .context("send chat completion request")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), "chat completion request failed");
            return Err(anyhow!(
                "chat completion failed with status {}: {}",
                status,
                detail.trim()
            ));
        }

        let parsed: ChatResponse = response.json().context("parse chat completion response")?;
        extract_content(parsed)
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim().trim_end_matches('/'))
}

fn extract_content(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("chat completion returned no choices"))?
        .message
        .content
        .unwrap_or_default();
    let content = content.trim();
    if content.is_empty() {
        return Err(anyhow!("chat completion returned empty content"));
    }
    Ok(content.to_string())
}
