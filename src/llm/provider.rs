use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Ask the provider for a strict JSON object.
    pub json_response: bool,
    pub temperature: f32,
}

/// One request/response round trip to the model service.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct LlmRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct LlmResponse {
    choices: Vec<LlmChoice>,
}

#[derive(Deserialize)]
struct LlmChoice {
    message: LlmResponseMessage,
}

#[derive(Deserialize)]
struct LlmResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` endpoint (Evolution Foundation
/// Models, OpenAI, vLLM, ...).
pub struct OpenAiCompatibleProvider {
    http_client: Client,
    endpoint: String,
    api_key: String,
    max_tokens: u32,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(Error::MissingApiKey)?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout.max(1)))
            .build()?;

        let endpoint = if config.base_url.ends_with('/') {
            format!("{}chat/completions", config.base_url)
        } else {
            format!("{}/chat/completions", config.base_url)
        };

        Ok(Self {
            http_client,
            endpoint,
            api_key,
            max_tokens: config.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let body = LlmRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: self.max_tokens,
            temperature: request.temperature,
            response_format: request
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        debug!(model = %request.model, json = request.json_response, "Sending chat completion");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("API error ({}): {}", status, error_text)));
        }

        let llm_response: LlmResponse = response.json().await?;

        llm_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| Error::Provider("No choices in response".to_string()))
    }
}
