//! Anthropic Messages API backend
//!
//! # Configuration
//!
//! Environment variables:
//! - `ANTHROPIC_API_KEY`: API key (required)
//! - `ANTHROPIC_MODEL`: Model to use (default: `claude-3-5-sonnet-latest`)
//! - `ANTHROPIC_BASE_URL`: API base URL (default: `https://api.anthropic.com`)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::LlmBackend;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API request
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Message in conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String, // "user", "assistant"
    pub content: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: text.into(),
        }
    }
}

/// Content block in a response
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    /// Tool use, thinking and any future block kinds
    #[serde(other)]
    Other,
}

/// Anthropic Messages API response
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    pub stop_reason: Option<String>, // "end_turn", "max_tokens"
    pub usage: Option<Usage>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl MessagesResponse {
    /// Concatenated text blocks, None when the reply has no text
    pub fn text(&self) -> Option<String> {
        let texts: Vec<_> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }
}

/// Anthropic Messages API backend
#[derive(Clone)]
pub struct AnthropicBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    max_tokens: u32,
}

impl AnthropicBackend {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            max_tokens: 2048,
        }
    }

    /// Create from `ANTHROPIC_*` environment variables
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").ok()?;
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Some(Self::new(&base_url, &model, &api_key))
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Send a messages request
    pub async fn messages(
        &self,
        system: Option<&str>,
        messages: Vec<Message>,
    ) -> Result<MessagesResponse> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages,
            system: system.map(String::from),
            temperature: Some(0.2),
        };

        debug!(model = %self.model, "Sending Anthropic messages request");

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("Anthropic API error ({}): {}", status, body)));
        }

        let messages_response: MessagesResponse = response.json().await?;

        debug!(
            stop_reason = ?messages_response.stop_reason,
            output_tokens = messages_response.usage.as_ref().map(|u| u.output_tokens),
            "Received Anthropic response"
        );

        Ok(messages_response)
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let response = self.messages(system, vec![Message::user(prompt)]).await?;
        response
            .text()
            .ok_or_else(|| Error::Llm("No text in Anthropic response".into()))
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/v1/models", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
