//! OpenAI Chat Completions backend
//!
//! Also works with any server exposing `/v1/chat/completions` (vLLM, LocalAI,
//! Azure-style gateways) by pointing `OPENAI_BASE_URL` at it.
//!
//! # Configuration
//!
//! Environment variables:
//! - `OPENAI_API_KEY`: API key (required)
//! - `OPENAI_MODEL`: Model name (default: gpt-4o-mini)
//! - `OPENAI_BASE_URL`: API base URL (default: https://api.openai.com)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::LlmBackend;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI Chat Completions backend
#[derive(Clone)]
pub struct OpenAIBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAIBackend {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Create from `OPENAI_*` environment variables
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Some(Self::new(&base_url, &model, &api_key))
    }

    fn build_messages(system: Option<&str>, prompt: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage::new("system", system));
        }
        messages.push(ChatMessage::new("user", prompt));
        messages
    }
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: Self::build_messages(system, prompt),
            temperature: Some(0.2),
            stream: false,
        };

        debug!(model = %self.model, "Sending OpenAI chat completion request");

        let response = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("OpenAI API error ({}): {}", status, body)));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Llm("No content in OpenAI response".into()))
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&self.api_key)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_new_trims_trailing_slash() {
        let backend = OpenAIBackend::new("http://localhost:8000/", "gpt-test", "sk-test");
        assert_eq!(backend.host(), "http://localhost:8000");
        assert_eq!(backend.model(), "gpt-test");
    }

    #[test]
    fn test_system_prompt_becomes_first_message() {
        let messages = OpenAIBackend::build_messages(Some("sistema"), "pergunta");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "pergunta");

        let messages = OpenAIBackend::build_messages(None, "pergunta");
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_response_deserialization_null_content() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
        )
        .unwrap();
        assert!(response.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let backend = OpenAIBackend::new("http://localhost:99999", "gpt-test", "sk-test");
        assert!(!backend.health_check().await);
    }
}
