//! Pluggable LLM backend abstraction
//!
//! The finance agent needs exactly one capability from a model: given a
//! system prompt and a user prompt, return text. This module hides which
//! provider answers.
//!
//! # Architecture
//!
//! - `LlmBackend` trait: the interface every provider implements
//! - `LlmClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `AnthropicBackend`, `OpenAIBackend`, `MockBackend`
//!
//! Clients are constructed once by the caller (CLI command, server start-up)
//! and passed down explicitly. There are no process-wide singletons.
//!
//! # Usage
//!
//! ```rust,ignore
//! let llm = LlmClient::from_env().ok_or_else(|| anyhow!("no LLM configured"))?;
//! let reply = llm.complete(Some("Você é um analista financeiro."), "Resuma o mês").await?;
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `LLM_PROVIDER`: anthropic, openai or mock. Default: anthropic
//! - `ANTHROPIC_API_KEY` (required for anthropic), `ANTHROPIC_MODEL`, `ANTHROPIC_BASE_URL`
//! - `OPENAI_API_KEY` (required for openai), `OPENAI_MODEL`, `OPENAI_BASE_URL`

mod anthropic;
mod mock;
mod openai;
pub mod parsing;

pub use anthropic::AnthropicBackend;
pub use mock::{MockBackend, RecordedPrompt};
pub use openai::OpenAIBackend;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// Trait defining the interface for all LLM backends
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Single-turn completion: optional system prompt plus one user message
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String>;

    /// Check if the backend is reachable and accepts our credentials
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging and audit)
    fn model(&self) -> &str;

    /// Get the base URL (for logging)
    fn host(&self) -> &str;
}

/// Which provider a client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Anthropic,
    OpenAI,
    Mock,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::OpenAI => "openai",
            LlmProvider::Mock => "mock",
        }
    }
}

/// Concrete LLM client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum LlmClient {
    /// Anthropic Messages API
    Anthropic(AnthropicBackend),
    /// OpenAI Chat Completions API (or a compatible server)
    OpenAI(OpenAIBackend),
    /// Scripted backend for tests and offline development
    Mock(MockBackend),
}

impl LlmClient {
    /// Create an LLM client from environment variables
    ///
    /// Checks `LLM_PROVIDER` to determine which backend to use:
    /// - `anthropic` (default): requires `ANTHROPIC_API_KEY`
    /// - `openai`: requires `OPENAI_API_KEY`
    /// - `mock`: canned responses, no network
    ///
    /// Returns None if the selected provider is missing its API key.
    pub fn from_env() -> Option<Self> {
        let provider = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "anthropic".to_string());

        match provider.to_lowercase().as_str() {
            "anthropic" | "claude" => AnthropicBackend::from_env().map(LlmClient::Anthropic),
            "openai" | "openai_compatible" => OpenAIBackend::from_env().map(LlmClient::OpenAI),
            "mock" => Some(LlmClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(provider = %provider, "Unknown LLM_PROVIDER, falling back to anthropic");
                AnthropicBackend::from_env().map(LlmClient::Anthropic)
            }
        }
    }

    /// Create a mock client with scripted responses
    pub fn mock(responses: Vec<String>) -> Self {
        LlmClient::Mock(MockBackend::with_responses(responses))
    }

    pub fn provider(&self) -> LlmProvider {
        match self {
            LlmClient::Anthropic(_) => LlmProvider::Anthropic,
            LlmClient::OpenAI(_) => LlmProvider::OpenAI,
            LlmClient::Mock(_) => LlmProvider::Mock,
        }
    }
}

// Implement LlmBackend for LlmClient by delegating to the inner backend
#[async_trait]
impl LlmBackend for LlmClient {
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        match self {
            LlmClient::Anthropic(b) => b.complete(system, prompt).await,
            LlmClient::OpenAI(b) => b.complete(system, prompt).await,
            LlmClient::Mock(b) => b.complete(system, prompt).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            LlmClient::Anthropic(b) => b.health_check().await,
            LlmClient::OpenAI(b) => b.health_check().await,
            LlmClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            LlmClient::Anthropic(b) => b.model(),
            LlmClient::OpenAI(b) => b.model(),
            LlmClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            LlmClient::Anthropic(b) => b.host(),
            LlmClient::OpenAI(b) => b.host(),
            LlmClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_client_mock() {
        let client = LlmClient::mock(vec![]);
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
        assert_eq!(client.provider(), LlmProvider::Mock);
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = LlmClient::mock(vec![]);
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_client_delegates_complete() {
        let client = LlmClient::mock(vec!["olá".to_string()]);
        let reply = client.complete(None, "oi").await.unwrap();
        assert_eq!(reply, "olá");
    }
}
