//! Mock backend for testing
//!
//! Replays scripted responses in order and records every prompt it receives.
//! When the script runs out it answers with a plain respond directive, which
//! keeps `LLM_PROVIDER=mock` usable for local development.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::LlmBackend;

const FALLBACK_RESPONSE: &str = r#"{"action":"respond","data":{"resumo":"Resposta simulada (LLM_PROVIDER=mock)."},"confidence":0.5}"#;

/// A prompt the mock received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPrompt {
    pub system: Option<String>,
    pub prompt: String,
}

/// Scripted LLM backend
///
/// Clones share the same script and prompt log.
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    responses: Arc<Mutex<VecDeque<Result<String>>>>,
    prompts: Arc<Mutex<Vec<RecordedPrompt>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a healthy mock with an empty script
    pub fn new() -> Self {
        Self {
            healthy: true,
            responses: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that replays `responses` in order
    pub fn with_responses(responses: Vec<String>) -> Self {
        let mock = Self::new();
        for response in responses {
            mock.push_response(response);
        }
        mock
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Queue a successful response
    pub fn push_response(&self, response: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(response.into()));
    }

    /// Queue a failure (simulates an upstream API error)
    pub fn push_error(&self, message: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(Error::Llm(message.into())));
    }

    /// Prompts received so far, in order
    pub fn prompts(&self) -> Vec<RecordedPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(RecordedPrompt {
            system: system.map(String::from),
            prompt: prompt.to_string(),
        });

        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(FALLBACK_RESPONSE.to_string()))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
