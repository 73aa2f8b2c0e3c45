//! HTTP clients for the external services the agent tools call
//!
//! - `SyncClient`: the bank-sync function that pulls new statement lines
//! - `RegistryClient`: InfoSimples lookups against the national medical
//!   device registry (ANVISA)
//!
//! Both are optional; a tool whose client is not configured reports a
//! failed `ToolResult` instead of erroring.
//!
//! # Configuration
//!
//! - `OPME_SYNC_URL`, `OPME_SYNC_KEY`: bank-sync endpoint and bearer key
//! - `INFOSIMPLES_TOKEN` (required for lookups), `INFOSIMPLES_BASE_URL`

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

const DEFAULT_REGISTRY_URL: &str = "https://api.infosimples.com";
const REGISTRY_PATH: &str = "/api/v2/consultas/anvisa/produtos";

/// Body posted to the bank-sync function
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// Client for the bank statement sync function
#[derive(Clone)]
pub struct SyncClient {
    http_client: Client,
    url: String,
    key: Option<String>,
}

impl SyncClient {
    pub fn new(url: &str, key: Option<&str>) -> Self {
        Self {
            http_client: Client::new(),
            url: url.to_string(),
            key: key.map(String::from),
        }
    }

    /// Create from `OPME_SYNC_URL` / `OPME_SYNC_KEY`
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("OPME_SYNC_URL").ok()?;
        let key = std::env::var("OPME_SYNC_KEY").ok();
        Some(Self::new(&url, key.as_deref()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Trigger a sync and return the function's JSON reply unchanged
    pub async fn sync(&self, request: &SyncRequest) -> Result<Value> {
        debug!(url = %self.url, "Requesting bank sync");

        let mut builder = self.http_client.post(&self.url).json(request);
        if let Some(ref key) = self.key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::External(format!("Bank sync failed ({}): {}", status, body)));
        }

        Ok(response.json().await?)
    }
}

/// What to look up in the product registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum RegistryQuery {
    /// ANVISA registration number
    Registration(String),
    /// Free-text product name
    ProductName(String),
}

impl RegistryQuery {
    fn param(&self) -> (&'static str, &str) {
        match self {
            RegistryQuery::Registration(r) => ("registro", r),
            RegistryQuery::ProductName(n) => ("nome", n),
        }
    }
}

/// InfoSimples response envelope
#[derive(Debug, Deserialize)]
struct RegistryEnvelope {
    code: i64,
    #[serde(default)]
    code_message: Option<String>,
    #[serde(default)]
    data: Vec<Value>,
}

/// Client for the InfoSimples product registry API
#[derive(Clone)]
pub struct RegistryClient {
    http_client: Client,
    base_url: String,
    token: String,
}

impl RegistryClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Create from `INFOSIMPLES_TOKEN` / `INFOSIMPLES_BASE_URL`
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("INFOSIMPLES_TOKEN").ok()?;
        let base_url = std::env::var("INFOSIMPLES_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_REGISTRY_URL.to_string());
        Some(Self::new(&base_url, &token))
    }

    /// Look up registry entries; an empty list means nothing matched
    pub async fn lookup(&self, query: &RegistryQuery) -> Result<Vec<Value>> {
        let (name, value) = query.param();
        debug!(param = name, "Querying product registry");

        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, REGISTRY_PATH))
            .form(&[("token", self.token.as_str()), (name, value)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::External(format!("Registry lookup failed ({}): {}", status, body)));
        }

        let envelope: RegistryEnvelope = response.json().await?;
        match envelope.code {
            200 => Ok(envelope.data),
            // "no results" in InfoSimples' code table
            612 => Ok(Vec::new()),
            code => Err(Error::External(format!(
                "Registry lookup failed (code {}): {}",
                code,
                envelope.code_message.unwrap_or_default()
            ))),
        }
    }
}
