//! OPME Finance Core Library
//!
//! Shared functionality for the OPME distributor's finance service:
//! - Database access and migrations (ledger, bank statements, invoices, alerts)
//! - Financial analytics: forecasting, anomaly detection, smart alerts, budgets
//! - Pluggable LLM backends (Anthropic, OpenAI, mock)
//! - Finance agent (plan, execute one tool, analyze)
//! - Agent tools and the external sync/registry clients they call
//! - Prompt library for customizable agent prompts
//! - CSV import for accounts and bank statements

pub mod agent;
pub mod ai;
pub mod analytics;
pub mod db;
pub mod error;
pub mod import;
pub mod integrations;
pub mod models;
pub mod prompts;
pub mod tools;

/// Test utilities including the mock API server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use agent::{AgentOutcome, AgentResponse, AgentRun, AgentState, AgentTask, FinanceAgent};
pub use ai::{LlmBackend, LlmClient, LlmProvider, MockBackend};
pub use analytics::{AnalyticsConfig, FinancialAnalyzer, FinancialSnapshot};
pub use db::{AuditEntry, Database, TransactionQuery};
pub use error::{Error, Result};
pub use import::ImportSummary;
pub use integrations::{RegistryClient, SyncClient};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use tools::{FinanceTools, ToolResult};
