//! Finance agent: plan, execute one tool, analyze
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐ execute_tool ┌───────────┐ results ┌───────────┐
//! │ Planning │─────────────▶│ Executing │────────▶│ Analyzing │──┐
//! └──────────┘              └───────────┘         └───────────┘  │
//!      │ respond / parse failure                                 ▼
//!      └────────────────────────────────────────────────────▶ Done
//! ```
//!
//! `FinanceAgent::transition` is the single step function. There are no
//! back-edges, so a run visits at most four states. A planning reply that is
//! not a valid directive ends the run with `AgentOutcome::ParseFailure`
//! instead of being ignored; the caller decides what to show.
//!
//! # Example
//!
//! ```rust,ignore
//! let agent = FinanceAgent::new(llm, FinanceTools::new(db, analyzer).with_env_clients());
//! let run = agent.run(&AgentTask::new("Quais faturas estão vencidas?")).await?;
//! ```

mod directive;

pub use directive::{
    parse_directive, AgentResponse, Directive, DEFAULT_CONFIDENCE, FALLBACK_CONFIDENCE,
};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::ai::{parsing, LlmBackend, LlmClient};
use crate::error::Result;
use crate::prompts::{PromptId, PromptLibrary};
use crate::tools::{describe_tools, FinanceTools, ToolResult};

/// A request to the agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentTask {
    pub message: String,
    /// Free-form JSON context from the caller (screen, selected records, ...)
    pub context: Option<Value>,
    pub user_id: Option<String>,
}

impl AgentTask {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    fn context_json(&self) -> String {
        match &self.context {
            None | Some(Value::Null) => String::new(),
            Some(ctx) => serde_json::to_string_pretty(ctx).unwrap_or_default(),
        }
    }
}

/// A tool call decided during planning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub params: Value,
    pub reason: Option<String>,
}

/// Stage of the loop a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStage {
    Plan,
    Execute,
    Analyze,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AgentOutcome {
    Responded(AgentResponse),
    /// The model's reply could not be read as a directive
    ParseFailure {
        stage: AgentStage,
        /// Model output (truncated)
        raw: String,
        reason: String,
    },
}

/// Agent state machine
#[derive(Debug, Clone, PartialEq)]
pub enum AgentState {
    Planning,
    Executing { calls: Vec<ToolCall> },
    Analyzing { results: Vec<ToolResult> },
    Done(AgentOutcome),
}

impl AgentState {
    pub fn name(&self) -> &'static str {
        match self {
            AgentState::Planning => "planning",
            AgentState::Executing { .. } => "executing",
            AgentState::Analyzing { .. } => "analyzing",
            AgentState::Done(_) => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, AgentState::Done(_))
    }
}

/// Everything a completed run produced
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub outcome: AgentOutcome,
    /// Results of the tools executed, in call order
    pub tool_results: Vec<ToolResult>,
    /// Names of the states visited, ending with "done"
    pub states: Vec<&'static str>,
}

impl AgentRun {
    pub fn response(&self) -> Option<&AgentResponse> {
        match &self.outcome {
            AgentOutcome::Responded(r) => Some(r),
            AgentOutcome::ParseFailure { .. } => None,
        }
    }

    /// Names of the tools used
    pub fn tools_used(&self) -> Vec<String> {
        self.tool_results.iter().map(|r| r.tool.clone()).collect()
    }
}

/// The finance agent
#[derive(Clone)]
pub struct FinanceAgent {
    llm: LlmClient,
    tools: FinanceTools,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl FinanceAgent {
    pub fn new(llm: LlmClient, tools: FinanceTools) -> Self {
        Self::with_prompts(llm, tools, Arc::new(RwLock::new(PromptLibrary::new())))
    }

    /// Share a prompt library (and its override directory) with other callers
    pub fn with_prompts(
        llm: LlmClient,
        tools: FinanceTools,
        prompts: Arc<RwLock<PromptLibrary>>,
    ) -> Self {
        Self { llm, tools, prompts }
    }

    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    pub fn tools(&self) -> &FinanceTools {
        &self.tools
    }

    /// Drive a task from `Planning` to `Done`
    pub async fn run(&self, task: &AgentTask) -> Result<AgentRun> {
        info!(model = %self.llm.model(), "Finance agent run started");

        let mut state = AgentState::Planning;
        let mut states = Vec::new();
        let mut tool_results = Vec::new();

        loop {
            states.push(state.name());
            if let AgentState::Analyzing { results } = &state {
                tool_results = results.clone();
            }
            if let AgentState::Done(outcome) = state {
                info!(
                    states = ?states,
                    tools = tool_results.len(),
                    "Finance agent run finished"
                );
                return Ok(AgentRun {
                    outcome,
                    tool_results,
                    states,
                });
            }
            state = self.transition(state, task).await?;
        }
    }

    /// Advance the state machine by one step
    ///
    /// LLM transport errors propagate; malformed model output does not.
    pub async fn transition(&self, state: AgentState, task: &AgentTask) -> Result<AgentState> {
        match state {
            AgentState::Planning => self.plan(task).await,
            AgentState::Executing { calls } => Ok(self.execute(calls).await),
            AgentState::Analyzing { results } => self.analyze(task, &results).await,
            done @ AgentState::Done(_) => Ok(done),
        }
    }

    async fn plan(&self, task: &AgentTask) -> Result<AgentState> {
        let tool_list = describe_tools(&self.tools.specs());
        let today = self.tools.today().to_string();
        let context = task.context_json();

        let (system, user) = {
            let mut vars = HashMap::new();
            vars.insert("ferramentas", tool_list.as_str());
            vars.insert("data_atual", today.as_str());
            vars.insert("tarefa", task.message.as_str());
            vars.insert("contexto", context.as_str());
            self.render(PromptId::FinanceAgentPlan, &vars)?
        };

        let raw = self.llm.complete(Some(&system), &user).await?;

        match parse_directive(&raw) {
            Ok(Directive::ExecuteTool {
                tool,
                params,
                reason,
            }) => {
                debug!(tool = %tool, reason = ?reason, "Plan: execute tool");
                Ok(AgentState::Executing {
                    calls: vec![ToolCall {
                        tool,
                        params,
                        reason,
                    }],
                })
            }
            Ok(Directive::Respond { data, confidence }) => {
                debug!(confidence, "Plan: respond directly");
                Ok(AgentState::Done(AgentOutcome::Responded(AgentResponse {
                    data,
                    confidence,
                })))
            }
            Err(e) => {
                warn!(error = %e, "Plan reply is not a directive");
                Ok(AgentState::Done(AgentOutcome::ParseFailure {
                    stage: AgentStage::Plan,
                    raw: parsing::truncate(&raw),
                    reason: e.to_string(),
                }))
            }
        }
    }

    async fn execute(&self, calls: Vec<ToolCall>) -> AgentState {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let result = self.tools.execute(&call.tool, &call.params).await;
            debug!(tool = %call.tool, success = result.success, "Tool executed");
            results.push(result);
        }
        AgentState::Analyzing { results }
    }

    async fn analyze(&self, task: &AgentTask, results: &[ToolResult]) -> Result<AgentState> {
        let results_json = serde_json::to_string_pretty(results)?;
        let context = task.context_json();

        let (system, user) = {
            let mut vars = HashMap::new();
            vars.insert("tarefa", task.message.as_str());
            vars.insert("contexto", context.as_str());
            vars.insert("resultados", results_json.as_str());
            self.render(PromptId::FinanceAgentAnalyze, &vars)?
        };

        let raw = self.llm.complete(Some(&system), &user).await?;

        let response = match parse_directive(&raw) {
            Ok(Directive::Respond { data, confidence }) => AgentResponse { data, confidence },
            Ok(Directive::ExecuteTool { tool, .. }) => {
                // Only one tool round per run
                debug!(tool = %tool, "Ignoring tool request during analysis");
                AgentResponse::from_text(&raw)
            }
            Err(_) => AgentResponse::from_text(&raw),
        };

        Ok(AgentState::Done(AgentOutcome::Responded(response)))
    }

    /// Render (system, user) for a prompt without holding the lock across awaits
    fn render(&self, id: PromptId, vars: &HashMap<&str, &str>) -> Result<(String, String)> {
        let mut prompts = self.prompts.write().unwrap();
        let prompt = prompts.get(id)?;
        Ok((prompt.render_system(vars), prompt.render_user(vars)))
    }
}
