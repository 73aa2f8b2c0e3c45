//! Finance agent handler

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::{get_user_id, AppState};
use opme_core::{AgentOutcome, AgentTask};

/// Reply shown to the user whenever the agent could not answer
pub const FALLBACK_REPLY: &str =
    "Desculpe, não consegui processar sua solicitação agora. Tente novamente em instantes.";

/// Maximum length of a message to the agent
const MAX_MESSAGE_LEN: usize = 4000;

/// Request body for POST /api/agent
#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    pub mensagem: String,
    pub usuario_id: Option<String>,
    pub contexto: Option<Value>,
}

/// Successful agent reply
#[derive(Debug, Serialize)]
pub struct AgentReply {
    pub success: bool,
    pub resposta: String,
    pub ferramentas_usadas: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dados_estruturados: Option<Value>,
}

/// Failure reply; always carries a user-facing fallback
pub struct AgentFailure {
    status: StatusCode,
    error: String,
}

impl AgentFailure {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }
}

impl IntoResponse for AgentFailure {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.error,
            "resposta": FALLBACK_REPLY,
        }));
        (self.status, body).into_response()
    }
}

/// POST /api/agent - Run the finance agent on a user message
pub async fn run_agent(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AgentRequest>,
) -> Result<Json<AgentReply>, AgentFailure> {
    let user = get_user_id(&headers);

    let message = body.mensagem.trim();
    if message.is_empty() {
        return Err(AgentFailure::new(
            StatusCode::BAD_REQUEST,
            "mensagem is required",
        ));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(AgentFailure::new(
            StatusCode::BAD_REQUEST,
            "mensagem is too long",
        ));
    }

    let agent = state.agent().ok_or_else(|| {
        AgentFailure::new(StatusCode::SERVICE_UNAVAILABLE, "LLM backend not configured")
    })?;

    let task = AgentTask {
        message: message.to_string(),
        context: body.contexto,
        user_id: body.usuario_id,
    };

    let run = agent.run(&task).await.map_err(|e| {
        error!(error = %e, "Finance agent run failed");
        AgentFailure::new(StatusCode::INTERNAL_SERVER_ERROR, "Agent execution failed")
    })?;

    let tools = run.tools_used();
    if let Err(e) = state.db.log_audit(
        task.user_id.as_deref().unwrap_or(user.as_str()),
        "agent",
        Some("agent"),
        None,
        Some(&format!("tools={:?}", tools)),
    ) {
        warn!(error = %e, "Failed to audit agent run");
    }

    match run.outcome {
        AgentOutcome::Responded(response) => {
            let resposta = response
                .summary()
                .map(String::from)
                .unwrap_or_else(|| response.data.to_string());
            let structured = response
                .data
                .as_object()
                .map_or(true, |o| o.keys().any(|k| k != "resumo"));

            Ok(Json(AgentReply {
                success: true,
                resposta,
                ferramentas_usadas: tools,
                dados_estruturados: structured.then_some(response.data),
            }))
        }
        AgentOutcome::ParseFailure { stage, reason, .. } => {
            warn!(?stage, reason = %reason, "Agent model output could not be parsed");
            Err(AgentFailure::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Model response could not be parsed",
            ))
        }
    }
}
