//! Liveness handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppError, AppState};
use opme_core::ai::LlmBackend;

#[derive(Debug, Serialize)]
pub struct LlmStatus {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub llm: LlmStatus,
    pub sync_configured: bool,
    pub registry_configured: bool,
    pub unread_alerts: i64,
}

/// GET /api/health - Liveness and integration configuration (no auth)
pub async fn get_health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    let llm = match &state.llm {
        Some(client) => LlmStatus {
            configured: true,
            provider: Some(client.provider().as_str()),
            model: Some(client.model().to_string()),
        },
        None => LlmStatus {
            configured: false,
            provider: None,
            model: None,
        },
    };

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        llm,
        sync_configured: state.sync.is_some(),
        registry_configured: state.registry.is_some(),
        unread_alerts: state.db.count_unread_alerts()?,
    }))
}
