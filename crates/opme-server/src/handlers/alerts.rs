//! Persisted alert handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    Json,
};
use serde::Deserialize;

use crate::{get_user_id, AppError, AppState, SuccessResponse, MAX_PAGE_LIMIT};
use opme_core::models::StoredAlert;

/// Query parameters for listing alerts
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default = "default_alert_limit")]
    pub limit: i64,
}

fn default_alert_limit() -> i64 {
    100
}

/// GET /api/alerts - List alerts
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertQuery>,
    request: Request,
) -> Result<Json<Vec<StoredAlert>>, AppError> {
    let user = get_user_id(request.headers());
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);

    let alerts = state.db.list_alerts(params.unread_only, limit)?;

    // Audit log - read access
    state.db.log_audit(
        &user,
        "list",
        Some("alerta_financeiro"),
        None,
        Some(&format!(
            "unread_only={}, count={}",
            params.unread_only,
            alerts.len()
        )),
    )?;

    Ok(Json(alerts))
}

/// POST /api/alerts/:id/read - Mark an alert as read
pub async fn mark_alert_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = get_user_id(request.headers());

    state.db.mark_alert_read(id)?;

    state
        .db
        .log_audit(&user, "read", Some("alerta_financeiro"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
