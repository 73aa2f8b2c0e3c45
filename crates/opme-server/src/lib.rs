//! OPME Finance Web Server
//!
//! Axum-based REST API exposing the finance agent and the analytics engine.
//!
//! Security features:
//! - Bearer API-key authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Input validation (period and pagination limits)
//! - Audit logging for agent and alert access
//! - Sanitized error responses

use std::sync::{Arc, RwLock};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use opme_core::ai::LlmBackend;
use opme_core::{
    Database, FinanceAgent, FinanceTools, FinancialAnalyzer, LlmClient, PromptLibrary,
    RegistryClient, SyncClient,
};

mod handlers;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 500;

/// Maximum months of history an analytics request may aggregate
pub const MAX_HISTORY_MONTHS: u32 = 36;

/// Maximum forecast horizon in days
pub const MAX_FORECAST_DAYS: u32 = 365;

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// API keys accepted as "Bearer <key>" in the Authorization header
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

impl ServerConfig {
    /// Read `OPME_API_KEYS` and `OPME_ALLOWED_ORIGINS` (comma-separated)
    pub fn from_env() -> Self {
        Self {
            api_keys: parse_list(&std::env::var("OPME_API_KEYS").unwrap_or_default()),
            allowed_origins: parse_list(
                &std::env::var("OPME_ALLOWED_ORIGINS").unwrap_or_default(),
            ),
            ..Default::default()
        }
    }
}

/// Split a comma-separated list, dropping empty entries
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// LLM client for the agent endpoint (None = agent disabled)
    pub llm: Option<LlmClient>,
    pub analyzer: FinancialAnalyzer,
    pub prompts: Arc<RwLock<PromptLibrary>>,
    pub sync: Option<SyncClient>,
    pub registry: Option<RegistryClient>,
}

impl AppState {
    /// State with clients taken from the environment
    pub fn from_env(db: Database, config: ServerConfig) -> Self {
        let llm = LlmClient::from_env();
        match &llm {
            Some(client) => info!(
                "LLM backend configured: {} ({})",
                client.provider().as_str(),
                client.model()
            ),
            None => info!("ℹ️  LLM backend not configured (set ANTHROPIC_API_KEY or LLM_PROVIDER to enable the agent)"),
        }

        let analyzer = match opme_core::AnalyticsConfig::load() {
            Ok(config) => FinancialAnalyzer::new(config),
            Err(e) => {
                warn!("Failed to load analytics config, using defaults: {}", e);
                FinancialAnalyzer::default()
            }
        };

        Self {
            db,
            config,
            llm,
            analyzer,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
            sync: SyncClient::from_env(),
            registry: RegistryClient::from_env(),
        }
    }

    /// State without external clients (tests, offline use)
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self {
            db,
            config,
            llm: None,
            analyzer: FinancialAnalyzer::default(),
            prompts: Arc::new(RwLock::new(PromptLibrary::embedded_only())),
            sync: None,
            registry: None,
        }
    }

    pub fn with_llm(mut self, llm: LlmClient) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Build an agent over this state's database and clients
    pub fn agent(&self) -> Option<FinanceAgent> {
        let llm = self.llm.clone()?;
        let tools = FinanceTools::new(self.db.clone(), self.analyzer.clone())
            .with_sync(self.sync.clone())
            .with_registry(self.registry.clone());
        Some(FinanceAgent::with_prompts(llm, tools, self.prompts.clone()))
    }
}

/// Authentication middleware - validates the bearer API key
///
/// Keys are compared in constant time.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        info!(user = "api-key", path = %request.uri().path(), "Authenticated via API key");
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key against the configured keys using constant-time comparison
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();
    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Identify the caller for audit logging
/// Returns "api-key" for bearer auth, or "local-dev" for unauthenticated
pub fn get_user_id(headers: &axum::http::HeaderMap) -> String {
    if headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .is_some()
    {
        return "api-key".to_string();
    }

    "local-dev".to_string()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router with clients from the environment
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    create_router_with_state(AppState::from_env(db, config))
}

/// Create the application router around a prepared state
pub fn create_router_with_state(state: AppState) -> Router {
    let config = state.config.clone();
    let state = Arc::new(state);

    let protected = Router::new()
        // Agent
        .route("/agent", post(handlers::run_agent))
        // Analytics
        .route("/forecast", get(handlers::get_forecast))
        .route("/anomalies", get(handlers::get_anomalies))
        .route("/smart-alerts", get(handlers::get_smart_alerts))
        .route("/budget/compare", post(handlers::compare_budget))
        // Persisted alerts
        .route("/alerts", get(handlers::list_alerts))
        .route("/alerts/:id/read", post(handlers::mark_alert_read))
        // Audit log
        .route("/audit", get(handlers::list_audit_log))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .merge(protected);

    // Restrictive default: only allow same-origin
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    if !config.allowed_origins.is_empty() {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    } else if config.api_keys.is_empty() {
        warn!("⚠️  No API keys configured (OPME_API_KEYS); every protected request will be rejected");
    }

    let state = AppState::from_env(db, config);
    check_llm_connection(state.llm.as_ref()).await;

    let app = create_router_with_state(state);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log LLM backend connection status
async fn check_llm_connection(llm: Option<&LlmClient>) {
    let Some(client) = llm else {
        return;
    };
    if client.health_check().await {
        info!("✅ LLM backend reachable: {} ({})", client.host(), client.model());
    } else {
        warn!(
            "⚠️  LLM backend configured but not responding: {} ({})",
            client.host(),
            client.model()
        );
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unavailable(msg: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        match err.downcast_ref::<opme_core::Error>() {
            Some(opme_core::Error::NotFound(msg)) => Self::not_found(msg),
            Some(opme_core::Error::InvalidData(msg)) => Self::bad_request(msg),
            _ => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                // Keep full error for logging
                internal: Some(err),
            },
        }
    }
}

#[cfg(test)]
mod tests;
