//! Test utilities for opme-core
//!
//! `MockApiServer` is a local HTTP server that speaks every external wire
//! format the core talks to: the Anthropic Messages API, OpenAI Chat
//! Completions, the bank-sync function and the InfoSimples registry.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Form, Json, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// Bearer key the mock sync endpoint accepts
pub const MOCK_SYNC_KEY: &str = "secret";

/// Registration number the mock registry knows about
pub const MOCK_REGISTRATION: &str = "10349000123";

const PLAN_REPLY: &str =
    r#"{"action":"respond","data":{"resumo":"Resposta simulada do servidor."},"confidence":0.9}"#;
const ANALYZE_REPLY: &str =
    r#"{"action":"respond","data":{"resumo":"Análise simulada dos resultados."},"confidence":0.8}"#;

#[derive(Clone, Default)]
struct MockState {
    replies: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockState {
    /// Next scripted reply, or a canned directive matching the prompt stage
    fn reply_for(&self, prompt: &str) -> String {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        if prompt.contains("Resultados das ferramentas") {
            ANALYZE_REPLY.to_string()
        } else {
            PLAN_REPLY.to_string()
        }
    }
}

/// Mock server for the LLM and integration APIs
pub struct MockApiServer {
    addr: SocketAddr,
    state: MockState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockApiServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        Self::start_with_replies(Vec::new()).await
    }

    /// Start with scripted LLM replies, served in order to either LLM endpoint
    pub async fn start_with_replies(replies: Vec<String>) -> Self {
        let state = MockState {
            replies: Arc::new(Mutex::new(replies.into())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/v1/messages", post(handle_messages))
            .route("/v1/chat/completions", post(handle_chat_completions))
            .route("/v1/models", get(handle_models))
            .route("/sync", post(handle_sync))
            .route("/api/v2/consultas/anvisa/produtos", post(handle_registry))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// User prompts received by the LLM endpoints, in order
    pub fn prompts(&self) -> Vec<String> {
        self.state.prompts.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Anthropic Messages endpoint
async fn handle_messages(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> impl IntoResponse {
    if !headers.contains_key("x-api-key") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"type": "error", "error": {"type": "authentication_error"}})),
        );
    }

    let prompt = request["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default();
    let text = state.reply_for(prompt);

    (
        StatusCode::OK,
        Json(json!({
            "id": "msg_mock",
            "type": "message",
            "role": "assistant",
            "model": request["model"],
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 20}
        })),
    )
}

/// OpenAI Chat Completions endpoint
async fn handle_chat_completions(
    State(state): State<MockState>,
    Json(request): Json<Value>,
) -> Json<Value> {
    let prompt = request["messages"]
        .as_array()
        .and_then(|m| m.iter().rev().find(|m| m["role"] == "user"))
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default();
    let text = state.reply_for(prompt);

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": request["model"],
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    }))
}

/// Model list (health check for both LLM APIs)
async fn handle_models() -> Json<Value> {
    Json(json!({"data": [{"id": "mock-model", "object": "model"}]}))
}

/// Bank-sync function
async fn handle_sync(headers: HeaderMap) -> impl IntoResponse {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", MOCK_SYNC_KEY))
        .unwrap_or(false);

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "error": "unauthorized"})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({"success": true, "importadas": 3, "duplicadas": 1})),
    )
}

/// InfoSimples ANVISA product lookup
async fn handle_registry(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    if form.get("token").map(|t| t.is_empty()).unwrap_or(true) {
        return Json(json!({"code": 601, "code_message": "Token inválido", "data": []}));
    }

    if form.get("registro").map(String::as_str) == Some(MOCK_REGISTRATION) {
        Json(json!({
            "code": 200,
            "code_message": "A requisição foi processada com sucesso.",
            "data": [{
                "registro": MOCK_REGISTRATION,
                "produto": "Stent coronário farmacológico",
                "empresa": "Cardio Implantes LTDA",
                "situacao": "Válido",
                "vencimento": "2030-06-30"
            }]
        }))
    } else {
        Json(json!({"code": 612, "code_message": "Nenhum resultado encontrado", "data": []}))
    }
}
