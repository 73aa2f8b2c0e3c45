//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Local, Months, NaiveDate};
use http_body_util::BodyExt;
use opme_core::analytics::{AccountStatus, AccountType, AlertKind, AlertSeverity};
use opme_core::models::{AlertSource, NewAlert, NewFinancialAccount};
use opme_core::MockBackend;
use tower::ServiceExt;

fn open_config() -> ServerConfig {
    ServerConfig {
        require_auth: false,
        ..Default::default()
    }
}

fn setup_test_app() -> Router {
    create_router_with_state(AppState::new(Database::in_memory().unwrap(), open_config()))
}

fn setup_agent_app(db: Database, mock: MockBackend) -> Router {
    create_router_with_state(AppState::new(db, open_config()).with_llm(LlmClient::Mock(mock)))
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Day 10 of the month `back` months before the current one
fn months_ago(back: u32) -> NaiveDate {
    let today = Local::now().date_naive();
    let first = NaiveDate::from_ymd_opt(
        chrono::Datelike::year(&today),
        chrono::Datelike::month(&today),
        10,
    )
    .unwrap();
    first - Months::new(back)
}

fn account(
    description: &str,
    account_type: AccountType,
    status: AccountStatus,
    amount: f64,
    due_date: NaiveDate,
    category: &str,
) -> NewFinancialAccount {
    NewFinancialAccount {
        description: description.to_string(),
        account_type,
        status,
        amount,
        final_amount: None,
        due_date,
        payment_date: (status == AccountStatus::Paid).then_some(due_date),
        category: category.to_string(),
        client_id: None,
    }
}

/// Six months of paid history plus an overdue receivable
fn seeded_db() -> Database {
    let db = Database::in_memory().unwrap();
    for back in 1..=6 {
        let date = months_ago(back);
        db.insert_financial_account(&account(
            "Faturamento",
            AccountType::Receivable,
            AccountStatus::Paid,
            50_000.0,
            date,
            "vendas",
        ))
        .unwrap();
        db.insert_financial_account(&account(
            "Fornecedores",
            AccountType::Payable,
            AccountStatus::Paid,
            30_000.0,
            date,
            "fornecedores",
        ))
        .unwrap();
    }
    db.insert_financial_account(&account(
        "Fatura atrasada",
        AccountType::Receivable,
        AccountStatus::Overdue,
        12_000.0,
        months_ago(1),
        "vendas",
    ))
    .unwrap();
    db
}

fn sample_alert(title: &str) -> NewAlert {
    NewAlert {
        alert_type: AlertKind::Warning,
        severity: AlertSeverity::High,
        title: title.to_string(),
        message: "Verificar".to_string(),
        category: "receivables".to_string(),
        metadata: None,
        source: AlertSource::Agent,
    }
}

// ========== Health & Auth Tests ==========

#[tokio::test]
async fn test_health() {
    let app = setup_test_app();

    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["llm"]["configured"], false);
    assert_eq!(json["unread_alerts"], 0);
}

#[tokio::test]
async fn test_auth_required_by_default() {
    let config = ServerConfig {
        api_keys: vec!["test-key".to_string()],
        ..Default::default()
    };
    let app = create_router_with_state(AppState::new(Database::in_memory().unwrap(), config));

    let response = app.clone().oneshot(get("/api/alerts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/alerts")
                .header("authorization", "Bearer wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/alerts")
                .header("authorization", "Bearer test-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Health stays public
    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_validate_api_key() {
    let keys = vec!["alpha".to_string(), "beta-key".to_string()];
    assert!(validate_api_key("alpha", &keys));
    assert!(validate_api_key("beta-key", &keys));
    assert!(!validate_api_key("alph", &keys));
    assert!(!validate_api_key("", &keys));
    assert!(!validate_api_key("alpha", &[]));
}

#[test]
fn test_parse_list() {
    assert_eq!(parse_list(" a, b ,,c"), vec!["a", "b", "c"]);
    assert!(parse_list("").is_empty());
}

// ========== Analytics Tests ==========

#[tokio::test]
async fn test_forecast_empty_history() {
    let app = setup_test_app();

    let response = app.oneshot(get("/api/forecast")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert!(json["periods"].as_array().unwrap().is_empty());
    assert_eq!(json["accuracy"], 0.0);
    assert_eq!(json["data_points"], 0);
}

#[tokio::test]
async fn test_forecast_with_history() {
    let app = create_router_with_state(AppState::new(seeded_db(), open_config()));

    let response = app
        .oneshot(get("/api/forecast?days=60&months=12"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let periods = json["periods"].as_array().unwrap();
    assert_eq!(periods.len(), 2);
    assert_eq!(json["data_points"], 6);
    assert_eq!(periods[0]["revenue"]["predicted"], 50_000.0);
    assert_eq!(periods[0]["cash_flow"]["predicted"], 20_000.0);
}

#[tokio::test]
async fn test_forecast_rejects_bad_query() {
    let app = setup_test_app();

    let response = app.oneshot(get("/api/forecast?days=abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_anomalies_stable_history() {
    let app = create_router_with_state(AppState::new(seeded_db(), open_config()));

    let response = app.oneshot(get("/api/anomalies?months=12")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_smart_alerts_include_overdue_receivables() {
    let app = create_router_with_state(AppState::new(seeded_db(), open_config()));

    let response = app.oneshot(get("/api/smart-alerts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let alerts = json.as_array().unwrap();
    let receivables = alerts
        .iter()
        .find(|a| a["category"] == "receivables")
        .expect("receivables alert");
    assert_eq!(receivables["severity"], "medium");
    assert_eq!(receivables["metadata"]["total"], 12_000.0);
}

#[tokio::test]
async fn test_budget_compare() {
    let db = Database::in_memory().unwrap();
    let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
    db.insert_financial_account(&account(
        "Aluguel",
        AccountType::Payable,
        AccountStatus::Paid,
        1_050.0,
        date,
        "aluguel",
    ))
    .unwrap();
    db.insert_financial_account(&account(
        "Marketing",
        AccountType::Payable,
        AccountStatus::Paid,
        1_200.0,
        date,
        "marketing",
    ))
    .unwrap();
    let app = create_router_with_state(AppState::new(db, open_config()));

    let body = serde_json::json!({
        "budget": [
            {"category": "aluguel", "amount": 1000.0},
            {"category": "marketing", "amount": 1000.0}
        ],
        "start_date": "2026-03-01",
        "end_date": "2026-03-31"
    });
    let response = app
        .oneshot(post_json("/api/budget/compare", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let categories = json["categories"].as_array().unwrap();
    assert_eq!(categories[0]["status"], "on_track");
    assert_eq!(categories[1]["status"], "over");
    assert_eq!(categories[1]["variance"], 200.0);
    assert_eq!(json["summary"]["categories_over"], 1);
}

#[tokio::test]
async fn test_budget_compare_rejects_inverted_period() {
    let app = setup_test_app();

    let body = serde_json::json!({
        "budget": [],
        "start_date": "2026-03-31",
        "end_date": "2026-03-01"
    });
    let response = app
        .oneshot(post_json("/api/budget/compare", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Alert Feed Tests ==========

#[tokio::test]
async fn test_list_and_read_alerts() {
    let db = Database::in_memory().unwrap();
    let first = db.insert_alert(&sample_alert("Fatura vencida")).unwrap();
    db.insert_alert(&sample_alert("Outra fatura")).unwrap();
    let app = create_router_with_state(AppState::new(db.clone(), open_config()));

    let response = app.clone().oneshot(get("/api/alerts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await.as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/alerts/{}/read", first))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/api/alerts?unread_only=true"))
        .await
        .unwrap();
    let unread = get_body_json(response).await;
    assert_eq!(unread.as_array().unwrap().len(), 1);
    assert_eq!(unread[0]["title"], "Outra fatura");

    // Reads were audited
    let audit = db.list_audit_log(10).unwrap();
    assert!(audit
        .iter()
        .any(|e| e.action == "read" && e.entity_id == Some(first)));
}

#[tokio::test]
async fn test_mark_unknown_alert_not_found() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/alerts/9999/read")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_audit_log_endpoint() {
    let db = Database::in_memory().unwrap();
    db.log_audit("cli", "import_accounts", Some("conta_financeira"), None, None)
        .unwrap();
    let app = create_router_with_state(AppState::new(db, open_config()));

    let response = app.oneshot(get("/api/audit?limit=5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert!(json
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["action"] == "import_accounts"));
}

// ========== Agent Tests ==========

#[tokio::test]
async fn test_agent_without_llm() {
    let app = setup_test_app();

    let response = app
        .oneshot(post_json(
            "/api/agent",
            serde_json::json!({"mensagem": "Quais faturas estão vencidas?"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = get_body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["resposta"], handlers::FALLBACK_REPLY);
}

#[tokio::test]
async fn test_agent_rejects_empty_message() {
    let app = setup_agent_app(Database::in_memory().unwrap(), MockBackend::new());

    let response = app
        .oneshot(post_json("/api/agent", serde_json::json!({"mensagem": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_agent_message_length_limit() {
    let app = setup_agent_app(Database::in_memory().unwrap(), MockBackend::new());

    let at_limit = "a".repeat(4000);
    let response = app
        .clone()
        .oneshot(post_json("/api/agent", serde_json::json!({"mensagem": at_limit})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let over_limit = "a".repeat(4001);
    let response = app
        .oneshot(post_json("/api/agent", serde_json::json!({"mensagem": over_limit})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_agent_message_limit_counts_characters() {
    let app = setup_agent_app(Database::in_memory().unwrap(), MockBackend::new());

    // 3000 characters, 5000 bytes
    let accented = "ção".repeat(1000);
    let response = app
        .clone()
        .oneshot(post_json("/api/agent", serde_json::json!({"mensagem": accented})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let too_long = "é".repeat(4001);
    let response = app
        .oneshot(post_json("/api/agent", serde_json::json!({"mensagem": too_long})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_agent_runs_tool() {
    let mock = MockBackend::with_responses(vec![
        r#"{"action":"execute_tool","tool":"financial_overview","params":{}}"#.to_string(),
        r#"{"action":"respond","data":{"resumo":"Uma conta a receber vencida.","total_vencido":12000.0}}"#.to_string(),
    ]);
    let db = seeded_db();
    let app = setup_agent_app(db.clone(), mock);

    let response = app
        .oneshot(post_json(
            "/api/agent",
            serde_json::json!({
                "mensagem": "Resumo financeiro",
                "usuario_id": "user-42",
                "contexto": {"tela": "dashboard"}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["resposta"], "Uma conta a receber vencida.");
    assert_eq!(json["ferramentas_usadas"], serde_json::json!(["financial_overview"]));
    assert_eq!(json["dados_estruturados"]["total_vencido"], 12000.0);

    let audit = db.list_audit_log(10).unwrap();
    assert!(audit.iter().any(|e| e.user == "user-42" && e.action == "agent"));
}

#[tokio::test]
async fn test_agent_direct_answer_has_no_structured_data() {
    let mock = MockBackend::with_responses(vec![
        r#"{"action":"respond","data":{"resumo":"Olá! Como posso ajudar?"}}"#.to_string(),
    ]);
    let app = setup_agent_app(Database::in_memory().unwrap(), mock);

    let response = app
        .oneshot(post_json("/api/agent", serde_json::json!({"mensagem": "Oi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["resposta"], "Olá! Como posso ajudar?");
    assert_eq!(json["ferramentas_usadas"], serde_json::json!([]));
    assert!(json.get("dados_estruturados").is_none());
}

#[tokio::test]
async fn test_agent_unparsable_plan() {
    let mock = MockBackend::with_responses(vec!["não sei o que fazer".to_string()]);
    let app = setup_agent_app(Database::in_memory().unwrap(), mock);

    let response = app
        .oneshot(post_json("/api/agent", serde_json::json!({"mensagem": "???"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = get_body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["resposta"], handlers::FALLBACK_REPLY);
}

#[tokio::test]
async fn test_agent_llm_error_returns_fallback() {
    let mock = MockBackend::new();
    mock.push_error("upstream timeout");
    let app = setup_agent_app(Database::in_memory().unwrap(), mock);

    let response = app
        .oneshot(post_json(
            "/api/agent",
            serde_json::json!({"mensagem": "Resumo"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = get_body_json(response).await;
    assert_eq!(json["success"], false);
    // Internal details are not leaked
    assert_eq!(json["error"], "Agent execution failed");
}
