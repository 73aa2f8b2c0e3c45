//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use opme_core::analytics::{AccountStatus, AccountType, BudgetItem, BudgetStatus};
use opme_core::db::Database;
use opme_core::models::{AlertSource, NewFinancialAccount};
use opme_core::{AgentOutcome, FinancialAnalyzer, LlmClient};

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn paid_payable(category: &str, amount: f64, date: &str) -> NewFinancialAccount {
    let date = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
    NewFinancialAccount {
        description: format!("Pagamento {}", category),
        account_type: AccountType::Payable,
        status: AccountStatus::Paid,
        amount,
        final_amount: None,
        due_date: date,
        payment_date: Some(date),
        category: category.to_string(),
        client_id: None,
    }
}

// ========== Database Tests ==========

#[test]
fn test_open_db_unencrypted_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");

    commands::cmd_init(&path, true).unwrap();
    assert!(path.exists());

    let db = commands::open_db(&path, true).unwrap();
    assert!(commands::print_counts(&db).is_ok());

    // Schema is in place for direct access too
    let conn = rusqlite::Connection::open(&path).unwrap();
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'contas_financeiras'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}

// ========== Import Command Tests ==========

#[test]
fn test_cmd_import_accounts() {
    let db = setup_test_db();
    let csv = write_temp(
        "descricao;tipo;valor;data_vencimento;data_pagamento;categoria\n\
         Venda Hospital A;receber;15.000,00;10/01/2026;12/01/2026;vendas\n\
         Fornecedor B;pagar;4.500,00;20/01/2026;;fornecedores\n",
        ".csv",
    );

    commands::cmd_import_accounts(&db, csv.path()).unwrap();

    let accounts = db.list_financial_accounts().unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].status, AccountStatus::Paid);
    assert_eq!(accounts[1].status, AccountStatus::Pending);
}

#[test]
fn test_cmd_import_statement_skips_duplicates() {
    let db = setup_test_db();
    let csv = write_temp(
        "data,historico,valor\n05/01/2026,PIX RECEBIDO HOSPITAL,\"12.000,00\"\n06/01/2026,TARIFA,\"-35,00\"\n",
        ".csv",
    );

    commands::cmd_import_statement(&db, csv.path(), Some("Banco 001")).unwrap();
    commands::cmd_import_statement(&db, csv.path(), Some("Banco 001")).unwrap();

    let txs = db.search_bank_transactions(&Default::default()).unwrap();
    assert_eq!(txs.len(), 2);
}

#[test]
fn test_cmd_import_missing_file() {
    let db = setup_test_db();
    let result = commands::cmd_import_accounts(&db, std::path::Path::new("/nonexistent.csv"));
    assert!(result.is_err());
}

// ========== Analytics Command Tests ==========

#[test]
fn test_cmd_forecast_empty_db() {
    let db = setup_test_db();
    let analyzer = FinancialAnalyzer::default();
    assert!(commands::cmd_forecast(&db, &analyzer, 90, 12, false).is_ok());
    assert!(commands::cmd_forecast(&db, &analyzer, 90, 12, true).is_ok());
}

#[test]
fn test_cmd_anomalies_empty_db() {
    let db = setup_test_db();
    let analyzer = FinancialAnalyzer::default();
    assert!(commands::cmd_anomalies(&db, &analyzer, 12, false).is_ok());
}

#[test]
fn test_cmd_alerts_save() {
    let db = setup_test_db();
    let today = chrono::Local::now().date_naive();
    db.insert_financial_account(&NewFinancialAccount {
        description: "Fatura vencida".to_string(),
        account_type: AccountType::Receivable,
        status: AccountStatus::Overdue,
        amount: 8_000.0,
        final_amount: None,
        due_date: today - chrono::Duration::days(20),
        payment_date: None,
        category: "vendas".to_string(),
        client_id: None,
    })
    .unwrap();

    let analyzer = FinancialAnalyzer::default();
    commands::cmd_alerts(&db, &analyzer, 90, 12, false, false).unwrap();
    assert_eq!(db.count_unread_alerts().unwrap(), 0);

    commands::cmd_alerts(&db, &analyzer, 90, 12, true, false).unwrap();
    let feed = db.list_alerts(true, 50).unwrap();
    assert!(feed
        .iter()
        .any(|a| a.category == "receivables" && a.source == AlertSource::SmartAlert));
}

#[test]
fn test_cmd_feed_and_read() {
    let db = setup_test_db();
    let today = chrono::Local::now().date_naive();
    db.insert_financial_account(&NewFinancialAccount {
        description: "Fatura vencida".to_string(),
        account_type: AccountType::Receivable,
        status: AccountStatus::Overdue,
        amount: 8_000.0,
        final_amount: None,
        due_date: today - chrono::Duration::days(20),
        payment_date: None,
        category: "vendas".to_string(),
        client_id: None,
    })
    .unwrap();
    commands::cmd_alerts(&db, &FinancialAnalyzer::default(), 90, 12, true, true).unwrap();

    assert!(commands::cmd_feed(&db, true, 10).is_ok());

    let id = db.list_alerts(true, 10).unwrap()[0].id;
    commands::cmd_feed_read(&db, id).unwrap();
    assert!(db.list_alerts(true, 10).unwrap().iter().all(|a| a.id != id));

    assert!(commands::cmd_feed_read(&db, 99_999).is_err());
}

#[test]
fn test_run_budget() {
    let db = setup_test_db();
    db.insert_financial_account(&paid_payable("aluguel", 1_050.0, "2026-03-05"))
        .unwrap();
    db.insert_financial_account(&paid_payable("marketing", 1_200.0, "2026-03-10"))
        .unwrap();
    db.insert_financial_account(&paid_payable("viagens", 300.0, "2026-03-15"))
        .unwrap();

    let budget = vec![
        BudgetItem {
            category: "aluguel".to_string(),
            amount: 1_000.0,
        },
        BudgetItem {
            category: "marketing".to_string(),
            amount: 1_000.0,
        },
    ];
    let comparison = commands::run_budget(
        &db,
        &FinancialAnalyzer::default(),
        &budget,
        "2026-03-01",
        "2026-03-31",
    )
    .unwrap();

    assert_eq!(comparison.categories.len(), 3);
    assert_eq!(comparison.categories[0].status, BudgetStatus::OnTrack);
    assert_eq!(comparison.categories[1].status, BudgetStatus::Over);
    // Unbudgeted spend is still reported
    assert_eq!(comparison.categories[2].category, "viagens");
    assert_eq!(comparison.categories[2].budgeted, 0.0);
}

#[test]
fn test_run_budget_invalid_period() {
    let db = setup_test_db();
    let analyzer = FinancialAnalyzer::default();

    assert!(commands::run_budget(&db, &analyzer, &[], "2026-03-31", "2026-03-01").is_err());
    assert!(commands::run_budget(&db, &analyzer, &[], "31/03/2026", "2026-04-01").is_err());
}

#[test]
fn test_cmd_budget_from_file() {
    let db = setup_test_db();
    let file = write_temp(r#"[{"category": "aluguel", "amount": 1000.0}]"#, ".json");

    let result = commands::cmd_budget(
        &db,
        &FinancialAnalyzer::default(),
        file.path(),
        "2026-03-01",
        "2026-03-31",
        false,
    );
    assert!(result.is_ok());

    let bad = write_temp("not json", ".json");
    assert!(commands::load_budget(bad.path()).is_err());
}

// ========== Agent Command Tests ==========

#[tokio::test]
async fn test_run_agent_with_tool() {
    let db = setup_test_db();
    db.insert_financial_account(&paid_payable("aluguel", 1_000.0, "2026-03-05"))
        .unwrap();

    let llm = LlmClient::mock(vec![
        r#"{"action":"execute_tool","tool":"search_transactions","params":{"limit":5}}"#
            .to_string(),
        r#"{"action":"respond","data":{"resumo":"Nenhuma transação bancária importada."}}"#
            .to_string(),
    ]);

    let run = commands::run_agent(db, llm, "Mostre as transações", Some(r#"{"tela":"banco"}"#))
        .await
        .unwrap();

    assert_eq!(run.tools_used(), vec!["search_transactions"]);
    assert!(run.tool_results[0].success);
    match run.outcome {
        AgentOutcome::Responded(response) => {
            assert_eq!(
                response.summary(),
                Some("Nenhuma transação bancária importada.")
            );
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_run_agent_rejects_bad_context() {
    let llm = LlmClient::mock(vec![]);
    let result = commands::run_agent(setup_test_db(), llm, "Oi", Some("{not json")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_ask_prints_parse_failure() {
    let llm = LlmClient::mock(vec!["sem diretiva".to_string()]);
    assert!(commands::cmd_ask(setup_test_db(), llm, "Oi", None).await.is_ok());
}

// ========== Prompts Command Tests ==========

#[test]
fn test_cmd_prompts_show_known_and_unknown() {
    assert!(commands::cmd_prompts_show("finance_agent_plan").is_ok());
    assert!(commands::cmd_prompts_show("does_not_exist").is_ok());
}

// ========== Argument Tests ==========

#[test]
fn test_forecast_horizon_bounds() {
    let cli = Cli::try_parse_from(["opme", "forecast", "--days", "365", "--months", "36"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Forecast {
            days: 365,
            months: 36,
            ..
        }
    ));

    assert!(Cli::try_parse_from(["opme", "forecast", "--days", "3000000000"]).is_err());
    assert!(Cli::try_parse_from(["opme", "forecast", "--days", "366"]).is_err());
    assert!(Cli::try_parse_from(["opme", "forecast", "--days", "0"]).is_err());
    assert!(Cli::try_parse_from(["opme", "anomalies", "--months", "37"]).is_err());
    assert!(Cli::try_parse_from(["opme", "alerts", "--days", "400"]).is_err());
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("exactly10!", 10), "exactly10!");
    assert_eq!(truncate("this is a long string", 10), "this is...");
    assert_eq!(truncate("Manutenção preventiva", 10), "Manuten...");
}
