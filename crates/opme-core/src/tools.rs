//! Finance agent tools
//!
//! Each tool is a plain function over the database (or an external client)
//! with a typed parameter struct whose JSON Schema is generated by schemars
//! and shown to the model in the planning prompt. `FinanceTools::execute`
//! dispatches a tool call by name and always returns a `ToolResult`; failures
//! never escape as errors.
//!
//! Write tools (`categorize_transaction`, `update_invoice_status`,
//! `create_alert`, `create_suggestion`) record an audit log entry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::analytics::{
    format_brl, AlertKind, AlertSeverity, FinancialAnalyzer, FinancialSnapshot,
};
use crate::db::{Database, TransactionQuery};
use crate::error::{Error, Result};
use crate::integrations::{RegistryClient, RegistryQuery, SyncClient, SyncRequest};
use crate::models::{
    AlertSource, BankTransaction, Installment, Invoice, InvoiceStatus, NewAlert, NewSuggestion,
    TransactionKind,
};

/// Audit user for changes made through tools
const AUDIT_USER: &str = "agent";

const MAX_LIMIT: i64 = 200;

/// Parse optional date strings
pub fn parse_date_opt(s: Option<&str>) -> Result<Option<NaiveDate>> {
    match s {
        None => Ok(None),
        Some(date_str) => {
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| {
                Error::InvalidData(format!("Invalid date format: {}. Use YYYY-MM-DD", date_str))
            })?;
            Ok(Some(date))
        }
    }
}

fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

// =============================================================================
// search_transactions
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct SearchTransactionsParams {
    #[schemars(description = "Text to search for in the bank statement description")]
    pub query: Option<String>,

    #[schemars(description = "Start date in YYYY-MM-DD format")]
    pub start_date: Option<String>,

    #[schemars(description = "End date in YYYY-MM-DD format")]
    pub end_date: Option<String>,

    #[schemars(description = "Only return transactions without a category")]
    #[serde(default)]
    pub uncategorized_only: bool,

    #[schemars(description = "Maximum number of results to return (default 50, max 200)")]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchTransactionsResult {
    pub transactions: Vec<BankTransaction>,
    pub total_count: usize,
    pub total_credits: f64,
    pub total_debits: f64,
}

pub fn search_transactions(
    db: &Database,
    params: SearchTransactionsParams,
) -> Result<SearchTransactionsResult> {
    let query = TransactionQuery {
        start: parse_date_opt(params.start_date.as_deref())?,
        end: parse_date_opt(params.end_date.as_deref())?,
        search: params.query,
        uncategorized_only: params.uncategorized_only,
        limit: Some(clamp_limit(params.limit, 50)),
    };

    let transactions = db.search_bank_transactions(&query)?;
    let sum = |kind: TransactionKind| -> f64 {
        transactions
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.amount)
            .sum()
    };

    Ok(SearchTransactionsResult {
        total_count: transactions.len(),
        total_credits: sum(TransactionKind::Credit),
        total_debits: sum(TransactionKind::Debit),
        transactions,
    })
}

// =============================================================================
// categorize_transaction
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CategorizeTransactionParams {
    #[schemars(description = "ID of the bank transaction")]
    pub transaction_id: i64,

    #[schemars(description = "Category to assign, e.g. fornecedores, impostos, tarifas, recebimentos")]
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct CategorizeTransactionResult {
    pub transaction_id: i64,
    pub category: String,
}

pub fn categorize_transaction(
    db: &Database,
    params: CategorizeTransactionParams,
) -> Result<CategorizeTransactionResult> {
    let category = params.category.trim();
    if category.is_empty() {
        return Err(Error::InvalidData("Category cannot be empty".into()));
    }

    db.categorize_transaction(params.transaction_id, category)?;
    db.log_audit(
        AUDIT_USER,
        "categorize_transaction",
        Some("transacao_bancaria"),
        Some(params.transaction_id),
        Some(category),
    )?;

    Ok(CategorizeTransactionResult {
        transaction_id: params.transaction_id,
        category: category.to_string(),
    })
}

// =============================================================================
// list_invoices
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct ListInvoicesParams {
    #[schemars(description = "Filter by status: pending, paid, overdue, cancelled")]
    pub status: Option<String>,

    #[schemars(description = "Only open invoices whose due date has passed")]
    #[serde(default)]
    pub overdue_only: bool,

    #[schemars(description = "Maximum number of results to return (default 50, max 200)")]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListInvoicesResult {
    pub invoices: Vec<Invoice>,
    pub total_count: usize,
    pub total_amount: f64,
    pub total_formatted: String,
}

pub fn list_invoices(
    db: &Database,
    params: ListInvoicesParams,
    today: NaiveDate,
) -> Result<ListInvoicesResult> {
    let status = params
        .status
        .as_deref()
        .map(|s| s.parse::<InvoiceStatus>().map_err(Error::InvalidData))
        .transpose()?;
    let overdue_as_of = params.overdue_only.then_some(today);

    let invoices = db.list_invoices(status, overdue_as_of, clamp_limit(params.limit, 50))?;
    let total_amount: f64 = invoices.iter().map(|i| i.total).sum();

    Ok(ListInvoicesResult {
        total_count: invoices.len(),
        total_amount,
        total_formatted: format_brl(total_amount),
        invoices,
    })
}

// =============================================================================
// update_invoice_status
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateInvoiceStatusParams {
    #[schemars(description = "ID of the invoice")]
    pub invoice_id: i64,

    #[schemars(description = "New status: pending, paid, overdue, cancelled")]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateInvoiceStatusResult {
    pub invoice_id: i64,
    pub status: InvoiceStatus,
}

pub fn update_invoice_status(
    db: &Database,
    params: UpdateInvoiceStatusParams,
) -> Result<UpdateInvoiceStatusResult> {
    let status: InvoiceStatus = params.status.parse().map_err(Error::InvalidData)?;

    db.update_invoice_status(params.invoice_id, status)?;
    db.log_audit(
        AUDIT_USER,
        "update_invoice_status",
        Some("fatura"),
        Some(params.invoice_id),
        Some(status.as_str()),
    )?;

    Ok(UpdateInvoiceStatusResult {
        invoice_id: params.invoice_id,
        status,
    })
}

// =============================================================================
// list_installments
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListInstallmentsParams {
    #[schemars(description = "ID of the invoice whose installments to list")]
    pub invoice_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ListInstallmentsResult {
    pub invoice_id: i64,
    pub installments: Vec<Installment>,
    pub paid_count: usize,
    pub open_amount: f64,
}

pub fn list_installments(
    db: &Database,
    params: ListInstallmentsParams,
) -> Result<ListInstallmentsResult> {
    let installments = db.list_installments(params.invoice_id)?;
    let paid_count = installments
        .iter()
        .filter(|i| i.status == InvoiceStatus::Paid)
        .count();
    let open_amount = installments
        .iter()
        .filter(|i| matches!(i.status, InvoiceStatus::Pending | InvoiceStatus::Overdue))
        .map(|i| i.amount)
        .sum();

    Ok(ListInstallmentsResult {
        invoice_id: params.invoice_id,
        installments,
        paid_count,
        open_amount,
    })
}

// =============================================================================
// create_alert
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateAlertParams {
    #[schemars(description = "Short alert title in Portuguese")]
    pub title: String,

    #[schemars(description = "Alert message in Portuguese")]
    pub message: String,

    #[schemars(description = "Alert kind: warning, danger, info, success (default warning)")]
    pub alert_type: Option<String>,

    #[schemars(description = "Severity: critical, high, medium, low (default medium)")]
    pub severity: Option<String>,

    #[schemars(description = "Category, e.g. receivables, payables, cash_flow (default geral)")]
    pub category: Option<String>,

    #[schemars(description = "Optional structured data to attach to the alert")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct CreatedRecord {
    pub id: i64,
}

pub fn create_alert(db: &Database, params: CreateAlertParams) -> Result<CreatedRecord> {
    let alert_type = match params.alert_type.as_deref() {
        Some(s) => s.parse::<AlertKind>().map_err(Error::InvalidData)?,
        None => AlertKind::Warning,
    };
    let severity = match params.severity.as_deref() {
        Some(s) => s.parse::<AlertSeverity>().map_err(Error::InvalidData)?,
        None => AlertSeverity::Medium,
    };

    let id = db.insert_alert(&NewAlert {
        alert_type,
        severity,
        title: params.title,
        message: params.message,
        category: params.category.unwrap_or_else(|| "geral".to_string()),
        metadata: params.metadata,
        source: AlertSource::Agent,
    })?;
    db.log_audit(AUDIT_USER, "create_alert", Some("alerta"), Some(id), None)?;

    Ok(CreatedRecord { id })
}

// =============================================================================
// create_suggestion
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateSuggestionParams {
    #[schemars(description = "Kind of suggestion, e.g. cost_reduction, collection, cash_flow")]
    pub suggestion_type: String,

    #[schemars(description = "Short title in Portuguese")]
    pub title: String,

    #[schemars(description = "Description of the suggested action in Portuguese")]
    pub description: String,

    #[schemars(description = "Estimated financial impact in BRL")]
    pub estimated_impact: Option<f64>,
}

pub fn create_suggestion(db: &Database, params: CreateSuggestionParams) -> Result<CreatedRecord> {
    let id = db.insert_suggestion(&NewSuggestion {
        suggestion_type: params.suggestion_type,
        title: params.title,
        description: params.description,
        estimated_impact: params.estimated_impact,
    })?;
    db.log_audit(AUDIT_USER, "create_suggestion", Some("sugestao"), Some(id), None)?;

    Ok(CreatedRecord { id })
}

// =============================================================================
// financial_overview
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct FinancialOverviewParams {
    #[schemars(description = "Months of history to analyze (default 12, max 36)")]
    pub months: Option<u32>,

    #[schemars(description = "Days ahead to forecast (default 90, max 365)")]
    pub forecast_days: Option<u32>,
}

pub fn financial_overview(
    db: &Database,
    analyzer: &FinancialAnalyzer,
    params: FinancialOverviewParams,
    today: NaiveDate,
) -> Result<FinancialSnapshot> {
    let months = params.months.unwrap_or(12).clamp(1, 36);
    let days = params.forecast_days.unwrap_or(90).clamp(1, 365);

    let monthly = db.monthly_financial_data_at(months, today)?;
    let accounts = db.list_financial_accounts()?;
    Ok(analyzer.snapshot_at(&accounts, &monthly, days, today))
}

// =============================================================================
// sync_bank / lookup_registry
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct SyncBankParams {
    #[schemars(description = "Bank account to sync (all accounts when omitted)")]
    pub bank_account: Option<String>,

    #[schemars(description = "Start date in YYYY-MM-DD format")]
    pub start_date: Option<String>,

    #[schemars(description = "End date in YYYY-MM-DD format")]
    pub end_date: Option<String>,
}

impl SyncBankParams {
    fn into_request(self) -> Result<SyncRequest> {
        Ok(SyncRequest {
            start_date: parse_date_opt(self.start_date.as_deref())?,
            end_date: parse_date_opt(self.end_date.as_deref())?,
            bank_account: self.bank_account,
        })
    }
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct LookupRegistryParams {
    #[schemars(description = "ANVISA registration number of the product")]
    pub registration: Option<String>,

    #[schemars(description = "Product name to search for when the registration is unknown")]
    pub product_name: Option<String>,
}

impl LookupRegistryParams {
    fn into_query(self) -> Result<RegistryQuery> {
        match (self.registration, self.product_name) {
            (Some(r), _) if !r.trim().is_empty() => Ok(RegistryQuery::Registration(r.trim().to_string())),
            (_, Some(n)) if !n.trim().is_empty() => Ok(RegistryQuery::ProductName(n.trim().to_string())),
            _ => Err(Error::InvalidData(
                "Either registration or product_name is required".into(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LookupRegistryResult {
    pub query: RegistryQuery,
    pub found: bool,
    pub products: Vec<Value>,
}

// =============================================================================
// Tool Definitions
// =============================================================================

/// A tool as described to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

impl ToolSpec {
    fn new(name: &'static str, description: &'static str, parameters: Value) -> Self {
        Self {
            name,
            description,
            parameters,
        }
    }
}

/// Every tool the finance agent can call
pub fn finance_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            "search_transactions",
            "Busca transações bancárias por texto, período ou sem categoria.",
            schemars::schema_for!(SearchTransactionsParams).into(),
        ),
        ToolSpec::new(
            "categorize_transaction",
            "Define a categoria de uma transação bancária.",
            schemars::schema_for!(CategorizeTransactionParams).into(),
        ),
        ToolSpec::new(
            "list_invoices",
            "Lista faturas por status ou apenas as vencidas, com o cliente.",
            schemars::schema_for!(ListInvoicesParams).into(),
        ),
        ToolSpec::new(
            "update_invoice_status",
            "Altera o status de uma fatura.",
            schemars::schema_for!(UpdateInvoiceStatusParams).into(),
        ),
        ToolSpec::new(
            "list_installments",
            "Lista as parcelas de uma fatura.",
            schemars::schema_for!(ListInstallmentsParams).into(),
        ),
        ToolSpec::new(
            "create_alert",
            "Cria um alerta financeiro para a equipe.",
            schemars::schema_for!(CreateAlertParams).into(),
        ),
        ToolSpec::new(
            "create_suggestion",
            "Registra uma sugestão de melhoria financeira.",
            schemars::schema_for!(CreateSuggestionParams).into(),
        ),
        ToolSpec::new(
            "financial_overview",
            "Previsão de fluxo de caixa, anomalias e alertas inteligentes do histórico.",
            schemars::schema_for!(FinancialOverviewParams).into(),
        ),
        ToolSpec::new(
            "sync_bank",
            "Sincroniza o extrato bancário com o banco.",
            schemars::schema_for!(SyncBankParams).into(),
        ),
        ToolSpec::new(
            "lookup_registry",
            "Consulta o registro ANVISA de um produto OPME.",
            schemars::schema_for!(LookupRegistryParams).into(),
        ),
    ]
}

/// Render tool specs for the planning prompt
pub fn describe_tools(tools: &[ToolSpec]) -> String {
    tools
        .iter()
        .map(|t| {
            format!(
                "- {}: {}\n  parâmetros: {}",
                t.name,
                t.description,
                serde_json::to_string(&t.parameters).unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Dispatch
// =============================================================================

/// Uniform outcome of one tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub success: bool,
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(tool: &str, data: Value) -> Self {
        Self {
            tool: tool.to_string(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(tool: &str, error: impl Into<String>) -> Self {
        Self {
            tool: tool.to_string(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: &Value) -> Result<T> {
    // Models sometimes send null for "no params"
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params.clone()
    };
    serde_json::from_value(params).map_err(|e| Error::InvalidData(format!("Invalid params: {}", e)))
}

fn to_data<T: Serialize>(result: T) -> Result<Value> {
    Ok(serde_json::to_value(result)?)
}

/// Tool executor bound to a database and the optional external clients
#[derive(Clone)]
pub struct FinanceTools {
    db: Database,
    analyzer: FinancialAnalyzer,
    sync: Option<SyncClient>,
    registry: Option<RegistryClient>,
    reference_date: Option<NaiveDate>,
}

impl FinanceTools {
    pub fn new(db: Database, analyzer: FinancialAnalyzer) -> Self {
        Self {
            db,
            analyzer,
            sync: None,
            registry: None,
            reference_date: None,
        }
    }

    /// Attach clients configured through the environment
    pub fn with_env_clients(self) -> Self {
        self.with_sync(SyncClient::from_env())
            .with_registry(RegistryClient::from_env())
    }

    pub fn with_sync(mut self, sync: Option<SyncClient>) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_registry(mut self, registry: Option<RegistryClient>) -> Self {
        self.registry = registry;
        self
    }

    /// Pin "today" for date-dependent tools
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        finance_tools()
    }

    /// Reference date for date-dependent tools (today unless pinned)
    pub fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Execute one tool call; errors become a failed result
    pub async fn execute(&self, tool: &str, params: &Value) -> ToolResult {
        debug!(tool, "Executing tool");
        match self.dispatch(tool, params).await {
            Ok(data) => ToolResult::ok(tool, data),
            Err(e) => {
                warn!(tool, error = %e, "Tool failed");
                ToolResult::failed(tool, e.to_string())
            }
        }
    }

    async fn dispatch(&self, tool: &str, params: &Value) -> Result<Value> {
        match tool {
            "search_transactions" => to_data(search_transactions(&self.db, parse_params(params)?)?),
            "categorize_transaction" => {
                to_data(categorize_transaction(&self.db, parse_params(params)?)?)
            }
            "list_invoices" => to_data(list_invoices(
                &self.db,
                parse_params(params)?,
                self.today(),
            )?),
            "update_invoice_status" => {
                to_data(update_invoice_status(&self.db, parse_params(params)?)?)
            }
            "list_installments" => to_data(list_installments(&self.db, parse_params(params)?)?),
            "create_alert" => to_data(create_alert(&self.db, parse_params(params)?)?),
            "create_suggestion" => to_data(create_suggestion(&self.db, parse_params(params)?)?),
            "financial_overview" => to_data(financial_overview(
                &self.db,
                &self.analyzer,
                parse_params(params)?,
                self.today(),
            )?),
            "sync_bank" => {
                let request = parse_params::<SyncBankParams>(params)?.into_request()?;
                let sync = self
                    .sync
                    .as_ref()
                    .ok_or_else(|| Error::Config("Bank sync is not configured (OPME_SYNC_URL)".into()))?;
                sync.sync(&request).await
            }
            "lookup_registry" => {
                let query = parse_params::<LookupRegistryParams>(params)?.into_query()?;
                let registry = self.registry.as_ref().ok_or_else(|| {
                    Error::Config("Registry lookup is not configured (INFOSIMPLES_TOKEN)".into())
                })?;
                let products = registry.lookup(&query).await?;
                to_data(LookupRegistryResult {
                    found: !products.is_empty(),
                    query,
                    products,
                })
            }
            _ => Err(Error::InvalidData(format!("Unknown tool: {}", tool))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{AccountStatus, AccountType};
    use crate::models::{NewBankTransaction, NewFinancialAccount, NewInvoice};
    use crate::test_utils::{MockApiServer, MOCK_REGISTRATION, MOCK_SYNC_KEY};
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_tools() -> FinanceTools {
        let db = Database::in_memory().unwrap();
        FinanceTools::new(db, FinancialAnalyzer::default()).with_reference_date(date(2026, 3, 15))
    }

    fn seed(db: &Database) -> i64 {
        for (day, description, amount) in [
            (2, "PIX RECEBIDO HOSPITAL SANTA CASA", 4200.0),
            (4, "TED FORNECEDOR IMPLANTES", -1800.0),
            (6, "TARIFA PACOTE SERVICOS", -60.0),
        ] {
            db.insert_bank_transaction(&NewBankTransaction {
                date: date(2026, 3, day),
                description: description.to_string(),
                amount: f64::abs(amount),
                kind: TransactionKind::from_amount(amount),
                category: None,
                bank_account: Some("Itaú 1234".to_string()),
            })
            .unwrap();
        }

        let client = db
            .upsert_client("Hospital Santa Casa", Some("11.111.111/0001-11"), None)
            .unwrap();
        db.insert_invoice(&NewInvoice {
            number: "NF-2026-001".to_string(),
            client_id: Some(client),
            total: 15000.0,
            issue_date: date(2026, 1, 10),
            due_date: date(2026, 2, 10),
            status: InvoiceStatus::Pending,
        })
        .unwrap()
    }

    #[test]
    fn test_every_tool_has_object_schema() {
        let tools = finance_tools();
        assert_eq!(tools.len(), 10);
        for tool in &tools {
            assert_eq!(tool.parameters["type"], "object", "{}", tool.name);
        }

        let description = describe_tools(&tools);
        assert!(description.contains("- search_transactions:"));
        assert!(description.contains("transaction_id"));
    }

    #[test]
    fn test_parse_date_opt() {
        assert_eq!(parse_date_opt(None).unwrap(), None);
        assert_eq!(
            parse_date_opt(Some("2026-03-01")).unwrap(),
            Some(date(2026, 3, 1))
        );
        assert!(parse_date_opt(Some("01/03/2026")).is_err());
    }

    #[tokio::test]
    async fn test_search_transactions_totals() {
        let tools = create_tools();
        seed(tools.db());

        let result = tools.execute("search_transactions", &json!({})).await;
        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["total_count"], 3);
        assert_eq!(data["total_credits"], 4200.0);
        assert_eq!(data["total_debits"], 1860.0);

        let result = tools
            .execute("search_transactions", &json!({"query": "fornecedor"}))
            .await;
        assert_eq!(result.data.unwrap()["total_count"], 1);
    }

    #[tokio::test]
    async fn test_categorize_transaction_is_audited() {
        let tools = create_tools();
        seed(tools.db());
        let uncategorized = tools
            .db()
            .search_bank_transactions(&TransactionQuery::default())
            .unwrap();
        let id = uncategorized[0].id;

        let result = tools
            .execute(
                "categorize_transaction",
                &json!({"transaction_id": id, "category": "tarifas"}),
            )
            .await;
        assert!(result.success, "{:?}", result.error);

        let audit = tools.db().list_audit_log(10).unwrap();
        assert_eq!(audit[0].action, "categorize_transaction");
        assert_eq!(audit[0].entity_id, Some(id));

        let missing = tools
            .execute(
                "categorize_transaction",
                &json!({"transaction_id": 9999, "category": "tarifas"}),
            )
            .await;
        assert!(!missing.success);
    }

    #[tokio::test]
    async fn test_overdue_invoices_use_reference_date() {
        let tools = create_tools();
        let invoice_id = seed(tools.db());

        let result = tools
            .execute("list_invoices", &json!({"overdue_only": true}))
            .await;
        let data = result.data.unwrap();
        assert_eq!(data["total_count"], 1);
        assert_eq!(data["total_formatted"], "R$ 15.000,00");
        assert_eq!(data["invoices"][0]["client_name"], "Hospital Santa Casa");

        let result = tools
            .execute(
                "update_invoice_status",
                &json!({"invoice_id": invoice_id, "status": "paga"}),
            )
            .await;
        assert!(result.success);
        assert_eq!(result.data.unwrap()["status"], "paid");

        let result = tools
            .execute("list_invoices", &json!({"overdue_only": true}))
            .await;
        assert_eq!(result.data.unwrap()["total_count"], 0);
    }

    #[tokio::test]
    async fn test_invalid_status_fails() {
        let tools = create_tools();
        let result = tools
            .execute("list_invoices", &json!({"status": "perdida"}))
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Unknown invoice status"));
    }

    #[tokio::test]
    async fn test_list_installments() {
        let tools = create_tools();
        let invoice_id = seed(tools.db());
        tools
            .db()
            .insert_installment(invoice_id, 1, 7500.0, date(2026, 2, 10))
            .unwrap();
        tools
            .db()
            .insert_installment(invoice_id, 2, 7500.0, date(2026, 3, 10))
            .unwrap();

        let result = tools
            .execute("list_installments", &json!({"invoice_id": invoice_id}))
            .await;
        let data = result.data.unwrap();
        assert_eq!(data["installments"].as_array().unwrap().len(), 2);
        assert_eq!(data["open_amount"], 15000.0);
        assert_eq!(data["paid_count"], 0);
    }

    #[tokio::test]
    async fn test_create_alert_and_suggestion() {
        let tools = create_tools();

        let result = tools
            .execute(
                "create_alert",
                &json!({
                    "title": "Fatura vencida",
                    "message": "NF-2026-001 vencida há 33 dias",
                    "severity": "high",
                    "category": "receivables"
                }),
            )
            .await;
        assert!(result.success);

        let alerts = tools.db().list_alerts(false, 10).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertKind::Warning);
        assert_eq!(alerts[0].severity, AlertSeverity::High);
        assert_eq!(alerts[0].source, AlertSource::Agent);

        let result = tools
            .execute(
                "create_suggestion",
                &json!({
                    "suggestion_type": "collection",
                    "title": "Cobrar Santa Casa",
                    "description": "Enviar lembrete de cobrança",
                    "estimated_impact": 15000.0
                }),
            )
            .await;
        assert!(result.success);
        assert_eq!(tools.db().list_suggestions(None).unwrap().len(), 1);

        let bad = tools
            .execute("create_alert", &json!({"title": "x", "message": "y", "severity": "urgent"}))
            .await;
        assert!(!bad.success);
    }

    #[tokio::test]
    async fn test_financial_overview() {
        let tools = create_tools();
        for month in 1..=12 {
            tools
                .db()
                .insert_financial_account(&NewFinancialAccount {
                    description: format!("Recebimento {}", month),
                    account_type: AccountType::Receivable,
                    status: AccountStatus::Paid,
                    amount: 10000.0,
                    final_amount: None,
                    due_date: date(2025, month, 10),
                    payment_date: Some(date(2025, month, 10)),
                    category: "vendas".to_string(),
                    client_id: None,
                })
                .unwrap();
        }

        let result = tools
            .execute("financial_overview", &json!({"months": 24, "forecast_days": 60}))
            .await;
        assert!(result.success, "{:?}", result.error);
        let data = result.data.unwrap();
        assert_eq!(data["forecast"]["periods"].as_array().unwrap().len(), 2);
        assert_eq!(data["forecast"]["data_points"], 14);
        assert!(data["anomalies"].is_array());
        assert!(data["alerts"].is_array());
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_params() {
        let tools = create_tools();

        let result = tools.execute("delete_everything", &json!({})).await;
        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.error.unwrap().contains("Unknown tool"));

        let result = tools
            .execute("categorize_transaction", &json!({"category": "x"}))
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Invalid params"));
    }

    #[tokio::test]
    async fn test_external_tools_unconfigured() {
        let tools = create_tools();

        let result = tools.execute("sync_bank", &Value::Null).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("OPME_SYNC_URL"));

        let result = tools
            .execute("lookup_registry", &json!({"registration": "1"}))
            .await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_external_tools_against_mock_server() {
        let server = MockApiServer::start().await;
        let tools = create_tools()
            .with_sync(Some(SyncClient::new(
                &format!("{}/sync", server.url()),
                Some(MOCK_SYNC_KEY),
            )))
            .with_registry(Some(RegistryClient::new(&server.url(), "token")));

        let result = tools
            .execute("sync_bank", &json!({"start_date": "2026-03-01"}))
            .await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.data.unwrap()["importadas"], 3);

        let result = tools
            .execute("lookup_registry", &json!({"registration": MOCK_REGISTRATION}))
            .await;
        let data = result.data.unwrap();
        assert_eq!(data["found"], true);
        assert_eq!(data["query"]["by"], "registration");

        let result = tools.execute("lookup_registry", &json!({})).await;
        assert!(!result.success);
    }
}
