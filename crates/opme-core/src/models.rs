//! Domain models for the finance database
//!
//! Analytics inputs/outputs (`FinancialAccount`, `SmartAlert`, ...) live in
//! [`crate::analytics::types`]; this module holds the rows the agent tools
//! read and write.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{AccountStatus, AccountType, AlertKind, AlertSeverity};

/// A hospital, clinic or health plan the distributor bills
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    /// CNPJ/CPF
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Receivable/payable to insert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFinancialAccount {
    pub description: String,
    pub account_type: AccountType,
    pub status: AccountStatus,
    pub amount: f64,
    /// Defaults to `amount` when absent
    pub final_amount: Option<f64>,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub category: String,
    pub client_id: Option<i64>,
}

// =============================================================================
// Bank transactions
// =============================================================================

/// Direction of a bank statement line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    /// Infer from a signed amount (negative is a debit)
    pub fn from_amount(amount: f64) -> Self {
        if amount < 0.0 {
            Self::Debit
        } else {
            Self::Credit
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credit" | "credito" | "crédito" | "c" => Ok(Self::Credit),
            "debit" | "debito" | "débito" | "d" => Ok(Self::Debit),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bank statement line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    /// Always positive; direction is in `kind`
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub bank_account: Option<String>,
    pub reconciled: bool,
    pub created_at: DateTime<Utc>,
}

/// Bank statement line to insert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBankTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub bank_account: Option<String>,
}

// =============================================================================
// Invoices and installments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" | "pendente" => Ok(Self::Pending),
            "paid" | "pago" | "paga" => Ok(Self::Paid),
            "overdue" | "vencido" | "vencida" => Ok(Self::Overdue),
            "cancelled" | "canceled" | "cancelado" | "cancelada" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown invoice status: {}", s)),
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A billed invoice (fatura)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub number: String,
    pub client_id: Option<i64>,
    /// Joined from `clientes`
    pub client_name: Option<String>,
    pub total: f64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    pub number: String,
    pub client_id: Option<i64>,
    pub total: f64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
}

/// One installment (parcela) of an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installment {
    pub id: i64,
    pub invoice_id: i64,
    /// 1-based installment number
    pub number: i32,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
}

// =============================================================================
// Alerts and suggestions
// =============================================================================

/// Where a persisted alert came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSource {
    /// Created by the finance agent's `create_alert` tool
    Agent,
    /// Saved from the smart alert generator
    SmartAlert,
    Manual,
}

impl AlertSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::SmartAlert => "smart_alert",
            Self::Manual => "manual",
        }
    }
}

impl std::str::FromStr for AlertSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "agent" => Ok(Self::Agent),
            "smart_alert" => Ok(Self::SmartAlert),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Unknown alert source: {}", s)),
        }
    }
}

/// A persisted alert (alertas_financeiros)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAlert {
    pub id: i64,
    pub alert_type: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub category: String,
    pub metadata: Option<serde_json::Value>,
    pub source: AlertSource,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlert {
    pub alert_type: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub category: String,
    pub metadata: Option<serde_json::Value>,
    pub source: AlertSource,
}

/// An improvement suggestion (sugestoes_financeiras)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: i64,
    /// Free-form kind, e.g. "cost_reduction", "collection", "cash_flow"
    pub suggestion_type: String,
    pub title: String,
    pub description: String,
    /// Estimated impact in BRL
    pub estimated_impact: Option<f64>,
    /// pending, accepted, dismissed
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSuggestion {
    pub suggestion_type: String,
    pub title: String,
    pub description: String,
    pub estimated_impact: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_kind_parsing() {
        assert_eq!("Crédito".parse::<TransactionKind>().unwrap(), TransactionKind::Credit);
        assert_eq!("D".parse::<TransactionKind>().unwrap(), TransactionKind::Debit);
        assert!("x".parse::<TransactionKind>().is_err());
        assert_eq!(TransactionKind::from_amount(-5.0), TransactionKind::Debit);
        assert_eq!(TransactionKind::from_amount(0.0), TransactionKind::Credit);
    }

    #[test]
    fn test_invoice_status_parsing() {
        assert_eq!("vencida".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Overdue);
        assert_eq!("PAID".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);
        assert!("lost".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn test_alert_source_round_trip() {
        for source in [AlertSource::Agent, AlertSource::SmartAlert, AlertSource::Manual] {
            assert_eq!(source.as_str().parse::<AlertSource>().unwrap(), source);
        }
    }
}
