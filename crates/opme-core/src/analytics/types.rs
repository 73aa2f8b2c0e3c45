//! Core types for the financial analytics engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Inputs
// =============================================================================

/// Aggregated income/expense for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFinancialData {
    /// Month identifier (`YYYY-MM`)
    pub month: String,
    pub income: f64,
    pub expense: f64,
    pub net_flow: f64,
}

impl MonthlyFinancialData {
    pub fn new(month: impl Into<String>, income: f64, expense: f64) -> Self {
        Self {
            month: month.into(),
            income,
            expense,
            net_flow: income - expense,
        }
    }
}

/// Whether an account is money coming in or going out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Receivable,
    Payable,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Receivable => "receivable",
            AccountType::Payable => "payable",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "receivable" | "receber" => Ok(AccountType::Receivable),
            "payable" | "pagar" => Ok(AccountType::Payable),
            _ => Err(format!("Unknown account type: {}", s)),
        }
    }
}

/// Settlement state of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Pending,
    Paid,
    Overdue,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Paid => "paid",
            AccountStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" | "pendente" => Ok(AccountStatus::Pending),
            "paid" | "pago" => Ok(AccountStatus::Paid),
            "overdue" | "vencido" => Ok(AccountStatus::Overdue),
            _ => Err(format!("Unknown account status: {}", s)),
        }
    }
}

/// A receivable or payable ledger row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialAccount {
    pub id: i64,
    pub description: String,
    pub account_type: AccountType,
    pub status: AccountStatus,
    /// Original amount
    pub amount: f64,
    /// Amount after interest, fines and discounts
    pub final_amount: f64,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub category: String,
}

impl FinancialAccount {
    /// Date used to place the account in a reporting period
    pub fn effective_date(&self) -> NaiveDate {
        self.payment_date.unwrap_or(self.due_date)
    }
}

// =============================================================================
// Trends and seasonality
// =============================================================================

/// Direction of a regression slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Growing,
    Stable,
    Declining,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Growing => "growing",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trend classification of each series plus the raw slopes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub revenue: Trend,
    pub expenses: Trend,
    pub profitability: Trend,
    pub revenue_slope: f64,
    pub expense_slope: f64,
    pub net_flow_slope: f64,
}

/// Seasonality heuristic result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Seasonality {
    pub detected: bool,
    /// `Some("monthly")` when detected
    pub pattern: Option<String>,
    /// Months whose income is more than one standard deviation above the mean
    pub peaks: Vec<String>,
}

// =============================================================================
// Forecast
// =============================================================================

/// A point estimate with its confidence interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastValue {
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
    /// Confidence percentage (50-95)
    pub confidence: f64,
}

/// One projected future period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    /// 1-based period index
    pub period: u32,
    pub date: NaiveDate,
    pub revenue: ForecastValue,
    pub expenses: ForecastValue,
    pub cash_flow: ForecastValue,
}

/// Full forecast output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastData {
    pub periods: Vec<ForecastPeriod>,
    pub trends: TrendAnalysis,
    pub seasonality: Seasonality,
    /// Estimated accuracy percentage (0 when there is no history)
    pub accuracy: f64,
    /// Number of historical months the forecast is based on
    pub data_points: usize,
}

// =============================================================================
// Anomalies
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    Revenue,
    Expense,
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::Revenue => "revenue",
            AnomalyType::Expense => "expense",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
}

impl AnomalySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalySeverity::Low => "low",
            AnomalySeverity::Medium => "medium",
            AnomalySeverity::High => "high",
        }
    }
}

/// A month whose revenue or expense deviates strongly from history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDetection {
    /// Month identifier of the anomalous month
    pub date: String,
    pub anomaly_type: AnomalyType,
    /// Historical mean
    pub expected: f64,
    pub actual: f64,
    /// Deviation from the mean in percent
    pub deviation: f64,
    pub z_score: f64,
    pub severity: AnomalySeverity,
    pub description: String,
}

// =============================================================================
// Smart alerts
// =============================================================================

/// Visual kind of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Warning,
    Danger,
    Info,
    Success,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Warning => "warning",
            AlertKind::Danger => "danger",
            AlertKind::Info => "info",
            AlertKind::Success => "success",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warning" => Ok(AlertKind::Warning),
            "danger" => Ok(AlertKind::Danger),
            "info" => Ok(AlertKind::Info),
            "success" => Ok(AlertKind::Success),
            _ => Err(format!("Unknown alert kind: {}", s)),
        }
    }
}

/// Urgency of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Critical => "critical",
            AlertSeverity::High => "high",
            AlertSeverity::Medium => "medium",
            AlertSeverity::Low => "low",
        }
    }

    /// Sort rank (lower = more urgent)
    pub fn rank(&self) -> u8 {
        match self {
            AlertSeverity::Critical => 0,
            AlertSeverity::High => 1,
            AlertSeverity::Medium => 2,
            AlertSeverity::Low => 3,
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(AlertSeverity::Critical),
            "high" => Ok(AlertSeverity::High),
            "medium" => Ok(AlertSeverity::Medium),
            "low" => Ok(AlertSeverity::Low),
            _ => Err(format!("Unknown alert severity: {}", s)),
        }
    }
}

/// A user-facing alert derived from forecast, ledger and anomalies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartAlert {
    /// Unique within one generation call only
    pub id: String,
    pub alert_type: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub category: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

// =============================================================================
// Budget
// =============================================================================

/// Planned spend for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetItem {
    pub category: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    OnTrack,
    Over,
    Under,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::OnTrack => "on_track",
            BudgetStatus::Over => "over",
            BudgetStatus::Under => "under",
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryComparison {
    pub category: String,
    pub budgeted: f64,
    pub actual: f64,
    /// actual - budgeted
    pub variance: f64,
    pub variance_percent: f64,
    pub status: BudgetStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub total_budgeted: f64,
    pub total_actual: f64,
    pub total_variance: f64,
    pub total_variance_percent: f64,
    pub categories_over: usize,
    pub categories_under: usize,
    pub categories_on_track: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetComparison {
    pub period: BudgetPeriod,
    pub categories: Vec<CategoryComparison>,
    pub summary: BudgetSummary,
}
