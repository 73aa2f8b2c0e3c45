//! Financial analytics - forecasting, anomalies, smart alerts, budgets
//!
//! Everything here is a pure function of its inputs: monthly history, the
//! account ledger, a reference date and an [`AnalyticsConfig`]. Nothing is
//! cached or persisted; the database and HTTP layers feed data in and store
//! or serve what comes out.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use opme_core::analytics::FinancialAnalyzer;
//!
//! let analyzer = FinancialAnalyzer::new(AnalyticsConfig::load()?);
//! let monthly = db.monthly_financial_data(12)?;
//! let accounts = db.list_financial_accounts()?;
//! let snapshot = analyzer.snapshot(&accounts, &monthly, 90);
//! ```

pub mod alerts;
pub mod anomalies;
pub mod budget;
pub mod config;
pub mod forecast;
pub mod format;
pub mod stats;
pub mod trend;
pub mod types;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use config::AnalyticsConfig;
pub use format::format_brl;
pub use types::{
    AccountStatus, AccountType, AlertKind, AlertSeverity, AnomalyDetection, AnomalySeverity,
    AnomalyType, BudgetComparison, BudgetItem, BudgetPeriod, BudgetStatus, BudgetSummary,
    CategoryComparison, FinancialAccount, ForecastData, ForecastPeriod, ForecastValue,
    MonthlyFinancialData, Seasonality, SmartAlert, Trend, TrendAnalysis,
};

/// Forecast, anomalies and the alerts derived from both
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub forecast: ForecastData,
    pub anomalies: Vec<AnomalyDetection>,
    pub alerts: Vec<SmartAlert>,
}

/// Analytics operations bound to one configuration
#[derive(Debug, Clone, Default)]
pub struct FinancialAnalyzer {
    config: AnalyticsConfig,
}

impl FinancialAnalyzer {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Forecast `days` ahead of today
    pub fn generate_forecast(&self, monthly: &[MonthlyFinancialData], days: u32) -> ForecastData {
        self.generate_forecast_at(monthly, days, today())
    }

    pub fn generate_forecast_at(
        &self,
        monthly: &[MonthlyFinancialData],
        days: u32,
        as_of: NaiveDate,
    ) -> ForecastData {
        forecast::generate_forecast_at(monthly, days, as_of, &self.config)
    }

    pub fn detect_anomalies(&self, monthly: &[MonthlyFinancialData]) -> Vec<AnomalyDetection> {
        anomalies::detect_anomalies(monthly, &self.config.anomaly)
    }

    /// Smart alerts as of today
    pub fn generate_smart_alerts(
        &self,
        accounts: &[FinancialAccount],
        forecast: &ForecastData,
        anomalies: &[AnomalyDetection],
    ) -> Vec<SmartAlert> {
        self.generate_smart_alerts_at(accounts, forecast, anomalies, today())
    }

    pub fn generate_smart_alerts_at(
        &self,
        accounts: &[FinancialAccount],
        forecast: &ForecastData,
        anomalies: &[AnomalyDetection],
        today: NaiveDate,
    ) -> Vec<SmartAlert> {
        alerts::generate_smart_alerts(accounts, forecast, anomalies, today, &self.config.alerts)
    }

    pub fn compare_budget(
        &self,
        accounts: &[FinancialAccount],
        budget: &[BudgetItem],
        start: NaiveDate,
        end: NaiveDate,
    ) -> BudgetComparison {
        budget::compare_budget(accounts, budget, start, end, &self.config.budget)
    }

    /// Run forecast, anomaly detection and alert generation together
    pub fn snapshot(
        &self,
        accounts: &[FinancialAccount],
        monthly: &[MonthlyFinancialData],
        days: u32,
    ) -> FinancialSnapshot {
        self.snapshot_at(accounts, monthly, days, today())
    }

    pub fn snapshot_at(
        &self,
        accounts: &[FinancialAccount],
        monthly: &[MonthlyFinancialData],
        days: u32,
        today: NaiveDate,
    ) -> FinancialSnapshot {
        let forecast = self.generate_forecast_at(monthly, days, today);
        let anomalies = self.detect_anomalies(monthly);
        let alerts = self.generate_smart_alerts_at(accounts, &forecast, &anomalies, today);

        tracing::debug!(
            months = monthly.len(),
            periods = forecast.periods.len(),
            anomalies = anomalies.len(),
            alerts = alerts.len(),
            "Financial snapshot computed"
        );

        FinancialSnapshot {
            forecast,
            anomalies,
            alerts,
        }
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
