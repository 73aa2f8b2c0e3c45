//! Forecast, anomaly, smart alert and budget handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{AppError, AppState, MAX_FORECAST_DAYS, MAX_HISTORY_MONTHS};
use opme_core::analytics::{
    AnomalyDetection, BudgetComparison, BudgetItem, ForecastData, SmartAlert,
};

fn default_days() -> u32 {
    90
}

fn default_months() -> u32 {
    12
}

/// Query parameters for forecast and smart alerts
#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    /// Forecast horizon in days
    #[serde(default = "default_days")]
    pub days: u32,
    /// Months of history to aggregate
    #[serde(default = "default_months")]
    pub months: u32,
}

impl ForecastQuery {
    fn bounded(&self) -> (u32, u32) {
        (
            self.days.clamp(1, MAX_FORECAST_DAYS),
            self.months.clamp(1, MAX_HISTORY_MONTHS),
        )
    }
}

/// Query parameters for anomaly detection
#[derive(Debug, Deserialize)]
pub struct AnomalyQuery {
    #[serde(default = "default_months")]
    pub months: u32,
}

/// GET /api/forecast - Project revenue, expenses and cash flow
pub async fn get_forecast(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<ForecastData>, AppError> {
    let (days, months) = params.bounded();
    let monthly = state.db.monthly_financial_data(months)?;

    Ok(Json(state.analyzer.generate_forecast(&monthly, days)))
}

/// GET /api/anomalies - Months whose revenue or expense deviates from history
pub async fn get_anomalies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnomalyQuery>,
) -> Result<Json<Vec<AnomalyDetection>>, AppError> {
    let months = params.months.clamp(1, MAX_HISTORY_MONTHS);
    let monthly = state.db.monthly_financial_data(months)?;

    Ok(Json(state.analyzer.detect_anomalies(&monthly)))
}

/// GET /api/smart-alerts - Rule-based alerts over forecast, ledger and anomalies
pub async fn get_smart_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<Vec<SmartAlert>>, AppError> {
    let (days, months) = params.bounded();
    let monthly = state.db.monthly_financial_data(months)?;
    let accounts = state.db.list_financial_accounts()?;

    let snapshot = state.analyzer.snapshot(&accounts, &monthly, days);
    Ok(Json(snapshot.alerts))
}

/// Request body for budget comparison
#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    pub budget: Vec<BudgetItem>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// POST /api/budget/compare - Planned vs paid spend per category
pub async fn compare_budget(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BudgetRequest>,
) -> Result<Json<BudgetComparison>, AppError> {
    if body.start_date > body.end_date {
        return Err(AppError::bad_request("start_date must not be after end_date"));
    }
    if body.budget.iter().any(|item| item.amount < 0.0) {
        return Err(AppError::bad_request("Budget amounts must not be negative"));
    }

    let accounts = state.db.list_financial_accounts()?;
    Ok(Json(state.analyzer.compare_budget(
        &accounts,
        &body.budget,
        body.start_date,
        body.end_date,
    )))
}
