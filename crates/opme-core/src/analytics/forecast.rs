//! Period forecaster
//!
//! Projects future monthly periods from:
//! - the trailing-months average of income and expense (baseline)
//! - the least-squares slope of each series (trend)
//! - a 12-month sinusoidal factor when income looks seasonal
//!
//! Each projected value carries a confidence interval that widens with the
//! distance from the last observed month.

use std::f64::consts::PI;

use chrono::{Days, NaiveDate};

use super::config::AnalyticsConfig;
use super::stats;
use super::trend::{analyze_trends, detect_seasonality};
use super::types::{ForecastData, ForecastPeriod, ForecastValue, MonthlyFinancialData};

/// Generate a forecast covering `days` days from `as_of`
///
/// Empty history yields no periods and accuracy 0. The horizon is capped at
/// `max_periods`, and projection stops early if a period date would fall
/// outside the calendar range.
pub fn generate_forecast_at(
    monthly: &[MonthlyFinancialData],
    days: u32,
    as_of: NaiveDate,
    config: &AnalyticsConfig,
) -> ForecastData {
    let trends = analyze_trends(monthly, &config.trend);
    let seasonality = detect_seasonality(monthly, &config.seasonality);

    if monthly.is_empty() {
        return ForecastData {
            periods: Vec::new(),
            trends,
            seasonality,
            accuracy: 0.0,
            data_points: 0,
        };
    }

    let fc = &config.forecast;
    let baseline_start = monthly.len().saturating_sub(fc.baseline_months);
    let baseline = &monthly[baseline_start..];
    let avg_revenue = stats::mean(&baseline.iter().map(|m| m.income).collect::<Vec<_>>());
    let avg_expense = stats::mean(&baseline.iter().map(|m| m.expense).collect::<Vec<_>>());

    let period_count = days.div_ceil(fc.period_days.max(1)).min(fc.max_periods);
    let mut periods = Vec::with_capacity(period_count as usize);

    for i in 1..=period_count {
        let offset = u64::from(fc.period_days) * u64::from(i);
        let Some(date) = as_of.checked_add_days(Days::new(offset)) else {
            break;
        };
        let step = i as f64;
        let factor = if seasonality.detected {
            1.0 + config.seasonality.amplitude * (2.0 * PI * step / 12.0).sin()
        } else {
            1.0
        };

        let revenue = ((avg_revenue + trends.revenue_slope * step) * factor).max(0.0);
        let expenses = ((avg_expense + trends.expense_slope * step) * factor).max(0.0);
        let cash_flow = revenue - expenses;

        let confidence = period_confidence(i, config);
        let margin_rate = fc.base_margin + fc.margin_step * step;

        periods.push(ForecastPeriod {
            period: i,
            date,
            revenue: interval(revenue, margin_rate, confidence, true),
            expenses: interval(expenses, margin_rate, confidence, true),
            cash_flow: interval(cash_flow, margin_rate, confidence, false),
        });
    }

    ForecastData {
        periods,
        trends,
        seasonality,
        accuracy: forecast_accuracy(monthly, config),
        data_points: monthly.len(),
    }
}

/// Confidence for the `period`-th projected period (1-based)
pub fn period_confidence(period: u32, config: &AnalyticsConfig) -> f64 {
    let fc = &config.forecast;
    (fc.initial_confidence - fc.confidence_step * period as f64).max(fc.min_confidence)
}

/// Estimated accuracy from history length and volatility
pub fn forecast_accuracy(monthly: &[MonthlyFinancialData], config: &AnalyticsConfig) -> f64 {
    if monthly.is_empty() {
        return 0.0;
    }
    let fc = &config.forecast;

    let base = (fc.base_accuracy + fc.accuracy_per_point * monthly.len() as f64)
        .min(fc.max_accuracy);

    let income: Vec<f64> = monthly.iter().map(|m| m.income).collect();
    let expense: Vec<f64> = monthly.iter().map(|m| m.expense).collect();
    let variance_score = ((stats::coefficient_of_variation(&income)
        + stats::coefficient_of_variation(&expense))
        / 2.0)
        .min(fc.max_variance_penalty);

    (base - variance_score).max(fc.min_accuracy)
}

fn interval(predicted: f64, margin_rate: f64, confidence: f64, floor_lower: bool) -> ForecastValue {
    let margin = (predicted * margin_rate).abs();
    let lower = predicted - margin;
    ForecastValue {
        predicted,
        lower: if floor_lower { lower.max(0.0) } else { lower },
        upper: predicted + margin,
        confidence,
    }
}
