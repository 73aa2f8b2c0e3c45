//! Z-score anomaly detection over monthly revenue and expense
//!
//! Mean and standard deviation come from the full history, but only the
//! trailing window (default 3 months) is evaluated, so old one-off spikes
//! don't keep resurfacing.

use super::config::AnomalyConfig;
use super::format::{format_brl, format_percent};
use super::stats;
use super::types::{AnomalyDetection, AnomalySeverity, AnomalyType, MonthlyFinancialData};

/// Detect anomalous months in the trailing window
///
/// Returns an empty list when history is shorter than `config.min_months`.
/// Within a month, a revenue anomaly is listed before an expense anomaly.
pub fn detect_anomalies(
    monthly: &[MonthlyFinancialData],
    config: &AnomalyConfig,
) -> Vec<AnomalyDetection> {
    if monthly.len() < config.min_months {
        return Vec::new();
    }

    let income: Vec<f64> = monthly.iter().map(|m| m.income).collect();
    let expense: Vec<f64> = monthly.iter().map(|m| m.expense).collect();
    let income_stats = (stats::mean(&income), stats::std_dev(&income));
    let expense_stats = (stats::mean(&expense), stats::std_dev(&expense));

    let window_start = monthly.len().saturating_sub(config.window_months);
    let mut anomalies = Vec::new();

    for month in &monthly[window_start..] {
        if let Some(a) = check(month, AnomalyType::Revenue, month.income, income_stats, config) {
            anomalies.push(a);
        }
        if let Some(a) = check(month, AnomalyType::Expense, month.expense, expense_stats, config) {
            anomalies.push(a);
        }
    }

    anomalies
}

/// Severity band for an absolute z-score
pub fn classify_severity(abs_z: f64, config: &AnomalyConfig) -> AnomalySeverity {
    if abs_z > config.high_z {
        AnomalySeverity::High
    } else if abs_z > config.medium_z {
        AnomalySeverity::Medium
    } else {
        AnomalySeverity::Low
    }
}

fn check(
    month: &MonthlyFinancialData,
    anomaly_type: AnomalyType,
    actual: f64,
    (mean, std_dev): (f64, f64),
    config: &AnomalyConfig,
) -> Option<AnomalyDetection> {
    // Constant series carry no signal
    if std_dev.abs() < f64::EPSILON {
        return None;
    }

    let z = stats::z_score(actual, mean, std_dev);
    if z.abs() <= config.z_threshold {
        return None;
    }

    let deviation = if mean.abs() < f64::EPSILON {
        0.0
    } else {
        (actual - mean) / mean * 100.0
    };

    Some(AnomalyDetection {
        date: month.month.clone(),
        anomaly_type,
        expected: mean,
        actual,
        deviation,
        z_score: z,
        severity: classify_severity(z.abs(), config),
        description: describe(anomaly_type, &month.month, actual, mean, deviation),
    })
}

fn describe(anomaly_type: AnomalyType, month: &str, actual: f64, mean: f64, deviation: f64) -> String {
    let label = match anomaly_type {
        AnomalyType::Revenue => "Receita",
        AnomalyType::Expense => "Despesa",
    };
    let direction = if deviation >= 0.0 { "acima" } else { "abaixo" };

    format!(
        "{} de {} ({}) ficou {} {} da média histórica de {}",
        label,
        month,
        format_brl(actual),
        format_percent(deviation.abs()),
        direction,
        format_brl(mean),
    )
}
