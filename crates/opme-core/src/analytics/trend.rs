//! Trend and seasonality analysis over monthly history

use super::config::{SeasonalityConfig, TrendConfig};
use super::stats;
use super::types::{MonthlyFinancialData, Seasonality, Trend, TrendAnalysis};

/// Least-squares slope of a series against its index (0 for < 2 points)
pub fn calculate_trend(values: &[f64]) -> f64 {
    stats::linear_regression_slope(values)
}

/// Map a slope to a trend using a symmetric absolute threshold
pub fn classify_trend(slope: f64, threshold: f64) -> Trend {
    if slope > threshold {
        Trend::Growing
    } else if slope < -threshold {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Trend of the net-flow series
pub fn analyze_profitability(monthly: &[MonthlyFinancialData], config: &TrendConfig) -> Trend {
    let net: Vec<f64> = monthly.iter().map(|m| m.net_flow).collect();
    classify_trend(calculate_trend(&net), config.profitability_threshold)
}

/// Classify revenue, expense and profitability trends in one pass
pub fn analyze_trends(monthly: &[MonthlyFinancialData], config: &TrendConfig) -> TrendAnalysis {
    let income: Vec<f64> = monthly.iter().map(|m| m.income).collect();
    let expense: Vec<f64> = monthly.iter().map(|m| m.expense).collect();
    let net: Vec<f64> = monthly.iter().map(|m| m.net_flow).collect();

    let revenue_slope = calculate_trend(&income);
    let expense_slope = calculate_trend(&expense);
    let net_flow_slope = calculate_trend(&net);

    TrendAnalysis {
        revenue: classify_trend(revenue_slope, config.slope_threshold),
        expenses: classify_trend(expense_slope, config.slope_threshold),
        profitability: classify_trend(net_flow_slope, config.profitability_threshold),
        revenue_slope,
        expense_slope,
        net_flow_slope,
    }
}

/// Coefficient-of-variation heuristic for seasonal income
pub fn detect_seasonality(
    monthly: &[MonthlyFinancialData],
    config: &SeasonalityConfig,
) -> Seasonality {
    if monthly.len() < config.min_months {
        return Seasonality::default();
    }

    let income: Vec<f64> = monthly.iter().map(|m| m.income).collect();
    let mean = stats::mean(&income);
    let std_dev = stats::std_dev(&income);
    let cov = stats::coefficient_of_variation(&income);

    if cov <= config.cov_threshold {
        return Seasonality::default();
    }

    let peaks = monthly
        .iter()
        .filter(|m| m.income > mean + std_dev)
        .map(|m| m.month.clone())
        .collect();

    Seasonality {
        detected: true,
        pattern: Some("monthly".to_string()),
        peaks,
    }
}
