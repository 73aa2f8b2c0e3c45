//! Rule-based smart alerts
//!
//! Each rule looks at one signal (a trend, the first forecast period, the
//! receivables/payables ledger, an anomaly, forecast accuracy) and emits at
//! most one alert, except the anomaly rule which emits one per high-severity
//! anomaly. Rules are independent; the result is stable-sorted by severity so
//! alerts of equal severity keep rule order.

use chrono::{Duration, NaiveDate};
use serde_json::json;

use super::config::AlertConfig;
use super::format::format_brl;
use super::types::{
    AccountStatus, AccountType, AlertKind, AlertSeverity, AnomalyDetection, AnomalySeverity,
    AnomalyType, FinancialAccount, ForecastData, SmartAlert, Trend,
};

/// Collects alerts and hands out sequential ids
struct AlertBuilder {
    today: NaiveDate,
    alerts: Vec<SmartAlert>,
}

impl AlertBuilder {
    fn new(today: NaiveDate) -> Self {
        Self {
            today,
            alerts: Vec::new(),
        }
    }

    fn push(
        &mut self,
        alert_type: AlertKind,
        severity: AlertSeverity,
        category: &str,
        title: impl Into<String>,
        message: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) {
        let id = format!("alert-{}", self.alerts.len() + 1);
        self.alerts.push(SmartAlert {
            id,
            alert_type,
            severity,
            title: title.into(),
            message: message.into(),
            category: category.to_string(),
            date: self.today,
            metadata,
        });
    }

    fn finish(mut self) -> Vec<SmartAlert> {
        self.alerts.sort_by_key(|a| a.severity.rank());
        self.alerts
    }
}

/// Generate alerts as of `today`
pub fn generate_smart_alerts(
    accounts: &[FinancialAccount],
    forecast: &ForecastData,
    anomalies: &[AnomalyDetection],
    today: NaiveDate,
    config: &AlertConfig,
) -> Vec<SmartAlert> {
    let mut builder = AlertBuilder::new(today);

    if forecast.trends.revenue == Trend::Declining {
        builder.push(
            AlertKind::Warning,
            AlertSeverity::High,
            "revenue",
            "Receita em queda",
            "A receita mensal apresenta tendência de queda. Revise a carteira de clientes e os pedidos em aberto.",
            Some(json!({ "slope": forecast.trends.revenue_slope })),
        );
    }

    if forecast.trends.expenses == Trend::Growing {
        builder.push(
            AlertKind::Warning,
            AlertSeverity::Medium,
            "expenses",
            "Despesas em alta",
            "As despesas mensais apresentam tendência de crescimento. Avalie fornecedores e custos operacionais.",
            Some(json!({ "slope": forecast.trends.expense_slope })),
        );
    }

    if forecast.trends.profitability == Trend::Declining {
        builder.push(
            AlertKind::Danger,
            AlertSeverity::Critical,
            "profitability",
            "Lucratividade em queda",
            "O fluxo líquido mensal está diminuindo. A margem da operação está sendo comprimida.",
            Some(json!({ "slope": forecast.trends.net_flow_slope })),
        );
    }

    if let Some(first) = forecast.periods.first() {
        let predicted = first.cash_flow.predicted;
        if predicted < 0.0 {
            builder.push(
                AlertKind::Danger,
                AlertSeverity::Critical,
                "cash_flow",
                "Fluxo de caixa negativo previsto",
                format!(
                    "A previsão para o próximo período indica déficit de {} até {}.",
                    format_brl(predicted.abs()),
                    first.date.format("%d/%m/%Y"),
                ),
                Some(json!({ "predicted": predicted, "date": first.date })),
            );
        }
    }

    let overdue: Vec<&FinancialAccount> = accounts
        .iter()
        .filter(|a| a.account_type == AccountType::Receivable && a.status == AccountStatus::Overdue)
        .collect();
    if !overdue.is_empty() {
        let total: f64 = overdue.iter().map(|a| a.final_amount).sum();
        let severity = if total > config.overdue_high_amount {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        builder.push(
            AlertKind::Warning,
            severity,
            "receivables",
            "Contas a receber vencidas",
            format!(
                "{} conta(s) a receber vencida(s) totalizando {}.",
                overdue.len(),
                format_brl(total),
            ),
            Some(json!({ "count": overdue.len(), "total": total })),
        );
    }

    let horizon = today + Duration::days(config.upcoming_payables_days);
    let upcoming: Vec<&FinancialAccount> = accounts
        .iter()
        .filter(|a| {
            a.account_type == AccountType::Payable
                && a.status == AccountStatus::Pending
                && a.due_date >= today
                && a.due_date <= horizon
        })
        .collect();
    if !upcoming.is_empty() {
        let total: f64 = upcoming.iter().map(|a| a.final_amount).sum();
        builder.push(
            AlertKind::Info,
            AlertSeverity::Medium,
            "payables",
            "Pagamentos próximos",
            format!(
                "{} conta(s) a pagar vencem nos próximos {} dias, totalizando {}.",
                upcoming.len(),
                config.upcoming_payables_days,
                format_brl(total),
            ),
            Some(json!({ "count": upcoming.len(), "total": total })),
        );
    }

    // Only high-severity anomalies become alerts
    for anomaly in anomalies.iter().filter(|a| a.severity == AnomalySeverity::High) {
        let title = match anomaly.anomaly_type {
            AnomalyType::Revenue => "Anomalia na receita",
            AnomalyType::Expense => "Anomalia nas despesas",
        };
        builder.push(
            AlertKind::Warning,
            AlertSeverity::High,
            "anomaly",
            title,
            anomaly.description.clone(),
            Some(json!({
                "month": anomaly.date,
                "anomaly_type": anomaly.anomaly_type,
                "z_score": anomaly.z_score,
                "deviation": anomaly.deviation,
            })),
        );
    }

    if forecast.accuracy > config.high_accuracy {
        builder.push(
            AlertKind::Success,
            AlertSeverity::Low,
            "forecast",
            "Previsão confiável",
            format!(
                "O histórico é estável: precisão estimada da previsão de {:.0}%.",
                forecast.accuracy
            ),
            Some(json!({ "accuracy": forecast.accuracy })),
        );
    }

    builder.finish()
}
