//! Analytics command implementations (forecast, anomalies, alerts, feed, budget)

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use opme_core::analytics::format::{format_brl, format_percent};
use opme_core::analytics::{AlertSeverity, BudgetComparison, BudgetItem, SmartAlert};
use opme_core::db::Database;
use opme_core::FinancialAnalyzer;

use super::truncate;

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn cmd_forecast(
    db: &Database,
    analyzer: &FinancialAnalyzer,
    days: u32,
    months: u32,
    json: bool,
) -> Result<()> {
    let monthly = db.monthly_financial_data(months)?;
    let forecast = analyzer.generate_forecast(&monthly, days);

    if json {
        return print_json(&forecast);
    }

    println!();
    println!("📈 Forecast ({} days, {} months of history)", days, forecast.data_points);
    println!("   ─────────────────────────────────────────────────────────────");

    if forecast.periods.is_empty() {
        println!("   No paid history yet. Import the ledger first.");
        println!();
        return Ok(());
    }

    println!(
        "   {:<10} {:>16} {:>16} {:>16} {:>6}",
        "DATE", "REVENUE", "EXPENSES", "CASH FLOW", "CONF"
    );
    for period in &forecast.periods {
        println!(
            "   {:<10} {:>16} {:>16} {:>16} {:>5.0}%",
            period.date.format("%d/%m/%Y"),
            format_brl(period.revenue.predicted),
            format_brl(period.expenses.predicted),
            format_brl(period.cash_flow.predicted),
            period.cash_flow.confidence,
        );
    }

    println!();
    println!(
        "   Trends: revenue {}, expenses {}, profitability {}",
        forecast.trends.revenue, forecast.trends.expenses, forecast.trends.profitability
    );
    if forecast.seasonality.detected {
        println!(
            "   Seasonality: peaks in {}",
            forecast.seasonality.peaks.join(", ")
        );
    }
    println!("   Accuracy: {:.1}%", forecast.accuracy);
    println!();

    Ok(())
}

pub fn cmd_anomalies(
    db: &Database,
    analyzer: &FinancialAnalyzer,
    months: u32,
    json: bool,
) -> Result<()> {
    let monthly = db.monthly_financial_data(months)?;
    let anomalies = analyzer.detect_anomalies(&monthly);

    if json {
        return print_json(&anomalies);
    }

    println!();
    if anomalies.is_empty() {
        println!("✅ No anomalies in the last months.");
        println!();
        return Ok(());
    }

    println!("🔎 {} anomal{} found", anomalies.len(), if anomalies.len() == 1 { "y" } else { "ies" });
    for anomaly in &anomalies {
        println!(
            "   [{}] {} {:<8} {} (z={:.2})",
            anomaly.severity.as_str(),
            anomaly.date,
            anomaly.anomaly_type.as_str(),
            format_percent(anomaly.deviation),
            anomaly.z_score,
        );
        println!("      {}", anomaly.description);
    }
    println!();

    Ok(())
}

fn severity_icon(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Critical => "🔴",
        AlertSeverity::High => "🟠",
        AlertSeverity::Medium => "🟡",
        AlertSeverity::Low => "🟢",
    }
}

fn print_alerts(alerts: &[SmartAlert]) {
    for alert in alerts {
        println!(
            "   {} {} [{}]",
            severity_icon(alert.severity),
            alert.title,
            alert.category
        );
        println!("      {}", alert.message);
    }
}

/// Generate smart alerts; with `save`, persist them to the feed
pub fn cmd_alerts(
    db: &Database,
    analyzer: &FinancialAnalyzer,
    days: u32,
    months: u32,
    save: bool,
    json: bool,
) -> Result<()> {
    let monthly = db.monthly_financial_data(months)?;
    let accounts = db.list_financial_accounts()?;
    let snapshot = analyzer.snapshot(&accounts, &monthly, days);

    if save && !snapshot.alerts.is_empty() {
        let ids = db.save_smart_alerts(&snapshot.alerts)?;
        db.log_audit(
            "cli",
            "save_smart_alerts",
            Some("alerta_financeiro"),
            None,
            Some(&format!("{} alerts", ids.len())),
        )?;
    }

    if json {
        return print_json(&snapshot.alerts);
    }

    println!();
    if snapshot.alerts.is_empty() {
        println!("✅ No alerts.");
    } else {
        println!("🔔 {} alert(s)", snapshot.alerts.len());
        print_alerts(&snapshot.alerts);
        if save {
            println!();
            println!("   Saved to the alert feed. Run 'opme feed' to see it.");
        }
    }
    println!();

    Ok(())
}

/// Show the persisted alert feed
pub fn cmd_feed(db: &Database, unread_only: bool, limit: i64) -> Result<()> {
    let alerts = db.list_alerts(unread_only, limit.clamp(1, 500))?;

    println!();
    if alerts.is_empty() {
        println!("   No alerts in the feed.");
        println!();
        return Ok(());
    }

    println!(
        "   {:<5} {:<10} {:<40} {:<12} {}",
        "ID", "SEVERITY", "TITLE", "SOURCE", "READ"
    );
    println!("   {}", "-".repeat(76));
    for alert in &alerts {
        println!(
            "   {:<5} {:<10} {:<40} {:<12} {}",
            alert.id,
            alert.severity.as_str(),
            truncate(&alert.title, 40),
            alert.source.as_str(),
            if alert.read { "✓" } else { "" }
        );
    }
    println!();

    Ok(())
}

pub fn cmd_feed_read(db: &Database, id: i64) -> Result<()> {
    db.mark_alert_read(id)
        .with_context(|| format!("Failed to mark alert {} as read", id))?;
    db.log_audit("cli", "read", Some("alerta_financeiro"), Some(id), None)?;
    println!("✅ Alert {} marked as read", id);
    Ok(())
}

/// Read budget items from a JSON file
pub fn load_budget(file: &Path) -> Result<Vec<BudgetItem>> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid budget file {}", file.display()))
}

pub fn run_budget(
    db: &Database,
    analyzer: &FinancialAnalyzer,
    budget: &[BudgetItem],
    start: &str,
    end: &str,
) -> Result<BudgetComparison> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("Invalid start date: {}", start))?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
        .with_context(|| format!("Invalid end date: {}", end))?;
    if start > end {
        bail!("Start date must not be after end date");
    }

    let accounts = db.list_financial_accounts()?;
    Ok(analyzer.compare_budget(&accounts, budget, start, end))
}

pub fn cmd_budget(
    db: &Database,
    analyzer: &FinancialAnalyzer,
    file: &Path,
    start: &str,
    end: &str,
    json: bool,
) -> Result<()> {
    let budget = load_budget(file)?;
    let comparison = run_budget(db, analyzer, &budget, start, end)?;

    if json {
        return print_json(&comparison);
    }

    println!();
    println!(
        "💼 Budget {} → {}",
        comparison.period.start.format("%d/%m/%Y"),
        comparison.period.end.format("%d/%m/%Y")
    );
    println!(
        "   {:<20} {:>16} {:>16} {:>10} {}",
        "CATEGORY", "BUDGETED", "ACTUAL", "VAR", "STATUS"
    );
    for c in &comparison.categories {
        println!(
            "   {:<20} {:>16} {:>16} {:>10} {}",
            truncate(&c.category, 20),
            format_brl(c.budgeted),
            format_brl(c.actual),
            format_percent(c.variance_percent),
            c.status
        );
    }
    let s = &comparison.summary;
    println!();
    println!(
        "   Total: {} of {} ({})",
        format_brl(s.total_actual),
        format_brl(s.total_budgeted),
        format_percent(s.total_variance_percent)
    );
    println!(
        "   Over: {}  Under: {}  On track: {}",
        s.categories_over, s.categories_under, s.categories_on_track
    );
    println!();

    Ok(())
}
