//! Budget vs actual comparison per expense category

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::config::BudgetConfig;
use super::types::{
    AccountStatus, AccountType, BudgetComparison, BudgetItem, BudgetPeriod, BudgetStatus,
    BudgetSummary, CategoryComparison, FinancialAccount,
};

/// Compare planned spend with paid payables in `[start, end]` (inclusive)
///
/// Categories appear in budget order (first occurrence; repeated lines are
/// summed), followed by unbudgeted categories that had spend (alphabetical)
/// with `budgeted = 0`.
pub fn compare_budget(
    accounts: &[FinancialAccount],
    budget: &[BudgetItem],
    start: NaiveDate,
    end: NaiveDate,
    config: &BudgetConfig,
) -> BudgetComparison {
    let mut actual_by_category: BTreeMap<&str, f64> = BTreeMap::new();
    for account in accounts.iter().filter(|a| {
        a.account_type == AccountType::Payable
            && a.status == AccountStatus::Paid
            && (start..=end).contains(&a.effective_date())
    }) {
        *actual_by_category.entry(account.category.as_str()).or_default() += account.final_amount;
    }

    // Repeated budget lines for one category are summed into a single entry
    let mut planned: Vec<(&str, f64)> = Vec::with_capacity(budget.len());
    for item in budget {
        match planned.iter_mut().find(|(category, _)| *category == item.category) {
            Some((_, amount)) => *amount += item.amount,
            None => planned.push((item.category.as_str(), item.amount)),
        }
    }

    let mut categories: Vec<CategoryComparison> = Vec::with_capacity(planned.len());
    for (category, amount) in planned {
        let actual = actual_by_category.remove(category).unwrap_or(0.0);
        categories.push(compare_category(category, amount, actual, config));
    }
    for (category, actual) in actual_by_category {
        categories.push(compare_category(category, 0.0, actual, config));
    }

    let total_budgeted: f64 = categories.iter().map(|c| c.budgeted).sum();
    let total_actual: f64 = categories.iter().map(|c| c.actual).sum();
    let total_variance = total_actual - total_budgeted;

    let count = |status: BudgetStatus| categories.iter().filter(|c| c.status == status).count();
    let summary = BudgetSummary {
        total_budgeted,
        total_actual,
        total_variance,
        total_variance_percent: variance_percent(total_budgeted, total_variance),
        categories_over: count(BudgetStatus::Over),
        categories_under: count(BudgetStatus::Under),
        categories_on_track: count(BudgetStatus::OnTrack),
    };

    BudgetComparison {
        period: BudgetPeriod { start, end },
        categories,
        summary,
    }
}

fn compare_category(category: &str, budgeted: f64, actual: f64, config: &BudgetConfig) -> CategoryComparison {
    let variance = actual - budgeted;
    let variance_percent = variance_percent(budgeted, variance);

    let status = if variance_percent.abs() <= config.tolerance_percent {
        BudgetStatus::OnTrack
    } else if variance > 0.0 {
        BudgetStatus::Over
    } else {
        BudgetStatus::Under
    };

    CategoryComparison {
        category: category.to_string(),
        budgeted,
        actual,
        variance,
        variance_percent,
        status,
    }
}

/// Variance as a percentage of the budget; spend against a zero budget is 100%
fn variance_percent(budgeted: f64, variance: f64) -> f64 {
    if budgeted.abs() < f64::EPSILON {
        if variance.abs() < f64::EPSILON {
            0.0
        } else {
            100.0
        }
    } else {
        variance / budgeted * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn paid(category: &str, amount: f64, paid_on: NaiveDate) -> FinancialAccount {
        FinancialAccount {
            id: 0,
            description: format!("{} payment", category),
            account_type: AccountType::Payable,
            status: AccountStatus::Paid,
            amount,
            final_amount: amount,
            due_date: paid_on,
            payment_date: Some(paid_on),
            category: category.to_string(),
        }
    }

    fn item(category: &str, amount: f64) -> BudgetItem {
        BudgetItem {
            category: category.to_string(),
            amount,
        }
    }

    #[test]
    fn test_within_tolerance_is_on_track() {
        let accounts = vec![paid("logistics", 1050.0, date(1, 15))];
        let result = compare_budget(
            &accounts,
            &[item("logistics", 1000.0)],
            date(1, 1),
            date(1, 31),
            &BudgetConfig::default(),
        );

        assert_eq!(result.categories.len(), 1);
        assert_eq!(result.categories[0].status, BudgetStatus::OnTrack);
        assert!((result.categories[0].variance_percent - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_over_budget() {
        let accounts = vec![
            paid("suppliers", 700.0, date(1, 5)),
            paid("suppliers", 500.0, date(1, 20)),
        ];
        let result = compare_budget(
            &accounts,
            &[item("suppliers", 1000.0)],
            date(1, 1),
            date(1, 31),
            &BudgetConfig::default(),
        );

        let c = &result.categories[0];
        assert_eq!(c.status, BudgetStatus::Over);
        assert!((c.actual - 1200.0).abs() < 1e-9);
        assert!((c.variance - 200.0).abs() < 1e-9);
        assert!((c.variance_percent - 20.0).abs() < 1e-9);
        assert_eq!(result.summary.categories_over, 1);
    }

    #[test]
    fn test_repeated_budget_lines_are_merged() {
        let accounts = vec![paid("suppliers", 1500.0, date(1, 5))];
        let result = compare_budget(
            &accounts,
            &[
                item("suppliers", 1000.0),
                item("rent", 800.0),
                item("suppliers", 500.0),
            ],
            date(1, 1),
            date(1, 31),
            &BudgetConfig::default(),
        );

        assert_eq!(result.categories.len(), 2);
        let c = &result.categories[0];
        assert_eq!(c.category, "suppliers");
        assert!((c.budgeted - 1500.0).abs() < 1e-9);
        assert!((c.actual - 1500.0).abs() < 1e-9);
        assert_eq!(c.status, BudgetStatus::OnTrack);
        assert_eq!(result.categories[1].category, "rent");
        assert!((result.summary.total_budgeted - 2300.0).abs() < 1e-9);
        assert!((result.summary.total_actual - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_under_budget_and_zero_spend() {
        let accounts = vec![paid("marketing", 500.0, date(1, 10))];
        let result = compare_budget(
            &accounts,
            &[item("marketing", 1000.0), item("training", 300.0)],
            date(1, 1),
            date(1, 31),
            &BudgetConfig::default(),
        );

        assert_eq!(result.categories[0].status, BudgetStatus::Under);
        assert_eq!(result.categories[1].actual, 0.0);
        assert_eq!(result.categories[1].status, BudgetStatus::Under);
        assert!((result.categories[1].variance_percent + 100.0).abs() < 1e-9);
        assert_eq!(result.summary.categories_under, 2);
    }

    #[test]
    fn test_period_bounds_inclusive_and_filters() {
        let mut pending = paid("rent", 999.0, date(1, 10));
        pending.status = AccountStatus::Pending;
        let mut receivable = paid("rent", 999.0, date(1, 10));
        receivable.account_type = AccountType::Receivable;

        let accounts = vec![
            paid("rent", 100.0, date(1, 1)),
            paid("rent", 100.0, date(1, 31)),
            paid("rent", 999.0, date(2, 1)),
            pending,
            receivable,
        ];
        let result = compare_budget(
            &accounts,
            &[item("rent", 200.0)],
            date(1, 1),
            date(1, 31),
            &BudgetConfig::default(),
        );

        assert!((result.categories[0].actual - 200.0).abs() < 1e-9);
        assert_eq!(result.categories[0].status, BudgetStatus::OnTrack);
    }

    #[test]
    fn test_payment_date_wins_over_due_date() {
        let mut late = paid("taxes", 400.0, date(2, 3));
        late.due_date = date(1, 28);

        let result = compare_budget(
            &[late],
            &[item("taxes", 400.0)],
            date(1, 1),
            date(1, 31),
            &BudgetConfig::default(),
        );
        assert_eq!(result.categories[0].actual, 0.0);
    }

    #[test]
    fn test_unbudgeted_spend_reported() {
        let accounts = vec![
            paid("travel", 300.0, date(1, 3)),
            paid("events", 50.0, date(1, 4)),
        ];
        let result = compare_budget(
            &accounts,
            &[item("suppliers", 1000.0)],
            date(1, 1),
            date(1, 31),
            &BudgetConfig::default(),
        );

        let names: Vec<&str> = result.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["suppliers", "events", "travel"]);

        let travel = &result.categories[2];
        assert_eq!(travel.budgeted, 0.0);
        assert_eq!(travel.status, BudgetStatus::Over);
        assert_eq!(travel.variance_percent, 100.0);

        assert!((result.summary.total_actual - 350.0).abs() < 1e-9);
        assert!((result.summary.total_budgeted - 1000.0).abs() < 1e-9);
        assert!((result.summary.total_variance + 650.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_budget_and_accounts() {
        let result = compare_budget(&[], &[], date(1, 1), date(1, 31), &BudgetConfig::default());
        assert!(result.categories.is_empty());
        assert_eq!(result.summary.total_variance_percent, 0.0);
        assert_eq!(result.period.start, date(1, 1));
    }
}
