//! Receivable/payable operations and the monthly aggregation feeding analytics

use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};
use rusqlite::params;

use super::{date_column, enum_column, opt_date_column, Database};
use crate::analytics::{AccountStatus, AccountType, FinancialAccount, MonthlyFinancialData};
use crate::error::{Error, Result};
use crate::models::NewFinancialAccount;

const ACCOUNT_COLUMNS: &str = "id, descricao, tipo, status, valor, valor_final, \
     data_vencimento, data_pagamento, categoria";

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<FinancialAccount> {
    Ok(FinancialAccount {
        id: row.get(0)?,
        description: row.get(1)?,
        account_type: enum_column(row, 2)?,
        status: enum_column(row, 3)?,
        amount: row.get(4)?,
        final_amount: row.get(5)?,
        due_date: date_column(row, 6)?,
        payment_date: opt_date_column(row, 7)?,
        category: row.get(8)?,
    })
}

/// First day of the month `back` months before `date`'s month
fn month_start(date: NaiveDate, back: u32) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    first.checked_sub_months(Months::new(back)).unwrap_or(first)
}

impl Database {
    pub fn insert_financial_account(&self, account: &NewFinancialAccount) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO contas_financeiras
                (descricao, tipo, status, valor, valor_final, data_vencimento, data_pagamento, categoria, cliente_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                account.description,
                account.account_type.as_str(),
                account.status.as_str(),
                account.amount,
                account.final_amount.unwrap_or(account.amount),
                account.due_date.to_string(),
                account.payment_date.map(|d| d.to_string()),
                account.category,
                account.client_id,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List every receivable/payable ordered by due date
    pub fn list_financial_accounts(&self) -> Result<Vec<FinancialAccount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM contas_financeiras ORDER BY data_vencimento, id",
            ACCOUNT_COLUMNS
        ))?;

        let accounts = stmt
            .query_map([], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// List accounts of one type with one status
    pub fn list_financial_accounts_by(
        &self,
        account_type: AccountType,
        status: AccountStatus,
    ) -> Result<Vec<FinancialAccount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM contas_financeiras WHERE tipo = ? AND status = ? ORDER BY data_vencimento, id",
            ACCOUNT_COLUMNS
        ))?;

        let accounts = stmt
            .query_map(
                params![account_type.as_str(), status.as_str()],
                row_to_account,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Settle or reopen an account
    pub fn update_account_status(
        &self,
        id: i64,
        status: AccountStatus,
        payment_date: Option<NaiveDate>,
    ) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE contas_financeiras SET status = ?, data_pagamento = ? WHERE id = ?",
            params![status.as_str(), payment_date.map(|d| d.to_string()), id],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("Financial account {}", id)));
        }
        Ok(())
    }

    /// Paid income/expense per month for the last `months` complete months
    pub fn monthly_financial_data(&self, months: u32) -> Result<Vec<MonthlyFinancialData>> {
        self.monthly_financial_data_at(months, chrono::Local::now().date_naive())
    }

    /// Paid income/expense per month for the `months` complete months before `as_of`'s month
    ///
    /// Receivables count as income and payables as expense, using `valor_final`
    /// placed by payment date (falling back to due date). Months without
    /// activity after the first month with data are filled with zeros.
    pub fn monthly_financial_data_at(
        &self,
        months: u32,
        as_of: NaiveDate,
    ) -> Result<Vec<MonthlyFinancialData>> {
        if months == 0 {
            return Ok(Vec::new());
        }

        let end = month_start(as_of, 0);
        let start = month_start(as_of, months);

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT strftime('%Y-%m', COALESCE(data_pagamento, data_vencimento)) AS mes,
                   SUM(CASE WHEN tipo = 'receivable' THEN valor_final ELSE 0 END),
                   SUM(CASE WHEN tipo = 'payable' THEN valor_final ELSE 0 END)
            FROM contas_financeiras
            WHERE status = 'paid'
              AND COALESCE(data_pagamento, data_vencimento) >= ?
              AND COALESCE(data_pagamento, data_vencimento) < ?
            GROUP BY mes
            "#,
        )?;

        let totals: HashMap<String, (f64, f64)> = stmt
            .query_map(params![start.to_string(), end.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, (row.get(1)?, row.get(2)?)))
            })?
            .collect::<std::result::Result<_, _>>()?;

        let mut series = Vec::with_capacity(months as usize);
        let mut seen_data = false;
        for back in (1..=months).rev() {
            let month = month_start(as_of, back).format("%Y-%m").to_string();
            match totals.get(&month) {
                Some(&(income, expense)) => {
                    seen_data = true;
                    series.push(MonthlyFinancialData::new(month, income, expense));
                }
                None if seen_data => series.push(MonthlyFinancialData::new(month, 0.0, 0.0)),
                None => {}
            }
        }

        Ok(series)
    }
}
