//! Bank statement operations (transacoes_bancarias)

use chrono::NaiveDate;
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::{date_column, enum_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{BankTransaction, NewBankTransaction};

/// Default number of rows returned by a search
pub const DEFAULT_SEARCH_LIMIT: i64 = 50;

/// Filters for searching bank transactions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Case-insensitive substring of the description
    pub search: Option<String>,
    /// Only rows without a category
    #[serde(default)]
    pub uncategorized_only: bool,
    pub limit: Option<i64>,
}

impl TransactionQuery {
    /// Build the WHERE clause and its bound parameters
    fn to_sql(&self) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(start) = self.start {
            conditions.push("data >= ?");
            values.push(start.to_string());
        }
        if let Some(end) = self.end {
            conditions.push("data <= ?");
            values.push(end.to_string());
        }
        if let Some(ref search) = self.search {
            conditions.push("descricao LIKE ?");
            values.push(format!("%{}%", search));
        }
        if self.uncategorized_only {
            conditions.push("(categoria IS NULL OR categoria = '')");
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (clause, values)
    }
}

impl Database {
    /// Insert a bank transaction; returns `None` when the same line already exists
    pub fn insert_bank_transaction(&self, tx: &NewBankTransaction) -> Result<Option<i64>> {
        let conn = self.conn()?;

        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO transacoes_bancarias (data, descricao, valor, tipo, categoria, conta)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.date.to_string(),
                tx.description,
                tx.amount.abs(),
                tx.kind.as_str(),
                tx.category,
                tx.bank_account.as_deref().unwrap_or(""),
            ],
        )?;

        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(conn.last_insert_rowid()))
    }

    /// Search bank transactions, newest first
    pub fn search_bank_transactions(&self, query: &TransactionQuery) -> Result<Vec<BankTransaction>> {
        let conn = self.conn()?;
        let (clause, mut values) = query.to_sql();
        values.push(query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).to_string());

        let sql = format!(
            r#"
            SELECT id, data, descricao, valor, tipo, categoria, conta, conciliado, created_at
            FROM transacoes_bancarias
            {}
            ORDER BY data DESC, id DESC
            LIMIT CAST(? AS INTEGER)
            "#,
            clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), |row| {
                let account: String = row.get(6)?;
                let created_at: String = row.get(8)?;
                Ok(BankTransaction {
                    id: row.get(0)?,
                    date: date_column(row, 1)?,
                    description: row.get(2)?,
                    amount: row.get(3)?,
                    kind: enum_column(row, 4)?,
                    category: row.get(5)?,
                    bank_account: (!account.is_empty()).then_some(account),
                    reconciled: row.get(7)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Set the category of a bank transaction
    pub fn categorize_transaction(&self, id: i64, category: &str) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE transacoes_bancarias SET categoria = ? WHERE id = ?",
            params![category, id],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("Bank transaction {}", id)));
        }
        Ok(())
    }

    /// Mark a bank transaction as reconciled against the ledger
    pub fn mark_transaction_reconciled(&self, id: i64, reconciled: bool) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE transacoes_bancarias SET conciliado = ? WHERE id = ?",
            params![reconciled, id],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("Bank transaction {}", id)));
        }
        Ok(())
    }
}
