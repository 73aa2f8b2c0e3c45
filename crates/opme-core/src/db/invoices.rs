//! Invoice and installment operations (faturas, parcelas)

use chrono::NaiveDate;
use rusqlite::params;

use super::{date_column, enum_column, opt_date_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Installment, Invoice, InvoiceStatus, NewInvoice};

impl Database {
    pub fn insert_invoice(&self, invoice: &NewInvoice) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO faturas (numero, cliente_id, valor_total, data_emissao, data_vencimento, status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                invoice.number,
                invoice.client_id,
                invoice.total,
                invoice.issue_date.to_string(),
                invoice.due_date.to_string(),
                invoice.status.as_str(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List invoices with their client name
    ///
    /// `overdue_as_of` keeps only open invoices (pending or overdue) due before that date.
    pub fn list_invoices(
        &self,
        status: Option<InvoiceStatus>,
        overdue_as_of: Option<NaiveDate>,
        limit: i64,
    ) -> Result<Vec<Invoice>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT f.id, f.numero, f.cliente_id, c.nome, f.valor_total, f.data_emissao,
                   f.data_vencimento, f.status, f.created_at
            FROM faturas f
            LEFT JOIN clientes c ON c.id = f.cliente_id
            WHERE (?1 IS NULL OR f.status = ?1)
              AND (?2 IS NULL OR (f.status IN ('pending', 'overdue') AND f.data_vencimento < ?2))
            ORDER BY f.data_vencimento, f.id
            LIMIT ?3
            "#,
        )?;

        let invoices = stmt
            .query_map(
                params![
                    status.map(|s| s.as_str()),
                    overdue_as_of.map(|d| d.to_string()),
                    limit
                ],
                |row| {
                    let created_at: String = row.get(8)?;
                    Ok(Invoice {
                        id: row.get(0)?,
                        number: row.get(1)?,
                        client_id: row.get(2)?,
                        client_name: row.get(3)?,
                        total: row.get(4)?,
                        issue_date: date_column(row, 5)?,
                        due_date: date_column(row, 6)?,
                        status: enum_column(row, 7)?,
                        created_at: parse_datetime(&created_at),
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(invoices)
    }

    pub fn update_invoice_status(&self, id: i64, status: InvoiceStatus) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE faturas SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![status.as_str(), id],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("Invoice {}", id)));
        }
        Ok(())
    }

    pub fn insert_installment(
        &self,
        invoice_id: i64,
        number: i32,
        amount: f64,
        due_date: NaiveDate,
    ) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO parcelas (fatura_id, numero, valor, data_vencimento) VALUES (?, ?, ?, ?)",
            params![invoice_id, number, amount, due_date.to_string()],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Installments of one invoice in installment order
    pub fn list_installments(&self, invoice_id: i64) -> Result<Vec<Installment>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, fatura_id, numero, valor, data_vencimento, data_pagamento, status
            FROM parcelas
            WHERE fatura_id = ?
            ORDER BY numero
            "#,
        )?;

        let installments = stmt
            .query_map(params![invoice_id], |row| {
                Ok(Installment {
                    id: row.get(0)?,
                    invoice_id: row.get(1)?,
                    number: row.get(2)?,
                    amount: row.get(3)?,
                    due_date: date_column(row, 4)?,
                    payment_date: opt_date_column(row, 5)?,
                    status: enum_column(row, 6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(installments)
    }
}
