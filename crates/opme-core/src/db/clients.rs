//! Client operations (clientes)

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::Client;

impl Database {
    /// Create or get a client by tax id (or by name when no tax id is given)
    pub fn upsert_client(&self, name: &str, tax_id: Option<&str>, email: Option<&str>) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = match tax_id {
            Some(doc) => conn
                .query_row(
                    "SELECT id FROM clientes WHERE documento = ?",
                    params![doc],
                    |row| row.get(0),
                )
                .ok(),
            None => conn
                .query_row(
                    "SELECT id FROM clientes WHERE nome = ? AND documento IS NULL",
                    params![name],
                    |row| row.get(0),
                )
                .ok(),
        };

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO clientes (nome, documento, email) VALUES (?, ?, ?)",
            params![name, tax_id, email],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn list_clients(&self) -> Result<Vec<Client>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, nome, documento, email, created_at FROM clientes ORDER BY nome")?;

        let clients = stmt
            .query_map([], |row| {
                let created_at: String = row.get(4)?;
                Ok(Client {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    tax_id: row.get(2)?,
                    email: row.get(3)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(clients)
    }
}
