//! Persisted alert and audit log operations

use rusqlite::params;

use super::{enum_column, parse_datetime, AuditEntry, Database};
use crate::analytics::SmartAlert;
use crate::error::{Error, Result};
use crate::models::{AlertSource, NewAlert, StoredAlert};

impl Database {
    pub fn insert_alert(&self, alert: &NewAlert) -> Result<i64> {
        let conn = self.conn()?;
        let metadata = alert
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            r#"
            INSERT INTO alertas_financeiros (tipo, severidade, titulo, mensagem, categoria, metadata, origem)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                alert.alert_type.as_str(),
                alert.severity.as_str(),
                alert.title,
                alert.message,
                alert.category,
                metadata,
                alert.source.as_str(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Persist generated smart alerts into the alert feed
    pub fn save_smart_alerts(&self, alerts: &[SmartAlert]) -> Result<Vec<i64>> {
        alerts
            .iter()
            .map(|a| {
                self.insert_alert(&NewAlert {
                    alert_type: a.alert_type,
                    severity: a.severity,
                    title: a.title.clone(),
                    message: a.message.clone(),
                    category: a.category.clone(),
                    metadata: a.metadata.clone(),
                    source: AlertSource::SmartAlert,
                })
            })
            .collect()
    }

    /// List persisted alerts, newest first
    pub fn list_alerts(&self, unread_only: bool, limit: i64) -> Result<Vec<StoredAlert>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, tipo, severidade, titulo, mensagem, categoria, metadata, origem, lido, created_at
            FROM alertas_financeiros
            WHERE (?1 = 0 OR lido = 0)
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )?;

        let alerts = stmt
            .query_map(params![unread_only, limit], |row| {
                let metadata: Option<String> = row.get(6)?;
                let created_at: String = row.get(9)?;
                Ok(StoredAlert {
                    id: row.get(0)?,
                    alert_type: enum_column(row, 1)?,
                    severity: enum_column(row, 2)?,
                    title: row.get(3)?,
                    message: row.get(4)?,
                    category: row.get(5)?,
                    metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
                    source: enum_column(row, 7)?,
                    read: row.get(8)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(alerts)
    }

    pub fn mark_alert_read(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE alertas_financeiros SET lido = 1 WHERE id = ?",
            params![id],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("Alert {}", id)));
        }
        Ok(())
    }

    pub fn count_unread_alerts(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM alertas_financeiros WHERE lido = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Log an audit event
    pub fn log_audit(
        &self,
        user: &str,
        action: &str,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        details: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO audit_log (usuario, action, entity_type, entity_id, details)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![user, action, entity_type, entity_id, details],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List audit log entries, newest first
    pub fn list_audit_log(&self, limit: i64) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, timestamp, usuario, action, entity_type, entity_id, details
            FROM audit_log
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let entries = stmt
            .query_map(params![limit], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    user: row.get(2)?,
                    action: row.get(3)?,
                    entity_type: row.get(4)?,
                    entity_id: row.get(5)?,
                    details: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}
