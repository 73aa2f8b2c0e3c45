//! Improvement suggestions (sugestoes_financeiras)

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{NewSuggestion, Suggestion};

impl Database {
    pub fn insert_suggestion(&self, suggestion: &NewSuggestion) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO sugestoes_financeiras (tipo, titulo, descricao, impacto_estimado) VALUES (?, ?, ?, ?)",
            params![
                suggestion.suggestion_type,
                suggestion.title,
                suggestion.description,
                suggestion.estimated_impact,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List suggestions, newest first
    pub fn list_suggestions(&self, status: Option<&str>) -> Result<Vec<Suggestion>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, tipo, titulo, descricao, impacto_estimado, status, created_at
            FROM sugestoes_financeiras
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, id DESC
            "#,
        )?;

        let suggestions = stmt
            .query_map(params![status], |row| {
                let created_at: String = row.get(6)?;
                Ok(Suggestion {
                    id: row.get(0)?,
                    suggestion_type: row.get(1)?,
                    title: row.get(2)?,
                    description: row.get(3)?,
                    estimated_impact: row.get(4)?,
                    status: row.get(5)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(suggestions)
    }
}
