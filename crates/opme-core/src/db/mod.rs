//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `clients` - Hospitals, clinics and health plans (clientes)
//! - `accounts` - Receivables/payables (contas_financeiras) and the monthly aggregation
//! - `transactions` - Bank statement lines (transacoes_bancarias)
//! - `invoices` - Invoices and installments (faturas, parcelas)
//! - `alerts` - Persisted alerts (alertas_financeiros) and the audit log
//! - `suggestions` - Improvement suggestions (sugestoes_financeiras)

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod accounts;
mod alerts;
mod clients;
mod invoices;
mod suggestions;
mod transactions;

pub use transactions::TransactionQuery;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "OPME_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"opme-fin-salt-v1";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Read a `YYYY-MM-DD` column into a NaiveDate
pub(crate) fn date_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<chrono::NaiveDate> {
    let s: String = row.get(idx)?;
    chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Read an optional `YYYY-MM-DD` column
pub(crate) fn opt_date_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<chrono::NaiveDate>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

/// Parse an enum stored as TEXT, surfacing unknown values as conversion errors
pub(crate) fn enum_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let s: String = row.get(idx)?;
    s.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(Error::InvalidData(e)),
        )
    })
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Create a new encrypted database connection pool
    ///
    /// Requires `OPME_DB_KEY`; the SQLCipher key is derived from it via Argon2.
    /// Use `new_unencrypted()` for development/testing.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key = derive_key(pass)?;
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", key);

            // Key every new pooled connection
            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&key_pragma)?;
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            let manager =
                manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because every pooled
    /// connection to `:memory:` would see a different database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "opme_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Check if the database is encrypted
    pub fn is_encrypted(&self) -> Result<bool> {
        let conn = self.conn()?;
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Hospitals, clinics, health plans
            CREATE TABLE IF NOT EXISTS clientes (
                id INTEGER PRIMARY KEY,
                nome TEXT NOT NULL,
                documento TEXT UNIQUE,                     -- CNPJ/CPF
                email TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Receivables and payables
            CREATE TABLE IF NOT EXISTS contas_financeiras (
                id INTEGER PRIMARY KEY,
                descricao TEXT NOT NULL,
                tipo TEXT NOT NULL,                        -- receivable, payable
                status TEXT NOT NULL DEFAULT 'pending',    -- pending, paid, overdue
                valor REAL NOT NULL,
                valor_final REAL NOT NULL,                 -- after interest, fines, discounts
                data_vencimento DATE NOT NULL,
                data_pagamento DATE,
                categoria TEXT NOT NULL DEFAULT 'geral',
                cliente_id INTEGER REFERENCES clientes(id),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_contas_vencimento ON contas_financeiras(data_vencimento);
            CREATE INDEX IF NOT EXISTS idx_contas_tipo_status ON contas_financeiras(tipo, status);

            -- Bank statement lines
            CREATE TABLE IF NOT EXISTS transacoes_bancarias (
                id INTEGER PRIMARY KEY,
                data DATE NOT NULL,
                descricao TEXT NOT NULL,
                valor REAL NOT NULL,                       -- always positive
                tipo TEXT NOT NULL,                        -- credit, debit
                categoria TEXT,
                conta TEXT NOT NULL DEFAULT '',           -- '' when unknown (keeps UNIQUE effective)
                conciliado INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(data, descricao, valor, tipo, conta)
            );

            CREATE INDEX IF NOT EXISTS idx_transacoes_data ON transacoes_bancarias(data);

            -- Invoices
            CREATE TABLE IF NOT EXISTS faturas (
                id INTEGER PRIMARY KEY,
                numero TEXT NOT NULL UNIQUE,
                cliente_id INTEGER REFERENCES clientes(id),
                valor_total REAL NOT NULL,
                data_emissao DATE NOT NULL,
                data_vencimento DATE NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',    -- pending, paid, overdue, cancelled
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_faturas_status ON faturas(status);

            -- Invoice installments
            CREATE TABLE IF NOT EXISTS parcelas (
                id INTEGER PRIMARY KEY,
                fatura_id INTEGER NOT NULL REFERENCES faturas(id) ON DELETE CASCADE,
                numero INTEGER NOT NULL,
                valor REAL NOT NULL,
                data_vencimento DATE NOT NULL,
                data_pagamento DATE,
                status TEXT NOT NULL DEFAULT 'pending',
                UNIQUE(fatura_id, numero)
            );

            -- Alerts raised by the agent or saved from smart alerts
            CREATE TABLE IF NOT EXISTS alertas_financeiros (
                id INTEGER PRIMARY KEY,
                tipo TEXT NOT NULL,                        -- warning, danger, info, success
                severidade TEXT NOT NULL,                  -- critical, high, medium, low
                titulo TEXT NOT NULL,
                mensagem TEXT NOT NULL,
                categoria TEXT NOT NULL,
                metadata TEXT,                             -- JSON
                origem TEXT NOT NULL DEFAULT 'agent',      -- agent, smart_alert, manual
                lido INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_alertas_lido ON alertas_financeiros(lido, created_at);

            -- Improvement suggestions
            CREATE TABLE IF NOT EXISTS sugestoes_financeiras (
                id INTEGER PRIMARY KEY,
                tipo TEXT NOT NULL,
                titulo TEXT NOT NULL,
                descricao TEXT NOT NULL,
                impacto_estimado REAL,
                status TEXT NOT NULL DEFAULT 'pending',    -- pending, accepted, dismissed
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Audit log
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                usuario TEXT NOT NULL,
                action TEXT NOT NULL,
                entity_type TEXT,
                entity_id INTEGER,
                details TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

/// Audit log entry
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub user: String,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
}
