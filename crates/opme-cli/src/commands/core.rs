//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_analyzer` / `llm_from_env` - Shared analytics and LLM setup
//! - `cmd_init` - Initialize the database
//! - `cmd_status` - Show database status

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use opme_core::db::{Database, DB_KEY_ENV};
use opme_core::{AnalyticsConfig, FinancialAnalyzer, LlmClient};
use tracing::warn;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow!("Database path must be valid UTF-8"))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Analyzer with the user's threshold overrides, or defaults when they don't parse
pub fn load_analyzer() -> FinancialAnalyzer {
    match AnalyticsConfig::load() {
        Ok(config) => FinancialAnalyzer::new(config),
        Err(e) => {
            warn!("Failed to load analytics config, using defaults: {}", e);
            FinancialAnalyzer::default()
        }
    }
}

/// LLM client from the environment, with a hint when none is configured
pub fn llm_from_env() -> Result<LlmClient> {
    LlmClient::from_env().ok_or_else(|| {
        anyhow!(
            "No LLM configured. Set ANTHROPIC_API_KEY, or LLM_PROVIDER=openai with OPENAI_API_KEY"
        )
    })
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import the ledger: opme import accounts --file contas.csv");
    println!("  2. Check the outlook: opme forecast");
    println!("  3. Start the API: opme serve");

    Ok(())
}

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!();
    println!("📊 OPME Status");
    println!("   ─────────────────────────────────────────────────────────────");

    println!("   Database: {}", db_path.display());

    if db_path.exists() {
        if let Ok(metadata) = std::fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => print_counts(&db)?,
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    match LlmClient::from_env() {
        Some(client) => println!("   🤖 LLM: {}", client.provider().as_str()),
        None => println!("   🤖 LLM: not configured"),
    }

    println!();
    Ok(())
}

/// Print record counts for an open database
pub fn print_counts(db: &Database) -> Result<()> {
    println!();
    println!("   Accounts: {}", db.list_financial_accounts()?.len());
    println!("   Clients: {}", db.list_clients()?.len());
    println!("   Unread alerts: {}", db.count_unread_alerts()?);
    Ok(())
}
