//! Import command implementations

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use opme_core::db::Database;
use opme_core::import::{import_accounts, import_statement};
use opme_core::ImportSummary;

pub fn cmd_import_accounts(db: &Database, file: &Path) -> Result<()> {
    println!("📥 Importing accounts from {}...", file.display());

    let reader =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let summary = import_accounts(db, reader).context("Failed to import accounts")?;

    print_summary(&summary);
    Ok(())
}

pub fn cmd_import_statement(db: &Database, file: &Path, account: Option<&str>) -> Result<()> {
    println!("📥 Importing bank statement from {}...", file.display());
    if let Some(account) = account {
        println!("   Account: {}", account);
    }

    let reader =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let summary = import_statement(db, reader, account).context("Failed to import statement")?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &ImportSummary) {
    println!();
    println!("   Parsed:     {}", summary.parsed);
    println!("   Inserted:   {}", summary.inserted);
    if summary.duplicates > 0 {
        println!("   Duplicates: {} (skipped)", summary.duplicates);
    }
    println!("✅ Import complete");
}
