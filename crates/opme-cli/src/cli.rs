//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use opme_server::{MAX_FORECAST_DAYS, MAX_HISTORY_MONTHS};

/// OPME - Financial analytics and finance agent for OPME distributors
#[derive(Parser)]
#[command(name = "opme")]
#[command(about = "Forecasts, anomalies, smart alerts and a finance agent over the OPME ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "opme.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set OPME_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Show database status (encryption, size, record counts)
    Status,

    /// Import data from CSV
    Import {
        #[command(subcommand)]
        source: ImportSource,
    },

    /// Forecast revenue, expenses and cash flow
    Forecast {
        /// Forecast horizon in days
        #[arg(long, default_value = "90", value_parser = clap::value_parser!(u32).range(1..=MAX_FORECAST_DAYS as i64))]
        days: u32,

        /// Months of history to aggregate
        #[arg(long, default_value = "12", value_parser = clap::value_parser!(u32).range(1..=MAX_HISTORY_MONTHS as i64))]
        months: u32,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Detect anomalous months in revenue and expenses
    Anomalies {
        /// Months of history to aggregate
        #[arg(long, default_value = "12", value_parser = clap::value_parser!(u32).range(1..=MAX_HISTORY_MONTHS as i64))]
        months: u32,

        #[arg(long)]
        json: bool,
    },

    /// Generate smart alerts from forecast, ledger and anomalies
    Alerts {
        /// Forecast horizon in days
        #[arg(long, default_value = "90", value_parser = clap::value_parser!(u32).range(1..=MAX_FORECAST_DAYS as i64))]
        days: u32,

        /// Months of history to aggregate
        #[arg(long, default_value = "12", value_parser = clap::value_parser!(u32).range(1..=MAX_HISTORY_MONTHS as i64))]
        months: u32,

        /// Persist the generated alerts to the alert feed
        #[arg(long)]
        save: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show the persisted alert feed
    Feed {
        /// Only unread alerts
        #[arg(long)]
        unread: bool,

        /// Maximum number of alerts
        #[arg(short, long, default_value = "50")]
        limit: i64,

        /// Mark an alert as read
        #[arg(long)]
        read: Option<i64>,
    },

    /// Compare a budget file against paid payables
    Budget {
        /// JSON file: [{"category": "...", "amount": 1000.0}, ...]
        #[arg(short, long)]
        file: PathBuf,

        /// Period start (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Period end (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        #[arg(long)]
        json: bool,
    },

    /// Ask the finance agent a question
    Ask {
        /// Message for the agent
        message: String,

        /// Extra JSON context passed to the agent
        #[arg(long)]
        context: Option<String>,
    },

    /// Manage agent prompts
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires a bearer key from OPME_API_KEYS.
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
pub enum ImportSource {
    /// Receivables/payables ledger
    Accounts {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Bank statement (duplicates are skipped)
    Statement {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Bank account the statement belongs to
        #[arg(short, long)]
        account: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all prompts and their override status
    List,

    /// Show the content of a prompt
    Show {
        /// Prompt ID (e.g., finance_agent_plan)
        id: String,
    },

    /// Show the override directory path
    Path,
}
