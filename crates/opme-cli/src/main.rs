//! OPME CLI - Financial analytics and finance agent
//!
//! Usage:
//!   opme init                           Initialize database
//!   opme import accounts --file CSV     Import receivables/payables
//!   opme forecast --days 90             Forecast cash flow
//!   opme alerts --save                  Generate and persist smart alerts
//!   opme ask "Quais faturas vencem?"    Ask the finance agent
//!   opme serve --port 3000              Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Import { source } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match source {
                ImportSource::Accounts { file } => commands::cmd_import_accounts(&db, &file),
                ImportSource::Statement { file, account } => {
                    commands::cmd_import_statement(&db, &file, account.as_deref())
                }
            }
        }
        Commands::Forecast { days, months, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_forecast(&db, &commands::load_analyzer(), days, months, json)
        }
        Commands::Anomalies { months, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_anomalies(&db, &commands::load_analyzer(), months, json)
        }
        Commands::Alerts {
            days,
            months,
            save,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_alerts(&db, &commands::load_analyzer(), days, months, save, json)
        }
        Commands::Feed {
            unread,
            limit,
            read,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match read {
                Some(id) => commands::cmd_feed_read(&db, id),
                None => commands::cmd_feed(&db, unread, limit),
            }
        }
        Commands::Budget {
            file,
            start,
            end,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_budget(&db, &commands::load_analyzer(), &file, &start, &end, json)
        }
        Commands::Ask { message, context } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let llm = commands::llm_from_env()?;
            commands::cmd_ask(db, llm, &message, context.as_deref()).await
        }
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { id }) => commands::cmd_prompts_show(&id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
        Commands::Serve {
            port,
            host,
            no_auth,
        } => commands::cmd_serve(&cli.db, &host, port, no_auth, cli.no_encrypt).await,
    }
}
