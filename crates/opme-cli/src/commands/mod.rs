//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `agent` - Finance agent (ask)
//! - `analytics` - Forecast, anomalies, smart alerts, alert feed, budget
//! - `core` - Core commands (init, status) and shared utilities (open_db)
//! - `import` - CSV import of the ledger and bank statements
//! - `prompts` - Prompt library management commands
//! - `serve` - Web server command

pub mod agent;
pub mod analytics;
pub mod core;
pub mod import;
pub mod prompts;
pub mod serve;

// Re-export command functions for main.rs
pub use agent::*;
pub use analytics::*;
pub use core::*;
pub use import::*;
pub use prompts::*;
pub use serve::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
