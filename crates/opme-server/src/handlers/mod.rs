//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod agent;
pub mod alerts;
pub mod analytics;
pub mod audit;
pub mod health;

// Re-export all handlers for use in router
pub use agent::*;
pub use alerts::*;
pub use analytics::*;
pub use audit::*;
pub use health::*;
