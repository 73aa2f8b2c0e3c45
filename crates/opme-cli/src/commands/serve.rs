//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
) -> Result<()> {
    println!("🚀 Starting OPME finance server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    let mut config = opme_server::ServerConfig::from_env();
    config.require_auth = !no_auth;

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else if config.api_keys.is_empty() {
        println!("   ❌ Authentication: no keys configured (set OPME_API_KEYS)");
    } else {
        println!(
            "   🔑 API keys: {} configured (OPME_API_KEYS)",
            config.api_keys.len()
        );
    }
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 CORS origins: {} (OPME_ALLOWED_ORIGINS)",
            config.allowed_origins.join(", ")
        );
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;
    opme_server::serve_with_config(db, host, port, config).await?;

    Ok(())
}
