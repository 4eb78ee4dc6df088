//! Process configuration from flags with environment fallbacks.

use anyhow::{bail, Result};
use clap::Parser;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 << 20;

#[derive(Parser, Debug, Clone)]
#[command(name = "doc-hub")]
#[command(about = "Document storage and retrieval service")]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "SERVER_PORT", default_value_t = 8080)]
    pub port: u16,

    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://doc-hub.db?mode=rwc")]
    pub database_url: String,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Token required by the registration endpoint
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: String,

    /// HMAC secret used to sign identity tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Upper bound on a request body, multipart uploads included
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Issue tokens that expire after this many seconds. Tokens never expire if unset.
    #[arg(long, env = "TOKEN_TTL_SECS")]
    pub token_ttl_secs: Option<u64>,
}

impl Config {
    /// Rejects configurations the server must not start with.
    pub fn validate(&self) -> Result<()> {
        if self.admin_token.trim().is_empty() {
            bail!("ADMIN_TOKEN is not set");
        }
        if self.jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET is not set");
        }
        if self.token_ttl_secs == Some(0) {
            bail!("TOKEN_TTL_SECS must be positive");
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
