//! # Server Configuration
//!
//! Process-level settings for the HTTP server: bind address, cache TTL and
//! log level. Upstream credentials live in `vertex_gateway::Settings` and are
//! read separately, because the server must start (and report
//! `configured: false`) even when they are missing.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use vertex_gateway::DEFAULT_TTL;

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (default: 0.0.0.0)
    pub host: String,

    /// TCP port (default: 3001)
    pub port: u16,

    /// How long cached model responses stay valid
    pub cache_ttl: Duration,

    /// Filter directive for the log subscriber, e.g. "info" or "vertex_gateway=debug"
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cache_ttl: DEFAULT_TTL,
            log_level: "info".to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults; malformed numbers are an error
    /// rather than being silently ignored.
    pub fn from_env() -> Result<Self> {
        let mut config = ServerConfig::default();

        if let Ok(val) = env::var("HOST") {
            config.host = val;
        }

        if let Ok(val) = env::var("PORT") {
            config.port = val
                .parse()
                .context("PORT must be a valid port number (e.g., 3001)")?;
        }

        if let Ok(val) = env::var("CACHE_TTL_SECS") {
            let secs: u64 = val
                .parse()
                .context("CACHE_TTL_SECS must be a whole number of seconds")?;
            config.cache_ttl = Duration::from_secs(secs);
        }

        if let Ok(val) = env::var("RUST_LOG") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// Fail fast on values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("HOST cannot be empty");
        }

        if self.port == 0 {
            anyhow::bail!("PORT must be between 1 and 65535");
        }

        if self.cache_ttl.is_zero() {
            anyhow::bail!("CACHE_TTL_SECS must be at least 1");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
