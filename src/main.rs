//! # Vertex Gateway Server
//!
//! HTTP front end for the `vertex-gateway` library: content generation,
//! structured analysis and workflow execution against Vertex AI text models.
//!
//! ## Quick Start
//! ```bash
//! export VERTEX_AI_ACCESS_TOKEN=$(gcloud auth print-access-token)
//! export GOOGLE_CLOUD_PROJECT=my-project
//! cargo run -- --port 3001
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Server configuration management
mod config;

// =============================================================================
// IMPORTS
// =============================================================================
use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vertex_gateway::http::{router, AppState};
use vertex_gateway::{Gateway, Settings};

use crate::config::ServerConfig;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "vertex-gateway",
    version,
    about = "Resilient Vertex AI gateway for generation, analysis and workflows",
    long_about = r#"
Vertex Gateway - AI integration layer for marketing automation.

Serves JSON endpoints that wrap the Vertex AI predict API with a response
cache, retry with exponential backoff, windowed batch processing and a
node/edge workflow engine.

ENVIRONMENT:
  VERTEX_AI_ACCESS_TOKEN   bearer token for Vertex AI (required)
  GOOGLE_CLOUD_PROJECT     Google Cloud project id (required)
  GOOGLE_CLOUD_LOCATION    region (default: us-central1)
  VERTEX_AI_ENDPOINT       base URL override
  VERTEX_AI_TIMEOUT_SECS   upstream request timeout (default: 30)
  ADMIN_KEY                key for the cache admin endpoint
  CACHE_TTL_SECS           response cache TTL (default: 3600)

EXAMPLES:
  vertex-gateway
  vertex-gateway --host 127.0.0.1 --port 8080 --verbose
"#
)]
struct Args {
    /// Interface to bind (overrides HOST)
    #[arg(long = "host", env = "HOST")]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short = 'p', long = "port", env = "PORT")]
    port: Option<u16>,

    /// Verbose output (debug logging)
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Enable verbose/debug logging",
        default_value = "false"
    )]
    verbose: bool,
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load .env before reading any configuration
    let _ = dotenvy::dotenv();

    let mut config = ServerConfig::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.validate()?;

    init_logging(&config.log_level, args.verbose)?;

    let settings = Settings::from_env();
    if settings.is_configured() {
        info!(
            project = %settings.project_id,
            location = %settings.location,
            endpoint = %settings.api_endpoint,
            "Vertex AI configured"
        );
    } else {
        warn!("Vertex AI is not configured; service endpoints will answer 400 until VERTEX_AI_ACCESS_TOKEN and GOOGLE_CLOUD_PROJECT are set");
    }
    if settings.admin_key.is_none() {
        warn!("ADMIN_KEY is not set; cache administration is disabled");
    }

    let gateway = Gateway::from_settings(settings, config.cache_ttl);
    let app = router(AppState::new(gateway));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(address = %address, cache_ttl = ?config.cache_ttl, "Vertex gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber for structured logging.
///
/// `--verbose` forces debug level; otherwise the configured filter directive
/// (RUST_LOG) applies.
fn init_logging(directive: &str, verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
