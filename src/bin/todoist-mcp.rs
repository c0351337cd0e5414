//! Todoist MCP server binary.
//!
//! Reads the API token from the environment, builds one HTTP pool and one
//! rate limiter shared by both dispatchers, then serves MCP over stdio.

use std::sync::Arc;

use clap::Parser;
use miette::Diagnostic;
use rmcp::ServiceExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todoist_mcp::config::{Config, ConfigError};
use todoist_mcp::mcp::McpServer;
use todoist_mcp::todoist::http::{REQUEST_TIMEOUT, build_client};
use todoist_mcp::todoist::{ApiError, RateLimiter, RestClient, SyncClient};

#[derive(Error, Diagnostic, Debug)]
enum BinaryError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Todoist connection check failed: {0}")]
    #[diagnostic(
        code(todoist_mcp::binary::probe),
        help("Pass --skip-probe to start without checking the token.")
    )]
    Probe(#[source] ApiError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Api(#[from] ApiError),

    #[error("MCP transport error: {0}")]
    #[diagnostic(code(todoist_mcp::binary::transport))]
    Transport(String),
}

#[derive(Parser)]
#[command(name = "todoist-mcp")]
#[command(author, version, about = "Todoist MCP server over stdio", long_about = None)]
struct Cli {
    /// Todoist REST API base URL (overrides TODOIST_REST_URL)
    #[arg(long)]
    rest_url: Option<String>,

    /// Todoist Sync API endpoint (overrides TODOIST_SYNC_URL)
    #[arg(long)]
    sync_url: Option<String>,

    /// Start without checking the token against GET /projects
    #[arg(long)]
    skip_probe: bool,
}

/// Logs go to stderr; stdout carries the protocol.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todoist_mcp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), BinaryError> {
    let mut config = Config::from_env()?;
    if let Some(url) = cli.rest_url {
        config = config.with_rest_url(url);
    }
    if let Some(url) = cli.sync_url {
        config = config.with_sync_url(url);
    }
    info!(rest_url = %config.rest_url, sync_url = %config.sync_url, "starting todoist-mcp");

    let _ = rustls::crypto::ring::default_provider().install_default();
    let http = build_client(REQUEST_TIMEOUT)?;
    let limiter = Arc::new(RateLimiter::new(config.rate_window, config.rate_capacity));

    let rest = RestClient::new(
        http.clone(),
        &config.rest_url,
        &config.api_token,
        Arc::clone(&limiter),
    );
    let batch = SyncClient::new(
        http,
        &config.sync_url,
        &config.api_token,
        Arc::clone(&limiter),
    );

    if !cli.skip_probe {
        rest.test_connection(&CancellationToken::new())
            .await
            .map_err(BinaryError::Probe)?;
        info!("connected to Todoist");
    }

    let server = McpServer::new(Arc::new(rest), Arc::new(batch), limiter)
        .with_deadline(config.tool_deadline);

    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| BinaryError::Transport(e.to_string()))?;
    info!("MCP server ready on stdio");

    service
        .waiting()
        .await
        .map_err(|e| BinaryError::Transport(e.to_string()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    init_tracing();
    run(Cli::parse()).await?;
    Ok(())
}
