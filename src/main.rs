//! Scoreboard - A team score tally served over HTTP
//!
//! Refreshes per-team totals from a spreadsheet on a fixed interval and serves
//! them from memory.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scoreboard::api::{create_router, AppState};
use scoreboard::config::Config;
use scoreboard::score::ScoreCache;
use scoreboard::source::SheetsClient;
use scoreboard::tasks::{RefreshScheduler, SchedulerConfig};

/// Main entry point for the Scoreboard server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Create the score cache and the spreadsheet client
/// 4. Start the background refresh task (first refresh runs immediately)
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scoreboard=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Scoreboard Server");

    // Load configuration from environment variables
    let config = Config::from_env();
    config.validate().context("Invalid configuration")?;
    info!(
        "Configuration loaded: range={}, port={}, refresh_interval={}s, fetch_timeout={}s",
        config.sheet_range, config.server_port, config.refresh_interval, config.fetch_timeout
    );

    let credentials = config
        .credentials()
        .context("No spreadsheet credentials configured")?;
    let client = SheetsClient::new(
        &config.sheets_api_url,
        credentials,
        Duration::from_secs(config.fetch_timeout),
    )?;

    // Create the cache and start the refresh task that fills it
    let cache = ScoreCache::new();
    let (scheduler, refresh_handle) = RefreshScheduler::spawn(
        Arc::new(client),
        cache.clone(),
        SchedulerConfig::from_config(&config),
    );
    info!("Background refresh task started");

    // Create router with all endpoints
    let app = create_router(AppState::new(cache, scheduler));

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(refresh_handle))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the refresh task and allows graceful shutdown.
async fn shutdown_signal(refresh_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    // Abort the refresh task
    refresh_handle.abort();
    warn!("Refresh task aborted");
}
