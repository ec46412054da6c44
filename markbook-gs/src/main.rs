//! markbook-gs - Grading Service
//!
//! AI-assisted exam grading for English language centres: accepts scanned
//! exam papers, identifies the exam variant, matches it against the answer
//! key registry, and produces scored reports with skill breakdowns.
//!
//! Default bind: 127.0.0.1:5750. Integrates with clients via HTTP REST
//! plus SSE progress streaming.

use anyhow::{Context, Result};
use clap::Parser;
use markbook_common::events::EventBus;
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use markbook_gs::config::{Args, GradingConfig};
use markbook_gs::{build_router, seed, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Resolve configuration: CLI > env > config file > defaults
    let args = Args::parse();
    let config = GradingConfig::load(&args)?;

    info!("Starting markbook-gs (Grading Service)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Grading model: {}", config.grading_model);
    info!("Fast model: {}", config.fast_model);

    if !config.has_api_key() {
        warn!("No grading API key configured; grading attempts will fail until one is provided");
    }

    // Create event bus for SSE broadcasting
    let event_bus = EventBus::new(100); // 100 event capacity
    info!("Event bus initialized");

    // Create application state
    let state = AppState::new(config, event_bus).context("Failed to initialize service state")?;

    // Load built-in demo data
    if state.config.seed_demo_data {
        seed::seed_demo_data(&state).await;
    }

    let addr = state.config.bind_addr();

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
