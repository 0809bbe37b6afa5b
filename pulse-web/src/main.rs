//! CampusPulse web service (pulse-web) - Main entry point
//!
//! Live event-feedback collector: organizers create sessions, attendees
//! submit ratings/comments, and dashboards follow per-session aggregate
//! sentiment over an SSE stream.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pulse_common::config::{resolve_data_file, StorageConfig};
use pulse_common::updates::UpdateStream;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse_web::{build_router, worker, AppState, PulseRepository};

/// Command-line arguments for pulse-web
#[derive(Parser, Debug)]
#[command(name = "pulse-web")]
#[command(about = "CampusPulse live feedback service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5780", env = "PULSE_PORT")]
    port: u16,

    /// Snapshot file holding all sessions and feedback
    #[arg(short, long, env = "PULSE_DATA_FILE")]
    data_file: Option<PathBuf>,

    /// Retained feedback entries per session (0 = unlimited)
    #[arg(long, default_value = "200", env = "PULSE_MAX_FEEDBACK")]
    max_feedback: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse_web=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    info!("Starting CampusPulse (pulse-web) v{}", env!("CARGO_PKG_VERSION"));

    let config = StorageConfig {
        // The CLI flag and env var are consumed by clap; the resolver adds
        // the config-file and platform-default tiers behind them.
        data_file: resolve_data_file(args.data_file.as_ref(), "PULSE_DATA_FILE"),
        max_feedback_per_session: args.max_feedback,
    };

    let repository = Arc::new(
        PulseRepository::open(&config).context("Failed to open pulse repository")?,
    );

    // Periodic summary logging
    worker::spawn(Arc::clone(&repository), worker::METRICS_PERIOD);

    let state = AppState::new(repository, UpdateStream::new());
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("pulse-web listening on http://{}", addr);
    info!("Health check: http://{}/api/health", addr);

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
