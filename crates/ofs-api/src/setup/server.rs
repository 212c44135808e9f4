//! Server startup and graceful shutdown

use anyhow::Result;
use axum::Router;
use ofs_core::Config;
use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

/// How long pending archive copies may take to finish once the server stops.
const ARCHIVE_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Start the server with graceful shutdown
pub async fn start_server(config: &Config, app: Router, state: Arc<AppState>) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        primary_backend = %config.primary.backend,
        archive_backend = ?config.archive.as_ref().map(|a| a.storage.backend),
        key_length = config.key_length,
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(archive) = &state.archive {
        archive.shutdown();
        if archive.wait_idle(ARCHIVE_DRAIN_TIMEOUT).await {
            tracing::info!("Archive queue drained");
        } else {
            tracing::warn!(
                in_flight = archive.stats().in_flight,
                "Archive queue not drained before timeout, pending copies dropped"
            );
        }
    }

    Ok(())
}

/// Signal handler for graceful shutdown
///
/// Listens for Ctrl+C (SIGINT) and SIGTERM signals to initiate graceful shutdown.
///
/// # Panics
/// - Panics if Ctrl+C signal handler cannot be installed (unrecoverable system error)
/// - On Unix systems, panics if SIGTERM signal handler cannot be installed (unrecoverable system error)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
