//! Backend for the travel admin dashboard.
//!
//! Issues platform access tokens, forwards cloud-function calls, and serves
//! a direct collection endpoint from its own store so the dashboard has
//! something to talk to when the cloud is out of reach.

pub mod config;
pub mod routes;
pub mod state;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use config::ServerConfig;
pub use routes::build_router;
pub use state::AppState;

/// Bind the configured port and serve until Ctrl+C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::new(&config)?;
    let app = build_router(state);

    let listener = TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.addr()))?;
    info!(
        address = %listener.local_addr()?,
        upstream = %config.upstream_url,
        "Proxy server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Proxy server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a handler, run until the process is killed
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
