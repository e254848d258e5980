use crate::server::state::AppState;
use anyhow::Context;
use axum::Router;
use axum::routing::get;

pub mod handler;
pub mod state;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(handler::metrics))
        .route("/health", get(handler::health_check))
        .with_state(state)
}

/// Serves the scrape endpoint until Ctrl-C is received.
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let address = state.configuration.server.listen_address.clone();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;

    tracing::info!(address = %address, "Serving metrics on /metrics");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received");
}
