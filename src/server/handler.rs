use crate::exposition::PrometheusRecorder;
use crate::server::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn metrics(State(state): State<AppState>) -> Result<String, (StatusCode, String)> {
    let mut recorder = PrometheusRecorder::new(
        state.configuration.server.namespace.as_deref(),
        state.descriptions.clone(),
    );

    state.scraper.scrape(&mut recorder).await;

    recorder.encode().map_err(|e| {
        tracing::error!(error = %e, "Failed to encode metrics");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to encode metrics".to_string(),
        )
    })
}
