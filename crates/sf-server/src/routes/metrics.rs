//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::response::IntoResponse;

use crate::context::AppContext;

const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// GET /metrics -- Prometheus-format metrics.
pub async fn metrics_handler(State(ctx): State<AppContext>) -> impl IntoResponse {
    let body = match &ctx.metrics {
        Some(handle) => handle.render(),
        None => "# No metrics recorder installed\n".to_string(),
    };
    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, CONTENT_TYPE)],
        body,
    )
}
