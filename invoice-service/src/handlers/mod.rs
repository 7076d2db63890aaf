//! HTTP handlers for invoice-service.

pub mod invoice;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::services::get_metrics;
use crate::startup::AppState;

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "invoice-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness probe. Reports which collaborators are configured; never fails.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "billing_configured": state.billing.is_configured(),
            "recipient_configured": state.config.recipient.resolve().is_some(),
        })),
    )
}

/// Prometheus metrics endpoint.
pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
