use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Notification enqueues still in flight.
    pub pending_notifications: usize,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = HealthResponse {
        status: "ok",
        pending_notifications: state.ingestion.pending_notifications(),
    };
    (StatusCode::OK, Json(body))
}
