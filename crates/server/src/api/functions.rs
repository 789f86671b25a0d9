use axum::extract::State;
use tracing::info;

use super::AppState;

/// `GET /api/v1/image/lambda` -- invoke the external function and return
/// its summary. Always answers 200; failures are described in the body.
pub async fn trigger(State(state): State<AppState>) -> String {
    info!(function = %state.trigger.function_name(), "trigger function request");
    state.trigger.trigger().await
}
