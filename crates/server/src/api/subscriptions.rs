use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tracing::info;

use imagecast_core::Subscription;
use imagecast_pipeline::UnsubscribeOutcome;

use super::AppState;
use crate::error::ServerError;

/// Query string for the e-mail endpoints.
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub subscription_handle: String,
}

/// `POST /api/v1/image/email?email=..`
pub async fn subscribe(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<SubscribeResponse>, ServerError> {
    info!(email = %query.email, "subscribe email request");
    let subscription_handle = state.subscriptions.subscribe_email(&query.email).await?;
    Ok(Json(SubscribeResponse {
        subscription_handle,
    }))
}

/// `DELETE /api/v1/image/email?email=..`
///
/// An address with no subscription is a success with status
/// `not_subscribed`.
pub async fn unsubscribe(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<UnsubscribeOutcome>, ServerError> {
    info!(email = %query.email, "unsubscribe email request");
    Ok(Json(
        state.subscriptions.unsubscribe_email(&query.email).await?,
    ))
}

/// `GET /api/v1/image/email`
pub async fn list_subscriptions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Subscription>>, ServerError> {
    Ok(Json(state.subscriptions.list_subscriptions().await?))
}
