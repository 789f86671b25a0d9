pub mod functions;
pub mod health;
pub mod images;
pub mod subscriptions;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use imagecast_pipeline::{ExternalTrigger, IngestionService, SubscriptionManager};

use crate::config::ImagecastConfig;
use crate::factory::Backends;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Upload, download, list and delete of images.
    pub ingestion: Arc<IngestionService>,
    /// E-mail subscriptions on the notification topic.
    pub subscriptions: Arc<SubscriptionManager>,
    /// The external function trigger.
    pub trigger: Arc<ExternalTrigger>,
    /// Maximum accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wire the pipeline services over `backends`.
    pub fn new(backends: &Backends, config: &ImagecastConfig) -> Self {
        let policy = config.calls.policy();
        let ingestion = IngestionService::new(
            Arc::clone(&backends.blobs),
            Arc::clone(&backends.catalog),
            Arc::clone(&backends.queue),
            config.storage.bucket.clone(),
        )
        .with_policy(policy);
        let subscriptions =
            SubscriptionManager::new(Arc::clone(&backends.topic)).with_policy(policy);
        let trigger = ExternalTrigger::new(
            Arc::clone(&backends.invoker),
            config.function.name.clone(),
            config.function.payload.clone(),
            std::time::Duration::from_secs(config.function.timeout_seconds),
        );

        Self {
            ingestion: Arc::new(ingestion),
            subscriptions: Arc::new(subscriptions),
            trigger: Arc::new(trigger),
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }
}

/// Build the Axum router with every API route and the shared middleware.
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/v1/image",
            get(images::list_images).post(images::upload_image),
        )
        .route("/api/v1/image/random", get(images::random_image))
        .route(
            "/api/v1/image/email",
            get(subscriptions::list_subscriptions)
                .post(subscriptions::subscribe)
                .delete(subscriptions::unsubscribe),
        )
        .route("/api/v1/image/lambda", get(functions::trigger))
        .route(
            "/api/v1/image/{name}",
            get(images::download_image).delete(images::delete_image),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}
