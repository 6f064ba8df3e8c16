// HTTP routes configuration

use super::handlers::{
    chat_completions_handler, gemini_handler, health_handler, messages_handler, metrics_handler,
};
use super::middleware::request_id_layers;
use crate::balancer::KeySelector;
use crate::config::AppConfig;
use crate::storage::SharedStore;
use crate::upstream::UpstreamClient;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared services injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub upstream: Arc<UpstreamClient>,
    pub selector: Arc<KeySelector>,
    pub store: SharedStore,
}

pub fn create_router(state: AppState) -> Router {
    let (set_request_id, propagate_request_id) = request_id_layers();
    let max_body_bytes = state.config.server.max_body_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/v1/chat/completions", post(chat_completions_handler))
        .route("/v1/messages", post(messages_handler))
        .route("/v1beta/models/:model_action", post(gemini_handler))
        .layer(tower_http::limit::RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state)
}
