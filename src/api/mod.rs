use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

mod error;
mod search;
mod settings;
mod webhook;

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(webhook::handle_webhook))
        .route("/search", get(search::search))
        .route(
            "/config",
            get(settings::get_config).post(settings::update_config),
        )
}

/// Full application router with middleware and state attached
pub fn router(state: Arc<AppState>) -> Router {
    routes()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
