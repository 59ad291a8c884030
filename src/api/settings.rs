// Runtime configuration endpoints

use axum::{body::Bytes, extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use super::webhook::is_empty_json;
use crate::settings::Settings;
use crate::AppState;

/// GET /config
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.settings.current().await)
}

/// POST /config - shallow merge of top-level sections, persisted immediately
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let partial: Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request("No configuration provided"))?;
    if is_empty_json(&partial) {
        return Err(ApiError::bad_request("No configuration provided"));
    }

    state.settings.update(partial).await?;

    Ok(Json(json!({ "message": "Configuration updated" })))
}
