// Media request webhook (Overseerr/Jellyseerr)

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use crate::models::WebhookPayload;
use crate::services::orchestrator::RequestOutcome;
use crate::AppState;

/// POST /webhook
pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let data: Value =
        serde_json::from_slice(&body).map_err(|_| ApiError::bad_request("No data provided"))?;
    if is_empty_json(&data) {
        return Err(ApiError::bad_request("No data provided"));
    }

    let payload: WebhookPayload = serde_json::from_value(data)
        .map_err(|e| ApiError::bad_request(format!("Invalid request: {}", e)))?;
    let media = payload.media.unwrap_or_default();

    let title = media.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::bad_request("No title provided"));
    }
    let media_type = media.media_type;

    // Snapshot so a long download never holds the settings lock
    let settings = state.settings.current().await;

    // Run detached: a client hanging up must not abort an in-flight download
    let task_state = state.clone();
    let task_title = title.clone();
    let outcome = tokio::spawn(async move {
        task_state
            .orchestrator
            .process_request(&task_title, media_type, &settings)
            .await
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let response = match outcome {
        RequestOutcome::Started => (
            StatusCode::OK,
            Json(json!({ "message": format!("Download started for {}", title) })),
        )
            .into_response(),
        RequestOutcome::NotAvailable => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Content not available on supported platforms" })),
        )
            .into_response(),
        RequestOutcome::Failed => {
            ApiError::Internal("Failed to start download".to_string()).into_response()
        }
    };

    Ok(response)
}

/// null, {} and [] all count as "no data"
pub(crate) fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
