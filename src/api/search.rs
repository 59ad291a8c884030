use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::ApiError;
use crate::models::{MediaType, SearchResults};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

/// GET /search?title=...&type=tv|movie - raw catalog hits per provider
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>, ApiError> {
    let title = query
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Title parameter required"))?;
    let media_type = query
        .media_type
        .as_deref()
        .map(MediaType::parse)
        .unwrap_or_default();

    let settings = state.settings.current().await;
    let results = state
        .orchestrator
        .search_content(&title, media_type, &settings)
        .await;

    Ok(Json(results))
}
