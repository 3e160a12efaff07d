use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use chess_coach_core::books::{BookInfo, Section, SectionHit};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub async fn list_books(State(state): State<Arc<AppState>>) -> Json<Vec<BookInfo>> {
    Json(state.books.infos())
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Comma separated keywords
    #[serde(default)]
    pub q: String,
}

pub async fn search_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<SectionHit>>> {
    let keywords: Vec<&str> = query
        .q
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return Err(ApiError::BadRequest("q must contain at least one keyword".into()));
    }
    Ok(Json(state.books.search_topics(&keywords)))
}

pub async fn get_section(
    State(state): State<Arc<AppState>>,
    Path((title, number)): Path<(String, u32)>,
) -> ApiResult<Json<Section>> {
    state
        .books
        .get_section(&title, number)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Section {} not found in '{}'", number, title)))
}
