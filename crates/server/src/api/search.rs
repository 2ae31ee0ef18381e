//! Catalog search API handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use mediadex_core::{SearchPage, SearchQuery};

use super::error::ApiError;
use crate::state::AppState;

/// Search response: one page plus the total match count.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    #[serde(flatten)]
    pub page: SearchPage,
    pub total: u64,
}

/// Distinct values for a facet
#[derive(Debug, Serialize)]
pub struct FacetResponse {
    pub values: Vec<u32>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let engine = state.search();
    let page = engine.search(&query)?;
    let total = engine.count(&query)?;
    Ok(Json(SearchResponse { page, total }))
}

pub async fn seasons(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<FacetResponse>, ApiError> {
    let values = state.search().seasons(&query)?;
    Ok(Json(FacetResponse { values }))
}

pub async fn episodes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<FacetResponse>, ApiError> {
    let values = state.search().episodes(&query)?;
    Ok(Json(FacetResponse { values }))
}
