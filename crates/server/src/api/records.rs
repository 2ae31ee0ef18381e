//! Catalog record API handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use mediadex_core::{CatalogStats, FileRecord, SourceRef, LINK_TOKEN_PREFIX};

use super::error::ApiError;
use crate::state::AppState;

/// Get a record by fingerprint
pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(fingerprint): Path<String>,
) -> Result<Json<FileRecord>, ApiError> {
    Ok(Json(state.catalog().get(&fingerprint)?))
}

/// Resolve a deep-link start token (`file_<fingerprint prefix>`)
pub async fn get_record_by_link(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<FileRecord>, ApiError> {
    let prefix = token.strip_prefix(LINK_TOKEN_PREFIX).ok_or_else(|| {
        ApiError::bad_request(
            "invalid_link_token",
            format!("Link token must start with '{}'", LINK_TOKEN_PREFIX),
        )
    })?;
    Ok(Json(state.catalog().get_by_prefix(prefix)?))
}

/// Get the record indexed from a given channel message
pub async fn get_record_by_source(
    State(state): State<Arc<AppState>>,
    Path((channel_id, message_id)): Path<(i64, i64)>,
) -> Result<Json<FileRecord>, ApiError> {
    let source = SourceRef::new(channel_id, message_id);
    Ok(Json(state.catalog().get_by_source(&source)?))
}

/// Catalog statistics
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<CatalogStats>, ApiError> {
    Ok(Json(state.catalog().stats()?))
}
