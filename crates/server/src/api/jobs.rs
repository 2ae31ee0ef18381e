//! Indexing job API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use mediadex_core::{CreateJobRequest, IndexJob, JobFilter, JobProgress, JobStatus};

use super::error::ApiError;
use crate::state::AppState;

/// Maximum allowed limit for job listings
const MAX_LIMIT: i64 = 1000;

/// Default limit for job listings
const DEFAULT_LIMIT: i64 = 100;

/// Request body for creating a job
#[derive(Debug, Deserialize)]
pub struct CreateJobBody {
    /// Source channel id
    pub source: i64,
    /// Leading positions to pass over without processing
    #[serde(default)]
    pub skip_count: u64,
    /// Inclusive last position to scan
    #[serde(default)]
    pub end_position: Option<i64>,
    /// Start the job right away
    #[serde(default)]
    pub start: bool,
}

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    pub source: Option<i64>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// Request body for changing the skip count
#[derive(Debug, Deserialize)]
pub struct SetSkipBody {
    pub skip_count: u64,
}

/// Create a job, optionally starting it
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateJobBody>,
) -> Result<(StatusCode, Json<IndexJob>), ApiError> {
    let request = CreateJobRequest {
        source: body.source,
        skip_count: body.skip_count,
        end_position: body.end_position,
    };

    let controller = state.controller();
    let job = controller.create_job(&request)?;
    let job = if body.start {
        controller.start(&job.id).await?
    } else {
        job
    };

    Ok((StatusCode::CREATED, Json(job)))
}

/// List jobs, newest first
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJobsParams>,
) -> Result<Json<Vec<IndexJob>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let mut filter = JobFilter::new().with_limit(limit);

    if let Some(source) = params.source {
        filter = filter.with_source(source);
    }
    if let Some(ref status) = params.status {
        let status: JobStatus = status
            .parse()
            .map_err(|e: String| ApiError::bad_request("invalid_status", e))?;
        filter = filter.with_status(status);
    }

    Ok(Json(state.controller().list(&filter)?))
}

/// Job status with progress
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobProgress>, ApiError> {
    Ok(Json(state.controller().status(&id).await?))
}

pub async fn start_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<IndexJob>, ApiError> {
    Ok(Json(state.controller().start(&id).await?))
}

pub async fn pause_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<IndexJob>, ApiError> {
    Ok(Json(state.controller().pause(&id).await?))
}

pub async fn resume_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<IndexJob>, ApiError> {
    Ok(Json(state.controller().resume(&id).await?))
}

pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<IndexJob>, ApiError> {
    let job = state.controller().cancel(&id).await?;
    info!("Job {} cancelled via API", job.id);
    Ok(Json(job))
}

/// Change the skip count of a pending job
pub async fn set_skip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SetSkipBody>,
) -> Result<Json<IndexJob>, ApiError> {
    Ok(Json(state.controller().set_skip(&id, body.skip_count)?))
}
