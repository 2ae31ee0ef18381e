//! Runtime toggles: update publisher and maintenance mode.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use mediadex_core::{PublisherConfig, PublisherStatus};

use super::error::ApiError;
use crate::state::AppState;

/// Publisher status and active configuration
#[derive(Debug, Serialize)]
pub struct PublisherResponse {
    pub status: PublisherStatus,
    pub config: PublisherConfig,
}

/// Publisher update. A new config is applied before the toggle.
#[derive(Debug, Deserialize)]
pub struct UpdatePublisherBody {
    pub enabled: Option<bool>,
    pub config: Option<PublisherConfig>,
}

/// Result of a publisher update
#[derive(Debug, Serialize)]
pub struct UpdatePublisherResponse {
    pub previous_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_config: Option<PublisherConfig>,
    pub status: PublisherStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MaintenanceBody {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct MaintenanceResponse {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<bool>,
}

pub async fn get_publisher(State(state): State<Arc<AppState>>) -> Json<PublisherResponse> {
    let publisher = state.publisher();
    Json(PublisherResponse {
        status: publisher.status(),
        config: publisher.config(),
    })
}

pub async fn update_publisher(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdatePublisherBody>,
) -> Result<Json<UpdatePublisherResponse>, ApiError> {
    let publisher = state.publisher();
    let previous_enabled = publisher.is_enabled();

    let previous_config = match body.config {
        Some(config) => Some(publisher.reload(config)?),
        None => None,
    };
    if let Some(enabled) = body.enabled {
        publisher.set_enabled(enabled);
    }

    Ok(Json(UpdatePublisherResponse {
        previous_enabled,
        previous_config,
        status: publisher.status(),
    }))
}

pub async fn get_maintenance(State(state): State<Arc<AppState>>) -> Json<MaintenanceResponse> {
    Json(MaintenanceResponse {
        enabled: state.controller().is_maintenance_mode(),
        previous: None,
    })
}

pub async fn set_maintenance(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MaintenanceBody>,
) -> Json<MaintenanceResponse> {
    let previous = state.controller().set_maintenance_mode(body.enabled);
    if previous != body.enabled {
        info!("Maintenance mode set to {} via API", body.enabled);
    }
    Json(MaintenanceResponse {
        enabled: body.enabled,
        previous: Some(previous),
    })
}
