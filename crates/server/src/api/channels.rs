//! Channel API handlers.
//!
//! Posts received for a configured channel are appended to the message log,
//! which is what indexing jobs read. Channels with `live_index` also catalog
//! each new post immediately, and again on re-delivery.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use mediadex_core::{indexer::IngestOutcome, ChannelConfig, IncomingMessage};

use super::error::ApiError;
use crate::state::AppState;

/// Result of posting a message to a channel
#[derive(Debug, Serialize)]
pub struct PostMessageResponse {
    /// False when the message id was already logged
    pub appended: bool,
    pub position: i64,
    /// Live indexing outcome: inserted, duplicate or non_media
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

pub async fn list_channels(State(state): State<Arc<AppState>>) -> Json<Vec<ChannelConfig>> {
    Json(state.channels().to_vec())
}

/// Append a received post to a channel's message log.
///
/// A re-delivered post on a live channel is ingested again, so a post whose
/// first ingest failed gets cataloged on retry. Fingerprint dedup keeps this
/// idempotent.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<i64>,
    Json(message): Json<IncomingMessage>,
) -> Result<(StatusCode, Json<PostMessageResponse>), ApiError> {
    let channel = state.channel(channel_id).ok_or_else(|| {
        ApiError::not_found("unknown_channel", format!("Unknown channel: {}", channel_id))
    })?;
    let live_index = channel.live_index;

    let log = state.message_log();
    let (status, raw) = match log.append(channel_id, &message)? {
        Some(raw) => (StatusCode::CREATED, raw),
        None => {
            debug!(
                "Message {} already logged for channel {}",
                message.message_id, channel_id
            );
            let raw = log.get(channel_id, message.message_id)?.ok_or_else(|| {
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "message_log_unavailable",
                    format!(
                        "Message {} vanished from channel {} log",
                        message.message_id, channel_id
                    ),
                )
            })?;
            (StatusCode::OK, raw)
        }
    };

    let mut response = PostMessageResponse {
        appended: status == StatusCode::CREATED,
        position: raw.position,
        indexed: None,
        fingerprint: None,
    };

    if live_index {
        let outcome = state.controller().ingest_live(&raw).await?;
        response.indexed = Some(match outcome {
            IngestOutcome::NonMedia => "non_media",
            IngestOutcome::Inserted(_) => "inserted",
            IngestOutcome::Duplicate(_) => "duplicate",
        });
        response.fingerprint = outcome.record().map(|r| r.fingerprint.clone());
    }

    Ok((status, Json(response)))
}
