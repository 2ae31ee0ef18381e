//! Mapping of core errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use mediadex_core::{
    CatalogError, IndexerError, JobError, PublisherError, SearchError, TransportError,
};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable reason.
    pub code: &'static str,
}

/// An error ready to be sent back to the caller.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(code = self.code, "Request failed: {}", self.message);
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
                code: self.code,
            }),
        )
            .into_response()
    }
}

impl From<IndexerError> for ApiError {
    fn from(e: IndexerError) -> Self {
        let status = match &e {
            IndexerError::Job(JobError::NotFound(_)) => StatusCode::NOT_FOUND,
            IndexerError::Job(JobError::InvalidTransition { .. })
            | IndexerError::SourceBusy { .. }
            | IndexerError::Maintenance => StatusCode::CONFLICT,
            IndexerError::UnknownChannel(_) => StatusCode::BAD_REQUEST,
            e if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.code(), e.to_string())
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        let status = if e.is_validation() {
            StatusCode::BAD_REQUEST
        } else if e.is_transient() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, e.code(), e.to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        let (status, code) = match &e {
            CatalogError::NotFound(_) => (StatusCode::NOT_FOUND, "record_not_found"),
            CatalogError::InvalidCursor(_) => (StatusCode::BAD_REQUEST, "invalid_cursor"),
            CatalogError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "catalog_unavailable"),
            CatalogError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "catalog_error"),
        };
        Self::new(status, code, e.to_string())
    }
}

impl From<TransportError> for ApiError {
    fn from(e: TransportError) -> Self {
        let status = if e.is_transient() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, "transport_error", e.to_string())
    }
}

impl From<PublisherError> for ApiError {
    fn from(e: PublisherError) -> Self {
        match e {
            PublisherError::InvalidConfig(_) => {
                Self::bad_request("invalid_publisher_config", e.to_string())
            }
        }
    }
}
