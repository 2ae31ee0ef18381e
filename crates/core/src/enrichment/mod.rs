//! Metadata enrichment for announcements (poster, rating, genres).
//!
//! Enrichment is best-effort: the publisher treats errors, timeouts and
//! misses the same way and posts unenriched.

mod tmdb;
mod types;

pub use tmdb::{TmdbConfig, TmdbProvider};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::Category;

/// Errors from a metadata provider.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Looks up display metadata for a title.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Provider name for logging and metrics.
    fn name(&self) -> &str;

    /// `Ok(None)` when nothing matches the title.
    async fn lookup(
        &self,
        title: &str,
        category: Category,
    ) -> Result<Option<Enrichment>, EnrichmentError>;
}
