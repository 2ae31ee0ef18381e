//! Messaging transport boundary.
//!
//! Inbound messages are read through `MessageSource`, outbound announcements
//! go through `AnnouncementSink`. Both are async traits so the indexer and
//! publisher can be driven by mocks in tests.

mod log_sink;
mod message_log;
mod telegram;
mod types;

pub use log_sink::LogSink;
pub use message_log::SqliteMessageLog;
pub use telegram::{TelegramConfig, TelegramSink};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the messaging transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Transport unreachable right now; worth retrying.
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited by transport (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The transport refused the request; retrying will not help.
    #[error("Rejected by transport: {0}")]
    Rejected(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transport not configured: {0}")]
    NotConfigured(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Unavailable(_) | TransportError::RateLimited { .. }
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            TransportError::Unavailable(e.to_string())
        } else {
            TransportError::Rejected(e.to_string())
        }
    }
}

/// Source of raw messages for a channel, in position order.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Read up to `limit` messages with `position >= from`.
    /// An empty result means the source is exhausted.
    async fn read(
        &self,
        channel_id: i64,
        from: i64,
        limit: u32,
    ) -> Result<Vec<RawMessage>, TransportError>;
}

/// Outbound sink for update-channel posts.
#[async_trait]
pub trait AnnouncementSink: Send + Sync {
    /// Sink name for logging.
    fn name(&self) -> &str;

    async fn send(&self, announcement: &Announcement) -> Result<(), TransportError>;
}
