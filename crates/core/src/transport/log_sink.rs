use async_trait::async_trait;
use tracing::info;

use super::{Announcement, AnnouncementSink, TransportError};

/// Sink that only logs announcements. Used when no outbound transport is
/// configured.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnnouncementSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, announcement: &Announcement) -> Result<(), TransportError> {
        info!(
            fingerprint = %announcement.fingerprint,
            has_photo = announcement.photo_url.is_some(),
            "Announcement: {}",
            announcement.text.lines().next().unwrap_or_default()
        );
        Ok(())
    }
}
