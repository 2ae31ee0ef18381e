//! Mock announcement sink for testing.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::transport::{Announcement, AnnouncementSink, TransportError};

/// Records every announcement it is asked to send.
#[derive(Debug, Default)]
pub struct MockAnnouncementSink {
    sent: Mutex<Vec<Announcement>>,
    send_times: Mutex<Vec<Instant>>,
    next_error: Mutex<Option<TransportError>>,
    delay: Mutex<Option<Duration>>,
}

impl MockAnnouncementSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announcements delivered successfully, in order.
    pub fn sent(&self) -> Vec<Announcement> {
        self.sent.lock().unwrap().clone()
    }

    /// Start time of every send attempt, failed ones included.
    pub fn send_times(&self) -> Vec<Instant> {
        self.send_times.lock().unwrap().clone()
    }

    /// Make the next send fail with this error.
    pub fn set_next_error(&self, error: TransportError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl AnnouncementSink for MockAnnouncementSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, announcement: &Announcement) -> Result<(), TransportError> {
        self.send_times.lock().unwrap().push(Instant::now());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }

        self.sent.lock().unwrap().push(announcement.clone());
        Ok(())
    }
}
