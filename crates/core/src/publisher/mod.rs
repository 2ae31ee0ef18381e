//! Update publisher: announces new catalog entries on the update channel.
//!
//! The indexer pushes every inserted record through a `PublisherHandle`.
//! A single `UpdatePublisher` task drains the queue, enriches, formats and
//! sends, keeping sends at least `min_spacing_ms` apart.

mod config;
mod format;
mod queue;
mod runner;

pub use config::PublisherConfig;
pub use format::{
    escape_markdown, format_announcement, link_token, readable_size, LINK_FINGERPRINT_CHARS,
    LINK_TOKEN_PREFIX,
};
pub use runner::UpdatePublisher;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::FileRecord;
use crate::metrics;
use queue::{NotificationQueue, PushOutcome};

/// Errors from publisher control operations.
#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("Invalid publisher config: {0}")]
    InvalidConfig(String),
}

/// Snapshot of publisher counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherStatus {
    pub enabled: bool,
    pub queued: usize,
    pub sent: u64,
    pub failed: u64,
    pub dropped: u64,
    pub skipped: u64,
}

struct PublisherShared {
    queue: NotificationQueue,
    enabled: AtomicBool,
    config: RwLock<PublisherConfig>,
    sent: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    skipped: AtomicU64,
}

/// Cloneable handle to the publisher queue and its toggles.
#[derive(Clone)]
pub struct PublisherHandle {
    shared: Arc<PublisherShared>,
}

impl PublisherHandle {
    pub fn new(config: PublisherConfig) -> Self {
        Self {
            shared: Arc::new(PublisherShared {
                queue: NotificationQueue::new(config.max_queue_depth),
                enabled: AtomicBool::new(config.enabled),
                config: RwLock::new(config),
                sent: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
                skipped: AtomicU64::new(0),
            }),
        }
    }

    /// Queue a newly inserted record for announcement. Never blocks.
    pub fn notify(&self, record: &FileRecord) {
        match self.shared.queue.push(record.clone()) {
            PushOutcome::Queued => {}
            PushOutcome::DroppedOldest => {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::ANNOUNCEMENTS_DROPPED.inc();
                warn!("Publisher queue full, dropped oldest notification");
            }
            PushOutcome::Closed => {
                debug!(
                    "Publisher stopped, ignoring notification for {}",
                    record.fingerprint
                );
            }
        }
        metrics::PUBLISHER_QUEUE_DEPTH.set(self.shared.queue.len() as i64);
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    /// Toggle publishing. Returns the previous value.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let previous = self.shared.enabled.swap(enabled, Ordering::SeqCst);
        if let Ok(mut config) = self.shared.config.write() {
            config.enabled = enabled;
        }
        if previous != enabled {
            info!("Update publisher {}", if enabled { "enabled" } else { "disabled" });
        }
        previous
    }

    /// Current configuration.
    pub fn config(&self) -> PublisherConfig {
        self.shared
            .config
            .read()
            .map(|c| c.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Replace the configuration. Returns the previous configuration.
    pub fn reload(&self, config: PublisherConfig) -> Result<PublisherConfig, PublisherError> {
        if config.max_queue_depth == 0 {
            return Err(PublisherError::InvalidConfig(
                "max_queue_depth must be at least 1".to_string(),
            ));
        }

        let evicted = self.shared.queue.set_capacity(config.max_queue_depth);
        if evicted > 0 {
            self.shared
                .dropped
                .fetch_add(evicted as u64, Ordering::Relaxed);
            metrics::ANNOUNCEMENTS_DROPPED.inc_by(evicted as u64);
        }

        self.shared.enabled.store(config.enabled, Ordering::SeqCst);
        let previous = match self.shared.config.write() {
            Ok(mut guard) => std::mem::replace(&mut *guard, config),
            Err(e) => std::mem::replace(&mut *e.into_inner(), config),
        };

        info!("Publisher config reloaded");
        Ok(previous)
    }

    pub fn status(&self) -> PublisherStatus {
        PublisherStatus {
            enabled: self.is_enabled(),
            queued: self.shared.queue.len(),
            sent: self.shared.sent.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
            skipped: self.shared.skipped.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting notifications and wake the publisher task so it exits.
    pub fn shutdown(&self) {
        self.shared.queue.close();
    }

    async fn next(&self) -> Option<FileRecord> {
        let record = self.shared.queue.pop().await;
        metrics::PUBLISHER_QUEUE_DEPTH.set(self.shared.queue.len() as i64);
        record
    }

    fn record_sent(&self) {
        self.shared.sent.fetch_add(1, Ordering::Relaxed);
        metrics::ANNOUNCEMENTS.with_label_values(&["sent"]).inc();
    }

    fn record_failed(&self) {
        self.shared.failed.fetch_add(1, Ordering::Relaxed);
        metrics::ANNOUNCEMENTS.with_label_values(&["failed"]).inc();
    }

    fn record_skipped(&self) {
        self.shared.skipped.fetch_add(1, Ordering::Relaxed);
        metrics::ANNOUNCEMENTS.with_label_values(&["skipped"]).inc();
    }
}
