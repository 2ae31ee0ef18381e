//! Publisher task: drains the queue and sends announcements.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{format_announcement, PublisherConfig, PublisherHandle};
use crate::catalog::FileRecord;
use crate::enrichment::{Enrichment, MetadataProvider};
use crate::metrics;
use crate::transport::AnnouncementSink;

/// Drives announcements for queued records.
pub struct UpdatePublisher {
    handle: PublisherHandle,
    sink: Arc<dyn AnnouncementSink>,
    provider: Option<Arc<dyn MetadataProvider>>,
}

impl UpdatePublisher {
    pub fn new(
        config: PublisherConfig,
        sink: Arc<dyn AnnouncementSink>,
        provider: Option<Arc<dyn MetadataProvider>>,
    ) -> Self {
        Self {
            handle: PublisherHandle::new(config),
            sink,
            provider,
        }
    }

    pub fn handle(&self) -> PublisherHandle {
        self.handle.clone()
    }

    /// Spawn the publisher loop. It exits after `PublisherHandle::shutdown`.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        info!(sink = self.sink.name(), "Update publisher started");
        let mut last_send: Option<Instant> = None;

        while let Some(record) = self.handle.next().await {
            if !self.handle.is_enabled() {
                debug!("Publisher disabled, skipping {}", record.fingerprint);
                self.handle.record_skipped();
                continue;
            }

            let config = self.handle.config();
            let enrichment = self.enrich(&record, &config).await;
            let announcement = format_announcement(&record, enrichment.as_ref(), &config);

            // Spacing is measured between send starts.
            if let Some(last) = last_send {
                tokio::time::sleep_until(last + Duration::from_millis(config.min_spacing_ms))
                    .await;
            }
            last_send = Some(Instant::now());

            match self.sink.send(&announcement).await {
                Ok(()) => {
                    info!("Posted update for '{}'", record.display_title);
                    self.handle.record_sent();
                }
                Err(e) => {
                    warn!(
                        "Failed to post update for {}: {}",
                        record.fingerprint, e
                    );
                    self.handle.record_failed();
                }
            }
        }

        info!("Update publisher stopped");
    }

    /// Best-effort lookup; any failure means "post unenriched".
    async fn enrich(&self, record: &FileRecord, config: &PublisherConfig) -> Option<Enrichment> {
        let provider = self.provider.as_ref()?;
        let name = provider.name().to_string();
        let timer = metrics::ENRICHMENT_DURATION
            .with_label_values(&[&name])
            .start_timer();

        let result = tokio::time::timeout(
            Duration::from_millis(config.enrichment_timeout_ms),
            provider.lookup(&record.display_title, record.category),
        )
        .await;
        timer.observe_duration();

        let (label, enrichment) = match result {
            Ok(Ok(Some(e))) => ("hit", Some(e)),
            Ok(Ok(None)) => ("miss", None),
            Ok(Err(e)) => {
                debug!("Enrichment failed for '{}': {}", record.display_title, e);
                ("error", None)
            }
            Err(_) => {
                debug!("Enrichment timed out for '{}'", record.display_title);
                ("timeout", None)
            }
        };
        metrics::ENRICHMENT_LOOKUPS
            .with_label_values(&[&name, label])
            .inc();

        enrichment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::EnrichmentError;
    use crate::testing::fixtures::record;
    use crate::testing::{MockAnnouncementSink, MockMetadataProvider};

    fn config(enabled: bool, spacing: u64) -> PublisherConfig {
        PublisherConfig {
            enabled,
            min_spacing_ms: spacing,
            enrichment_timeout_ms: 50,
            ..PublisherConfig::default()
        }
    }

    async fn wait_until<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_sends_enriched_announcement() {
        let sink = Arc::new(MockAnnouncementSink::new());
        let provider = Arc::new(MockMetadataProvider::new());
        provider.set_result(
            "Inception",
            Enrichment {
                poster_url: Some("https://img/p.jpg".to_string()),
                ..Enrichment::new("Inception")
            },
        );

        let publisher = UpdatePublisher::new(config(true, 0), sink.clone(), Some(provider));
        let handle = publisher.handle();
        let task = publisher.spawn();

        handle.notify(&record("fp1"));
        wait_until(|| handle.status().sent == 1).await;

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].photo_url.as_deref(), Some("https://img/p.jpg"));

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_enrichment_error_falls_back() {
        let sink = Arc::new(MockAnnouncementSink::new());
        let provider = Arc::new(MockMetadataProvider::new());
        provider.set_next_error(EnrichmentError::RateLimitExceeded);

        let publisher = UpdatePublisher::new(config(true, 0), sink.clone(), Some(provider));
        let handle = publisher.handle();
        let task = publisher.spawn();

        handle.notify(&record("fp1"));
        wait_until(|| handle.status().sent == 1).await;
        assert!(sink.sent()[0].photo_url.is_none());

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_enrichment_timeout_falls_back() {
        let sink = Arc::new(MockAnnouncementSink::new());
        let provider = Arc::new(MockMetadataProvider::new());
        provider.set_delay(Duration::from_millis(500));
        provider.set_result("Inception", Enrichment::new("Inception"));

        let publisher = UpdatePublisher::new(config(true, 0), sink.clone(), Some(provider));
        let handle = publisher.handle();
        let task = publisher.spawn();

        handle.notify(&record("fp1"));
        wait_until(|| handle.status().sent == 1).await;

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_counts_skipped() {
        let sink = Arc::new(MockAnnouncementSink::new());
        let publisher = UpdatePublisher::new(config(false, 0), sink.clone(), None);
        let handle = publisher.handle();
        let task = publisher.spawn();

        handle.notify(&record("a"));
        handle.notify(&record("b"));
        wait_until(|| handle.status().skipped == 2).await;
        assert!(sink.sent().is_empty());

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_failure_counted() {
        let sink = Arc::new(MockAnnouncementSink::new());
        sink.set_next_error(crate::transport::TransportError::Rejected("nope".into()));
        let publisher = UpdatePublisher::new(config(true, 0), sink.clone(), None);
        let handle = publisher.handle();
        let task = publisher.spawn();

        handle.notify(&record("a"));
        handle.notify(&record("b"));
        wait_until(|| handle.status().sent + handle.status().failed == 2).await;

        let status = handle.status();
        assert_eq!(status.failed, 1);
        assert_eq!(status.sent, 1);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_sends_are_spaced() {
        let sink = Arc::new(MockAnnouncementSink::new());
        let publisher = UpdatePublisher::new(config(true, 30), sink.clone(), None);
        let handle = publisher.handle();
        let task = publisher.spawn();

        for i in 0..5 {
            handle.notify(&record(&format!("fp{}", i)));
        }
        wait_until(|| handle.status().sent == 5).await;

        // Send timestamps are taken just after the spacing clock starts.
        let times = sink.send_times();
        for pair in times.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(29));
        }

        handle.shutdown();
        task.await.unwrap();
    }
}
