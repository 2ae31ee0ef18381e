//! Single-message pipeline: extract, fingerprint, insert, notify.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::retry::Backoff;
use super::signal::{self, JobSignal};
use super::IndexerConfig;
use crate::catalog::{CatalogError, CatalogStore, FileRecord, InsertOutcome};
use crate::extractor::{extract, season_hint, CategoryPolicy};
use crate::fingerprint::fingerprint;
use crate::metrics;
use crate::publisher::PublisherHandle;
use crate::transport::RawMessage;

/// What happened to one message.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    NonMedia,
    Inserted(Box<FileRecord>),
    Duplicate(Box<FileRecord>),
}

impl IngestOutcome {
    pub fn record(&self) -> Option<&FileRecord> {
        match self {
            IngestOutcome::NonMedia => None,
            IngestOutcome::Inserted(r) | IngestOutcome::Duplicate(r) => Some(r),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    /// The job was paused or cancelled while waiting to retry.
    #[error("Interrupted by {0:?}")]
    Interrupted(JobSignal),

    #[error(transparent)]
    Store(#[from] CatalogError),
}

/// Runs messages through the catalog pipeline. Shared by jobs and live ingest.
pub struct Ingestor {
    catalog: Arc<dyn CatalogStore>,
    publisher: Option<PublisherHandle>,
    backoff: Backoff,
    max_retries: u32,
}

impl Ingestor {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        publisher: Option<PublisherHandle>,
        config: &IndexerConfig,
    ) -> Self {
        Self {
            catalog,
            publisher,
            backoff: Backoff::from_millis(config.retry_base_delay_ms, config.retry_max_delay_ms),
            max_retries: config.max_store_retries,
        }
    }

    /// Build the catalog record for a media message, or `None` without media.
    pub fn build_record(message: &RawMessage, policy: CategoryPolicy) -> Option<FileRecord> {
        let media = message.media.as_ref()?;
        let raw_name = message
            .name_text()
            .unwrap_or(media.file_unique_id.as_str())
            .to_string();
        let context_season = message.caption.as_deref().and_then(season_hint);

        let meta = extract(&raw_name, policy, context_season);
        let now = Utc::now();

        Some(FileRecord {
            fingerprint: fingerprint(&meta, media.size_bytes),
            raw_name,
            title: meta.title,
            display_title: meta.display_title,
            category: meta.category,
            season: meta.season,
            episode: meta.episode,
            quality: meta.quality,
            audio: meta.audio,
            size_bytes: media.size_bytes,
            media_kind: media.kind,
            source: message.source,
            unparsable: meta.unparsable,
            indexed_at: now,
            last_seen_at: now,
        })
    }

    /// Process one message. Transient store errors are retried with backoff;
    /// when `signal` is given the backoff sleeps end early on pause/cancel.
    pub async fn ingest(
        &self,
        message: &RawMessage,
        policy: CategoryPolicy,
        mut signal: Option<&mut watch::Receiver<JobSignal>>,
    ) -> Result<IngestOutcome, IngestError> {
        let Some(record) = Self::build_record(message, policy) else {
            metrics::RECORDS_INDEXED
                .with_label_values(&["non_media"])
                .inc();
            return Ok(IngestOutcome::NonMedia);
        };

        if record.unparsable {
            debug!("No structured tags in '{}'", record.raw_name);
            metrics::UNPARSABLE_RECORDS.inc();
        }

        let mut attempt = 0;
        let outcome = loop {
            match self.catalog.insert_if_absent(&record) {
                Ok(outcome) => break outcome,
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff.delay(attempt);
                    attempt += 1;
                    metrics::STORE_RETRIES.inc();
                    warn!(
                        "Catalog unavailable for {} (attempt {}/{}), retrying in {:?}: {}",
                        message.source, attempt, self.max_retries, delay, e
                    );
                    match signal.as_deref_mut() {
                        Some(rx) => signal::sleep(rx, delay)
                            .await
                            .map_err(IngestError::Interrupted)?,
                        None => tokio::time::sleep(delay).await,
                    }
                }
                Err(e) => {
                    metrics::RECORDS_INDEXED.with_label_values(&["error"]).inc();
                    return Err(IngestError::Store(e));
                }
            }
        };

        match outcome {
            InsertOutcome::Inserted => {
                metrics::RECORDS_INDEXED
                    .with_label_values(&["inserted"])
                    .inc();
                debug!("Cataloged '{}' ({})", record.display_title, record.fingerprint);
                if let Some(ref publisher) = self.publisher {
                    publisher.notify(&record);
                }
                Ok(IngestOutcome::Inserted(Box::new(record)))
            }
            InsertOutcome::AlreadyExists => {
                metrics::RECORDS_INDEXED
                    .with_label_values(&["duplicate"])
                    .inc();
                Ok(IngestOutcome::Duplicate(Box::new(record)))
            }
        }
    }
}
