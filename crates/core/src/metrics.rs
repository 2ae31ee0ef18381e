//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Indexing (records by outcome, job transitions, store retries)
//! - Publishing (announcements, queue drops, enrichment)
//! - Search (queries by result)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Indexing Metrics
// =============================================================================

/// Messages processed by outcome.
pub static RECORDS_INDEXED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediadex_records_indexed_total",
            "Messages run through the indexing pipeline",
        ),
        &["outcome"], // "inserted", "duplicate", "non_media", "error"
    )
    .unwrap()
});

/// Records extracted without any structured tag.
pub static UNPARSABLE_RECORDS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediadex_unparsable_records_total",
        "Records built from names with no recognizable tags",
    )
    .unwrap()
});

/// Job state transitions by target status.
pub static JOB_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediadex_job_transitions_total",
            "Indexing job state transitions",
        ),
        &["status"],
    )
    .unwrap()
});

/// Jobs currently running.
pub static ACTIVE_JOBS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("mediadex_active_jobs", "Indexing jobs currently running").unwrap()
});

/// Catalog store retries after transient failures.
pub static STORE_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediadex_store_retries_total",
        "Catalog writes retried after a transient failure",
    )
    .unwrap()
});

// =============================================================================
// Publisher Metrics
// =============================================================================

/// Announcements by result.
pub static ANNOUNCEMENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediadex_announcements_total", "Update announcements"),
        &["result"], // "sent", "failed", "skipped"
    )
    .unwrap()
});

/// Notifications dropped because the publisher queue was full.
pub static ANNOUNCEMENTS_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediadex_announcements_dropped_total",
        "Notifications dropped on publisher queue overflow",
    )
    .unwrap()
});

/// Current publisher queue depth.
pub static PUBLISHER_QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediadex_publisher_queue_depth",
        "Notifications waiting to be announced",
    )
    .unwrap()
});

/// Enrichment lookups by provider and result.
pub static ENRICHMENT_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediadex_enrichment_lookups_total",
            "Metadata enrichment lookups",
        ),
        &["provider", "result"], // result: "hit", "miss", "error", "timeout"
    )
    .unwrap()
});

/// Enrichment lookup duration.
pub static ENRICHMENT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediadex_enrichment_duration_seconds",
            "Duration of enrichment lookups",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["provider"],
    )
    .unwrap()
});

// =============================================================================
// Search Metrics
// =============================================================================

/// Search queries by result.
pub static SEARCH_QUERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediadex_search_queries_total", "Catalog search queries"),
        &["result"], // "ok", "invalid", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Indexing
        Box::new(RECORDS_INDEXED.clone()),
        Box::new(UNPARSABLE_RECORDS.clone()),
        Box::new(JOB_TRANSITIONS.clone()),
        Box::new(ACTIVE_JOBS.clone()),
        Box::new(STORE_RETRIES.clone()),
        // Publisher
        Box::new(ANNOUNCEMENTS.clone()),
        Box::new(ANNOUNCEMENTS_DROPPED.clone()),
        Box::new(PUBLISHER_QUEUE_DEPTH.clone()),
        Box::new(ENRICHMENT_LOOKUPS.clone()),
        Box::new(ENRICHMENT_DURATION.clone()),
        // Search
        Box::new(SEARCH_QUERIES.clone()),
    ]
}
