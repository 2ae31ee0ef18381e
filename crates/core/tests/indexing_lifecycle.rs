//! Indexing lifecycle integration tests.
//!
//! These tests drive jobs through the controller against file-backed
//! stores, including a controller restart on the same database.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use mediadex_core::{
    testing::{fixtures, MockMessageSource},
    CatalogFilter, CatalogStore, CategoryPolicy, CreateJobRequest, IndexerConfig,
    IndexingController, Ingestor, JobStatus, JobStore, PageRequest, SqliteCatalog, SqliteJobStore,
};

const CHANNEL: i64 = -100200;

/// Test helper owning one database file and the stores opened on it.
struct TestHarness {
    source: Arc<MockMessageSource>,
    catalog: Arc<SqliteCatalog>,
    jobs: Arc<SqliteJobStore>,
    controller: IndexingController,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new(config: IndexerConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let source = Arc::new(MockMessageSource::new());
        Self::open(temp_dir, source, config)
    }

    fn open(temp_dir: TempDir, source: Arc<MockMessageSource>, config: IndexerConfig) -> Self {
        let db_path = temp_dir.path().join("mediadex.db");
        let catalog = Arc::new(SqliteCatalog::new(&db_path).expect("Failed to open catalog"));
        let jobs = Arc::new(SqliteJobStore::new(&db_path).expect("Failed to open job store"));
        let ingestor = Arc::new(Ingestor::new(catalog.clone(), None, &config));
        let controller = IndexingController::new(
            config,
            jobs.clone(),
            source.clone(),
            ingestor,
            HashMap::from([(CHANNEL, CategoryPolicy::MovieOrSeries)]),
        );

        Self {
            source,
            catalog,
            jobs,
            controller,
            temp_dir,
        }
    }

    /// Drop the controller and stores, then reopen them on the same file.
    async fn restart(self, config: IndexerConfig) -> Self {
        self.controller.shutdown().await;
        let Self {
            source, temp_dir, ..
        } = self;
        Self::open(temp_dir, source, config)
    }

    fn fingerprints(&self) -> BTreeSet<String> {
        self.catalog
            .query(&CatalogFilter::new(), &PageRequest::first(1000))
            .expect("query failed")
            .records
            .into_iter()
            .map(|r| r.fingerprint)
            .collect()
    }
}

fn fast_config() -> IndexerConfig {
    IndexerConfig {
        batch_size: 7,
        max_items_per_sec: 0.0,
        checkpoint_every: 3,
        retry_base_delay_ms: 1,
        retry_max_delay_ms: 2,
        ..IndexerConfig::default()
    }
}

fn whole_channel() -> CreateJobRequest {
    CreateJobRequest {
        source: CHANNEL,
        ..CreateJobRequest::default()
    }
}

fn mixed_channel() -> Vec<mediadex_core::RawMessage> {
    let mut messages = fixtures::media_messages(CHANNEL, 30);
    messages.push(fixtures::text_message(CHANNEL, 30, "Weekly digest, no files"));
    messages.push(fixtures::media_message(
        CHANNEL,
        31,
        "Dark.S01E01.720p.WEB-DL.mkv",
        350_000_000,
    ));
    messages.push(fixtures::media_message(
        CHANNEL,
        32,
        "Dark.S01E02.720p.WEB-DL.mkv",
        351_000_000,
    ));
    messages
}

#[tokio::test]
async fn test_full_run_catalogs_every_media_item() {
    let h = TestHarness::new(fast_config());
    h.source.set_messages(CHANNEL, mixed_channel());

    let job = h.controller.create_job(&whole_channel()).unwrap();
    h.controller.start(&job.id).await.unwrap();
    let done = h.controller.wait(&job.id).await.unwrap();

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.cursor, 33);
    assert_eq!(done.counters.scanned, 33);
    assert_eq!(done.counters.inserted, 32);
    assert_eq!(done.counters.non_media, 1);
    assert!(done.finished_at.is_some());

    let stats = h.catalog.stats().unwrap();
    assert_eq!(stats.total_records, 32);

    let episodes = h
        .catalog
        .distinct_episodes(&CatalogFilter::new().with_season(1))
        .unwrap();
    assert_eq!(episodes, vec![1, 2]);
}

#[tokio::test]
async fn test_second_pass_is_all_duplicates() {
    let h = TestHarness::new(fast_config());
    h.source.set_messages(CHANNEL, mixed_channel());

    let first = h.controller.create_job(&whole_channel()).unwrap();
    h.controller.start(&first.id).await.unwrap();
    h.controller.wait(&first.id).await.unwrap();
    let before = h.fingerprints();

    let second = h.controller.create_job(&whole_channel()).unwrap();
    h.controller.start(&second.id).await.unwrap();
    let done = h.controller.wait(&second.id).await.unwrap();

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.counters.inserted, 0);
    assert_eq!(done.counters.duplicates, 32);
    assert_eq!(h.fingerprints(), before);
}

#[tokio::test]
async fn test_pause_restart_resume_matches_uninterrupted_run() {
    let reference = TestHarness::new(fast_config());
    reference.source.set_messages(CHANNEL, mixed_channel());
    let job = reference.controller.create_job(&whole_channel()).unwrap();
    reference.controller.start(&job.id).await.unwrap();
    reference.controller.wait(&job.id).await.unwrap();
    let expected = reference.fingerprints();

    let slow = IndexerConfig {
        max_items_per_sec: 100.0,
        ..fast_config()
    };
    let h = TestHarness::new(slow);
    h.source.set_messages(CHANNEL, mixed_channel());
    let job = h.controller.create_job(&whole_channel()).unwrap();
    h.controller.start(&job.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;

    let paused = h.controller.pause(&job.id).await.unwrap();
    assert_eq!(paused.status, JobStatus::Paused);
    assert!(paused.cursor > 0 && paused.cursor < 33);

    let h = h.restart(fast_config()).await;
    let stored = h.jobs.get(&job.id).unwrap();
    assert_eq!(stored.status, JobStatus::Paused);
    assert_eq!(stored.cursor, paused.cursor);

    h.controller.resume(&job.id).await.unwrap();
    let done = h.controller.wait(&job.id).await.unwrap();

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.counters.scanned, 33);
    assert_eq!(done.counters.inserted, 32);
    assert_eq!(done.counters.duplicates, 0);
    assert_eq!(h.fingerprints(), expected);
}

#[tokio::test]
async fn test_crash_recovery_resumes_from_checkpoint() {
    let h = TestHarness::new(fast_config());
    h.source.set_messages(CHANNEL, mixed_channel());

    // A job left Running by a process that died after its last checkpoint.
    let mut job = h.controller.create_job(&whole_channel()).unwrap();
    job.status = JobStatus::Running;
    job.cursor = 12;
    job.counters.scanned = 12;
    job.counters.inserted = 12;
    h.jobs.save(&job).unwrap();

    let h = h
        .restart(IndexerConfig {
            auto_resume_on_startup: true,
            ..fast_config()
        })
        .await;
    let recovered = h.controller.recover_interrupted().await.unwrap();
    assert_eq!(recovered, vec![job.id.clone()]);

    let done = h.controller.wait(&job.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.counters.scanned, 33);
    assert_eq!(done.counters.inserted, 32);
    // Positions below the checkpoint were never read again.
    assert_eq!(h.catalog.stats().unwrap().total_records, 20);
}

#[tokio::test]
async fn test_cancelled_job_keeps_indexed_records() {
    let h = TestHarness::new(IndexerConfig {
        max_items_per_sec: 100.0,
        ..fast_config()
    });
    h.source.set_messages(CHANNEL, mixed_channel());

    let job = h.controller.create_job(&whole_channel()).unwrap();
    h.controller.start(&job.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    let cancelled = h.controller.cancel(&job.id).await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert!(h.controller.resume(&job.id).await.is_err());

    let indexed = h.catalog.stats().unwrap().total_records;
    assert_eq!(indexed, cancelled.counters.inserted);
    assert!(indexed < 32);
}

#[tokio::test]
async fn test_skip_and_end_bound_a_window() {
    let h = TestHarness::new(fast_config());
    h.source.set_messages(CHANNEL, mixed_channel());

    let job = h
        .controller
        .create_job(&CreateJobRequest {
            source: CHANNEL,
            skip_count: 10,
            end_position: Some(19),
        })
        .unwrap();
    h.controller.start(&job.id).await.unwrap();
    let done = h.controller.wait(&job.id).await.unwrap();

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.counters.inserted, 10);
    assert_eq!(h.catalog.stats().unwrap().total_records, 10);

    let progress = h.controller.status(&job.id).await.unwrap();
    assert_eq!(progress.percent, Some(100.0));
}
