//! Common test utilities for API testing with mocks.
//!
//! The fixture builds the real router over SQLite stores in a temp
//! directory. Indexing jobs read the same message log that
//! `POST /channels/{id}/messages` appends to, and announcements go to a
//! `MockAnnouncementSink`.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use mediadex_core::{
    testing::{MockAnnouncementSink, MockCatalog}, CatalogStore, CategoryPolicy, ChannelConfig, Config,
    DatabaseConfig, IndexerConfig, IndexingController, Ingestor, JobStore, MessageSource,
    PublisherConfig, PublisherHandle, SqliteCatalog, SqliteJobStore, SqliteMessageLog,
    UpdatePublisher,
};
use mediadex_server::state::AppState;

/// Channel configured with movie-or-series policy and live indexing.
pub const LIVE_CHANNEL: i64 = -1001;
/// Channel configured with movie policy, indexed by jobs only.
pub const ARCHIVE_CHANNEL: i64 = -1002;

/// Test fixture wrapping an in-process router.
pub struct TestFixture {
    pub router: Router,
    pub sink: Arc<MockAnnouncementSink>,
    pub publisher: PublisherHandle,
    pub controller: Arc<IndexingController>,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default settings.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            channels: vec![
                ChannelConfig {
                    id: LIVE_CHANNEL,
                    name: "Live".to_string(),
                    category: CategoryPolicy::MovieOrSeries,
                    live_index: true,
                },
                ChannelConfig {
                    id: ARCHIVE_CHANNEL,
                    name: "Archive".to_string(),
                    category: CategoryPolicy::Movie,
                    live_index: false,
                },
            ],
            indexer: IndexerConfig {
                max_items_per_sec: test_config.max_items_per_sec,
                retry_base_delay_ms: 1,
                retry_max_delay_ms: 2,
                max_store_retries: test_config
                    .max_store_retries
                    .unwrap_or_else(|| IndexerConfig::default().max_store_retries),
                ..IndexerConfig::default()
            },
            publisher: PublisherConfig {
                enabled: test_config.publisher_enabled,
                min_spacing_ms: 0,
                enrichment_timeout_ms: 50,
                ..PublisherConfig::default()
            },
            ..Config::default()
        };

        let catalog: Arc<dyn CatalogStore> = match test_config.catalog {
            Some(mock) => mock as Arc<dyn CatalogStore>,
            None => Arc::new(SqliteCatalog::new(&db_path).expect("Failed to create catalog")),
        };
        let jobs: Arc<dyn JobStore> =
            Arc::new(SqliteJobStore::new(&db_path).expect("Failed to create job store"));
        let message_log =
            Arc::new(SqliteMessageLog::new(&db_path).expect("Failed to create message log"));

        let sink = Arc::new(MockAnnouncementSink::new());
        let publisher = UpdatePublisher::new(config.publisher.clone(), sink.clone(), None);
        let publisher_handle = publisher.handle();
        publisher.spawn();

        let ingestor = Arc::new(Ingestor::new(
            Arc::clone(&catalog),
            Some(publisher_handle.clone()),
            &config.indexer,
        ));
        let source: Arc<dyn MessageSource> = message_log.clone();
        let controller = Arc::new(IndexingController::new(
            config.indexer.clone(),
            jobs,
            source,
            ingestor,
            config.channel_policies(),
        ));

        let state = Arc::new(AppState::new(
            config,
            catalog,
            Arc::clone(&controller),
            publisher_handle.clone(),
            message_log,
        ));
        let router = mediadex_server::api::create_router(state);

        Self {
            router,
            sink,
            publisher: publisher_handle,
            controller,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Fetch a raw text body (for `/metrics`).
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Post a media message with the given file name to a channel.
    pub async fn post_file(
        &self,
        channel: i64,
        message_id: i64,
        file_name: &str,
        size_bytes: u64,
    ) -> TestResponse {
        self.post(
            &format!("/api/v1/channels/{}/messages", channel),
            json!({
                "message_id": message_id,
                "file_name": file_name,
                "media": {
                    "kind": "document",
                    "size_bytes": size_bytes,
                    "file_unique_id": format!("uniq-{}-{}", channel, message_id),
                }
            }),
        )
        .await
    }

    /// Poll a job until it reaches a terminal status.
    pub async fn wait_for_job(&self, id: &str) -> Value {
        for _ in 0..300 {
            let response = self.get(&format!("/api/v1/jobs/{}", id)).await;
            let status = response.body["job"]["status"].as_str().unwrap_or_default();
            if matches!(status, "completed" | "failed" | "cancelled") {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish", id);
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub publisher_enabled: bool,
    pub max_items_per_sec: f64,
    pub max_store_retries: Option<u32>,
    /// Catalog to use instead of a file-backed one.
    pub catalog: Option<Arc<MockCatalog>>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            publisher_enabled: true,
            max_items_per_sec: 0.0,
            max_store_retries: None,
            catalog: None,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
