//! Types for indexing jobs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::transport::TransportError;

/// Lifecycle status of an indexing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Cancelled,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Failed => "failed",
        }
    }

    /// Completed, Cancelled and Failed are final.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Cancelled | JobStatus::Failed
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "paused" => Ok(JobStatus::Paused),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" => Ok(JobStatus::Cancelled),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// Monotonic per-job counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    /// Every position the job has moved past, skipped ones included.
    pub scanned: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub unparsable: u64,
    pub non_media: u64,
    pub errors: u64,
}

/// Persisted state of one indexing run over a source channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexJob {
    pub id: String,
    /// Source channel id.
    pub source: i64,
    pub status: JobStatus,
    /// Positions below this are counted as scanned without processing.
    pub skip_count: u64,
    /// Inclusive upper bound on positions to scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_position: Option<i64>,
    /// Next position to read. Everything below it has been processed.
    pub cursor: i64,
    pub counters: JobCounters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl IndexJob {
    /// New Pending job.
    pub fn new(request: &CreateJobRequest) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source: request.source,
            status: JobStatus::Pending,
            skip_count: request.skip_count,
            end_position: request.end_position,
            cursor: 0,
            counters: JobCounters::default(),
            error: None,
            created_at: now,
            started_at: None,
            updated_at: now,
            finished_at: None,
        }
    }

    /// Whether the cursor has moved past `end_position`.
    pub fn past_end(&self) -> bool {
        self.end_position.is_some_and(|end| self.cursor > end)
    }
}

/// Request to create a new indexing job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub source: i64,
    #[serde(default)]
    pub skip_count: u64,
    #[serde(default)]
    pub end_position: Option<i64>,
}

/// Filter for listing jobs.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub source: Option<i64>,
    pub status: Option<JobStatus>,
    pub limit: i64,
}

impl JobFilter {
    pub fn new() -> Self {
        Self {
            source: None,
            status: None,
            limit: 100,
        }
    }

    pub fn with_source(mut self, source: i64) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }
}

/// Job plus derived progress figures.
#[derive(Debug, Clone, Serialize)]
pub struct JobProgress {
    pub job: IndexJob,
    /// Only known when the job has an `end_position`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    pub elapsed_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_secs: Option<u64>,
}

impl JobProgress {
    pub fn compute(job: IndexJob, now: DateTime<Utc>) -> Self {
        let end = job.finished_at.unwrap_or(now);
        let elapsed_secs = job
            .started_at
            .map(|s| (end - s).num_seconds().max(0) as u64)
            .unwrap_or(0);

        let total = job.end_position.map(|e| (e + 1).max(0) as f64);
        let done = job.cursor.max(0) as f64;

        let percent = total.map(|t| {
            if t <= 0.0 {
                100.0
            } else {
                (done / t * 100.0).min(100.0)
            }
        });

        let eta_secs = match (total, job.status) {
            (Some(t), JobStatus::Running) if job.counters.scanned > 0 => {
                let remaining = (t - done).max(0.0);
                let rate = job.counters.scanned as f64 / elapsed_secs.max(1) as f64;
                Some((remaining / rate).round() as u64)
            }
            _ => None,
        };

        Self {
            job,
            percent,
            elapsed_secs,
            eta_secs,
        }
    }
}

/// Errors from job persistence.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Cannot {operation} job {job_id}: status is {status}")]
    InvalidTransition {
        job_id: String,
        status: JobStatus,
        operation: String,
    },

    #[error("Job store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Errors from the indexing controller.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Source {channel_id} already has running job {job_id}")]
    SourceBusy { channel_id: i64, job_id: String },

    #[error("Maintenance mode is on")]
    Maintenance,

    #[error("Unknown channel: {0}")]
    UnknownChannel(i64),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl IndexerError {
    /// Stable reason code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            IndexerError::Job(JobError::NotFound(_)) => "job_not_found",
            IndexerError::Job(JobError::InvalidTransition { .. }) => "invalid_transition",
            IndexerError::Job(_) => "job_store_error",
            IndexerError::SourceBusy { .. } => "source_busy",
            IndexerError::Maintenance => "maintenance_mode",
            IndexerError::UnknownChannel(_) => "unknown_channel",
            IndexerError::Catalog(e) if e.is_transient() => "catalog_unavailable",
            IndexerError::Catalog(_) => "catalog_error",
            IndexerError::Transport(_) => "transport_error",
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            IndexerError::Job(JobError::Unavailable(_)) => true,
            IndexerError::Catalog(e) => e.is_transient(),
            IndexerError::Transport(e) => e.is_transient(),
            _ => false,
        }
    }
}
