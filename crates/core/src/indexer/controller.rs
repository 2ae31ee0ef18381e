//! Indexing job controller.
//!
//! Each running job is a tokio task holding the receiving end of a
//! `watch` control channel. The controller keeps the sending end plus a
//! live snapshot of the job so status reads see progress between
//! checkpoints.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::ingest::{IngestError, IngestOutcome, Ingestor};
use super::signal::{self, JobSignal};
use super::{
    CreateJobRequest, IndexJob, IndexerConfig, IndexerError, JobError, JobFilter, JobProgress,
    JobStatus, JobStore,
};
use crate::catalog::CatalogError;
use crate::extractor::CategoryPolicy;
use crate::metrics;
use crate::transport::{MessageSource, RawMessage};

struct ActiveJob {
    source: i64,
    signal: watch::Sender<JobSignal>,
    snapshot: watch::Receiver<IndexJob>,
    task: JoinHandle<()>,
}

impl ActiveJob {
    fn is_live(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Starts, stops and tracks indexing jobs.
pub struct IndexingController {
    config: IndexerConfig,
    jobs: Arc<dyn JobStore>,
    source: Arc<dyn MessageSource>,
    ingestor: Arc<Ingestor>,
    channels: HashMap<i64, CategoryPolicy>,
    active: Mutex<HashMap<String, ActiveJob>>,
    maintenance: AtomicBool,
}

impl IndexingController {
    pub fn new(
        config: IndexerConfig,
        jobs: Arc<dyn JobStore>,
        source: Arc<dyn MessageSource>,
        ingestor: Arc<Ingestor>,
        channels: HashMap<i64, CategoryPolicy>,
    ) -> Self {
        let maintenance = AtomicBool::new(config.maintenance_mode);
        Self {
            config,
            jobs,
            source,
            ingestor,
            channels,
            active: Mutex::new(HashMap::new()),
            maintenance,
        }
    }

    fn policy(&self, channel_id: i64) -> Result<CategoryPolicy, IndexerError> {
        self.channels
            .get(&channel_id)
            .copied()
            .ok_or(IndexerError::UnknownChannel(channel_id))
    }

    /// Create a Pending job for a configured channel.
    pub fn create_job(&self, request: &CreateJobRequest) -> Result<IndexJob, IndexerError> {
        self.policy(request.source)?;
        let job = IndexJob::new(request);
        self.jobs.insert(&job)?;
        metrics::JOB_TRANSITIONS
            .with_label_values(&[JobStatus::Pending.as_str()])
            .inc();
        info!(
            "Created indexing job {} for source {} (skip {})",
            job.id, job.source, job.skip_count
        );
        Ok(job)
    }

    /// Start a Pending job.
    pub async fn start(&self, id: &str) -> Result<IndexJob, IndexerError> {
        self.launch(id, JobStatus::Pending, "start").await
    }

    /// Resume a Paused job from its persisted cursor.
    pub async fn resume(&self, id: &str) -> Result<IndexJob, IndexerError> {
        self.launch(id, JobStatus::Paused, "resume").await
    }

    async fn launch(
        &self,
        id: &str,
        expected: JobStatus,
        operation: &str,
    ) -> Result<IndexJob, IndexerError> {
        if self.is_maintenance_mode() {
            return Err(IndexerError::Maintenance);
        }

        let mut active = self.active.lock().await;
        active.retain(|_, a| a.is_live());

        let mut job = self.jobs.get(id)?;
        if job.status != expected {
            return Err(JobError::InvalidTransition {
                job_id: job.id,
                status: job.status,
                operation: operation.to_string(),
            }
            .into());
        }
        let policy = self.policy(job.source)?;

        if let Some((other, _)) = active.iter().find(|(_, a)| a.source == job.source) {
            return Err(IndexerError::SourceBusy {
                channel_id: job.source,
                job_id: other.clone(),
            });
        }

        let now = Utc::now();
        job.status = JobStatus::Running;
        job.started_at.get_or_insert(now);
        job.updated_at = now;
        job.error = None;
        self.jobs.save(&job)?;
        metrics::JOB_TRANSITIONS
            .with_label_values(&[JobStatus::Running.as_str()])
            .inc();
        metrics::ACTIVE_JOBS.inc();

        let (signal_tx, signal_rx) = watch::channel(JobSignal::Run);
        let (snapshot_tx, snapshot_rx) = watch::channel(job.clone());
        let runner = JobRunner {
            config: self.config.clone(),
            jobs: Arc::clone(&self.jobs),
            source: Arc::clone(&self.source),
            ingestor: Arc::clone(&self.ingestor),
            policy,
            snapshot: snapshot_tx,
        };

        info!(
            "Indexing job {} on source {}: {} at position {}",
            job.id, job.source, operation, job.cursor
        );
        let task = tokio::spawn(runner.run(job.clone(), signal_rx));
        active.insert(
            job.id.clone(),
            ActiveJob {
                source: job.source,
                signal: signal_tx,
                snapshot: snapshot_rx,
                task,
            },
        );

        Ok(job)
    }

    /// Pause a Running job and wait until it has checkpointed.
    /// Pausing a Paused job is a no-op.
    pub async fn pause(&self, id: &str) -> Result<IndexJob, IndexerError> {
        if let Some(job) = self.stop_active(id, JobSignal::Pause).await? {
            return Ok(job);
        }

        let mut job = self.jobs.get(id)?;
        match job.status {
            JobStatus::Paused => Ok(job),
            // Marked Running but no task owns it.
            JobStatus::Running => {
                self.finish_orphan(&mut job, JobStatus::Paused)?;
                Ok(job)
            }
            status => Err(JobError::InvalidTransition {
                job_id: job.id,
                status,
                operation: "pause".to_string(),
            }
            .into()),
        }
    }

    /// Cancel a job. Idempotent on Cancelled; Completed and Failed jobs
    /// cannot be cancelled.
    pub async fn cancel(&self, id: &str) -> Result<IndexJob, IndexerError> {
        if let Some(job) = self.stop_active(id, JobSignal::Cancel).await? {
            return Ok(job);
        }

        let mut job = self.jobs.get(id)?;
        match job.status {
            JobStatus::Cancelled => Ok(job),
            JobStatus::Pending | JobStatus::Paused | JobStatus::Running => {
                self.finish_orphan(&mut job, JobStatus::Cancelled)?;
                info!("Cancelled indexing job {}", job.id);
                Ok(job)
            }
            status => Err(JobError::InvalidTransition {
                job_id: job.id,
                status,
                operation: "cancel".to_string(),
            }
            .into()),
        }
    }

    /// Signal a live job and wait for its task to exit.
    /// `None` when the job has no live task.
    async fn stop_active(
        &self,
        id: &str,
        signal: JobSignal,
    ) -> Result<Option<IndexJob>, IndexerError> {
        let mut active = self.active.lock().await;
        let Some(entry) = active.remove(id) else {
            return Ok(None);
        };
        if !entry.is_live() {
            return Ok(None);
        }

        let _ = entry.signal.send(signal);
        if let Err(e) = entry.task.await {
            error!("Indexing task for job {} panicked: {}", id, e);
        }
        Ok(Some(self.jobs.get(id)?))
    }

    fn finish_orphan(&self, job: &mut IndexJob, status: JobStatus) -> Result<(), IndexerError> {
        let now = Utc::now();
        job.status = status;
        job.updated_at = now;
        if status.is_terminal() {
            job.finished_at = Some(now);
        }
        self.jobs.save(job)?;
        metrics::JOB_TRANSITIONS
            .with_label_values(&[status.as_str()])
            .inc();
        Ok(())
    }

    /// Change the skip count of a Pending job.
    pub fn set_skip(&self, id: &str, skip_count: u64) -> Result<IndexJob, IndexerError> {
        let mut job = self.jobs.get(id)?;
        if job.status != JobStatus::Pending {
            return Err(JobError::InvalidTransition {
                job_id: job.id,
                status: job.status,
                operation: "set skip count of".to_string(),
            }
            .into());
        }
        job.skip_count = skip_count;
        job.updated_at = Utc::now();
        self.jobs.save(&job)?;
        Ok(job)
    }

    /// Current job state with progress figures. Running jobs report their
    /// live position rather than the last checkpoint.
    pub async fn status(&self, id: &str) -> Result<JobProgress, IndexerError> {
        let live = {
            let active = self.active.lock().await;
            active
                .get(id)
                .filter(|a| a.is_live())
                .map(|a| a.snapshot.borrow().clone())
        };
        let job = match live {
            Some(job) if job.status == JobStatus::Running => job,
            _ => self.jobs.get(id)?,
        };
        Ok(JobProgress::compute(job, Utc::now()))
    }

    pub fn list(&self, filter: &JobFilter) -> Result<Vec<IndexJob>, IndexerError> {
        Ok(self.jobs.list(filter)?)
    }

    /// Wait for a job's task to exit, then return its stored state.
    pub async fn wait(&self, id: &str) -> Result<IndexJob, IndexerError> {
        let snapshot = {
            let active = self.active.lock().await;
            active.get(id).map(|a| a.snapshot.clone())
        };
        if let Some(mut rx) = snapshot {
            while rx.changed().await.is_ok() {}
        }
        Ok(self.jobs.get(id)?)
    }

    /// Run one message through the pipeline outside of any job.
    pub async fn ingest_live(&self, message: &RawMessage) -> Result<IngestOutcome, IndexerError> {
        let policy = self.policy(message.source.channel_id)?;
        match self.ingestor.ingest(message, policy, None).await {
            Ok(outcome) => Ok(outcome),
            Err(IngestError::Store(e)) => Err(e.into()),
            Err(IngestError::Interrupted(_)) => Err(CatalogError::Unavailable(
                "live ingest interrupted".to_string(),
            )
            .into()),
        }
    }

    /// Reset jobs left Running by a previous process to Paused, resuming
    /// them when configured. Returns the recovered job ids.
    pub async fn recover_interrupted(&self) -> Result<Vec<String>, IndexerError> {
        let filter = JobFilter::new()
            .with_status(JobStatus::Running)
            .with_limit(i64::MAX);
        let mut recovered = Vec::new();

        for mut job in self.jobs.list(&filter)? {
            warn!(
                "Job {} was interrupted at position {}, marking paused",
                job.id, job.cursor
            );
            self.finish_orphan(&mut job, JobStatus::Paused)?;
            recovered.push(job.id);
        }

        if self.config.auto_resume_on_startup && !self.is_maintenance_mode() {
            for id in &recovered {
                if let Err(e) = self.resume(id).await {
                    warn!("Failed to resume job {}: {}", id, e);
                }
            }
        }

        Ok(recovered)
    }

    /// Toggle maintenance mode. Returns the previous value.
    pub fn set_maintenance_mode(&self, on: bool) -> bool {
        let previous = self.maintenance.swap(on, Ordering::SeqCst);
        if previous != on {
            info!("Maintenance mode {}", if on { "on" } else { "off" });
        }
        previous
    }

    pub fn is_maintenance_mode(&self) -> bool {
        self.maintenance.load(Ordering::SeqCst)
    }

    pub async fn active_count(&self) -> usize {
        self.active
            .lock()
            .await
            .values()
            .filter(|a| a.is_live())
            .count()
    }

    /// Pause every running job and wait for the checkpoints.
    pub async fn shutdown(&self) {
        let mut active = self.active.lock().await;
        let entries: Vec<(String, ActiveJob)> = active.drain().collect();
        for (_, entry) in &entries {
            let _ = entry.signal.send(JobSignal::Pause);
        }
        for (id, entry) in entries {
            if let Err(e) = entry.task.await {
                error!("Indexing task for job {} panicked: {}", id, e);
            }
        }
        info!("Indexing controller stopped");
    }
}

enum Exit {
    Completed,
    Paused,
    Cancelled,
    Failed(String),
}

impl From<JobSignal> for Exit {
    fn from(signal: JobSignal) -> Self {
        match signal {
            JobSignal::Cancel => Exit::Cancelled,
            _ => Exit::Paused,
        }
    }
}

/// Everything one job task needs.
struct JobRunner {
    config: IndexerConfig,
    jobs: Arc<dyn JobStore>,
    source: Arc<dyn MessageSource>,
    ingestor: Arc<Ingestor>,
    policy: CategoryPolicy,
    snapshot: watch::Sender<IndexJob>,
}

impl JobRunner {
    async fn run(self, mut job: IndexJob, mut signal: watch::Receiver<JobSignal>) {
        let exit = self.process(&mut job, &mut signal).await;

        let now = Utc::now();
        job.updated_at = now;
        job.status = match exit {
            Exit::Completed => JobStatus::Completed,
            Exit::Paused => JobStatus::Paused,
            Exit::Cancelled => JobStatus::Cancelled,
            Exit::Failed(reason) => {
                job.error = Some(reason);
                JobStatus::Failed
            }
        };
        if job.status.is_terminal() {
            job.finished_at = Some(now);
        }

        if let Err(e) = self.jobs.save(&job) {
            error!("Failed to save final state of job {}: {}", job.id, e);
        }
        self.snapshot.send_replace(job.clone());
        metrics::JOB_TRANSITIONS
            .with_label_values(&[job.status.as_str()])
            .inc();
        metrics::ACTIVE_JOBS.dec();

        match job.status {
            JobStatus::Failed => error!(
                "Indexing job {} failed at position {}: {}",
                job.id,
                job.cursor,
                job.error.as_deref().unwrap_or_default()
            ),
            status => info!(
                "Indexing job {} {} at position {} (scanned {}, inserted {}, duplicates {})",
                job.id,
                status,
                job.cursor,
                job.counters.scanned,
                job.counters.inserted,
                job.counters.duplicates
            ),
        }
    }

    fn checkpoint(&self, job: &mut IndexJob) {
        job.updated_at = Utc::now();
        match self.jobs.save(job) {
            Ok(()) => debug!("Checkpoint job {} at position {}", job.id, job.cursor),
            Err(e) => warn!("Checkpoint failed for job {}: {}", job.id, e),
        }
    }

    async fn process(&self, job: &mut IndexJob, signal: &mut watch::Receiver<JobSignal>) -> Exit {
        let item_interval = self.config.item_interval();
        let checkpoint_interval = Duration::from_secs(self.config.checkpoint_interval_secs);
        let mut last_item: Option<Instant> = None;
        let mut last_checkpoint = Instant::now();
        let mut since_checkpoint = 0u64;

        loop {
            match signal::current(signal) {
                JobSignal::Run => {}
                stop => return stop.into(),
            }
            if job.past_end() {
                return Exit::Completed;
            }

            let mut limit = self.config.batch_size.max(1);
            if let Some(end) = job.end_position {
                let remaining = (end - job.cursor + 1).clamp(1, u32::MAX as i64);
                limit = limit.min(remaining as u32);
            }

            let read = signal::or_stopped(signal, self.source.read(job.source, job.cursor, limit));
            let batch = match read.await {
                Err(stop) => return stop.into(),
                Ok(Err(e)) => {
                    return Exit::Failed(format!(
                        "reading source {} at position {}: {}",
                        job.source, job.cursor, e
                    ))
                }
                Ok(Ok(batch)) => batch,
            };
            if batch.is_empty() {
                return Exit::Completed;
            }

            for message in batch {
                if message.position < job.cursor {
                    continue;
                }
                if let Some(end) = job.end_position.filter(|end| message.position > *end) {
                    job.cursor = end + 1;
                    return Exit::Completed;
                }
                match signal::current(signal) {
                    JobSignal::Run => {}
                    stop => return stop.into(),
                }

                let skipped = message.position >= 0 && (message.position as u64) < job.skip_count;
                if !skipped {
                    if message.media.is_some() {
                        if let (Some(interval), Some(last)) = (item_interval, last_item) {
                            let wait = tokio::time::sleep_until(last + interval);
                            if let Err(stop) = signal::or_stopped(signal, wait).await {
                                return stop.into();
                            }
                        }
                        last_item = Some(Instant::now());
                    }

                    let outcome = self
                        .ingestor
                        .ingest(&message, self.policy, Some(&mut *signal))
                        .await;
                    match outcome {
                        Ok(IngestOutcome::NonMedia) => job.counters.non_media += 1,
                        Ok(IngestOutcome::Inserted(record)) => {
                            job.counters.inserted += 1;
                            if record.unparsable {
                                job.counters.unparsable += 1;
                            }
                        }
                        Ok(IngestOutcome::Duplicate(record)) => {
                            job.counters.duplicates += 1;
                            if record.unparsable {
                                job.counters.unparsable += 1;
                            }
                        }
                        Err(IngestError::Interrupted(stop)) => return stop.into(),
                        Err(IngestError::Store(e)) => {
                            job.counters.errors += 1;
                            return Exit::Failed(format!(
                                "cataloging {}: {}",
                                message.source, e
                            ));
                        }
                    }
                }

                job.counters.scanned += 1;
                job.cursor = message.position + 1;
                self.snapshot.send_replace(job.clone());

                since_checkpoint += 1;
                if since_checkpoint >= self.config.checkpoint_every.max(1)
                    || last_checkpoint.elapsed() >= checkpoint_interval
                {
                    self.checkpoint(job);
                    since_checkpoint = 0;
                    last_checkpoint = Instant::now();
                }
            }
        }
    }
}
