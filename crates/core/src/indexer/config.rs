//! Indexer configuration.

use serde::{Deserialize, Serialize};

/// Configuration for indexing jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Messages requested per source read.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Upper bound on processed media items per second (0 = unlimited).
    /// Skipped and non-media messages are not throttled.
    #[serde(default = "default_max_items_per_sec")]
    pub max_items_per_sec: f64,

    /// Persist the cursor after this many items.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: u64,

    /// Persist the cursor at least this often while running (seconds).
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval_secs: u64,

    /// Retries on a transient catalog error before the job fails.
    #[serde(default = "default_max_store_retries")]
    pub max_store_retries: u32,

    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_ms: u64,

    /// Resume jobs that were interrupted by a restart.
    /// When false they are left Paused.
    #[serde(default)]
    pub auto_resume_on_startup: bool,

    /// Start in maintenance mode (no job starts or resumes).
    #[serde(default)]
    pub maintenance_mode: bool,
}

fn default_batch_size() -> u32 {
    100
}

fn default_max_items_per_sec() -> f64 {
    10.0
}

fn default_checkpoint_every() -> u64 {
    50
}

fn default_checkpoint_interval() -> u64 {
    10
}

fn default_max_store_retries() -> u32 {
    5
}

fn default_retry_base_delay() -> u64 {
    100
}

fn default_retry_max_delay() -> u64 {
    5000
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_items_per_sec: default_max_items_per_sec(),
            checkpoint_every: default_checkpoint_every(),
            checkpoint_interval_secs: default_checkpoint_interval(),
            max_store_retries: default_max_store_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
            retry_max_delay_ms: default_retry_max_delay(),
            auto_resume_on_startup: false,
            maintenance_mode: false,
        }
    }
}

impl IndexerConfig {
    /// Minimum gap between processed items, if throttled.
    pub fn item_interval(&self) -> Option<std::time::Duration> {
        if self.max_items_per_sec > 0.0 && self.max_items_per_sec.is_finite() {
            Some(std::time::Duration::from_secs_f64(
                1.0 / self.max_items_per_sec,
            ))
        } else {
            None
        }
    }
}
