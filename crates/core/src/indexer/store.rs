//! Job storage trait.

use super::{IndexJob, JobError, JobFilter};

/// Durable storage for indexing jobs.
///
/// `save` overwrites the whole job row; the controller is the only writer
/// for a given job so last-write-wins is sufficient.
pub trait JobStore: Send + Sync {
    fn insert(&self, job: &IndexJob) -> Result<(), JobError>;

    fn get(&self, id: &str) -> Result<IndexJob, JobError>;

    fn save(&self, job: &IndexJob) -> Result<(), JobError>;

    /// Jobs matching the filter, newest first.
    fn list(&self, filter: &JobFilter) -> Result<Vec<IndexJob>, JobError>;
}
