//! Media catalog - the persistent, deduplicated collection of indexed files.
//!
//! Records are keyed by fingerprint. `insert_if_absent` is the only operation
//! with a hard atomicity requirement: concurrent inserts of the same
//! fingerprint yield exactly one `Inserted`.

mod cursor;
mod sqlite;
mod types;

pub use sqlite::SqliteCatalog;
pub use types::*;

pub(crate) use cursor::{format_timestamp, parse_timestamp};

/// Trait for catalog storage.
pub trait CatalogStore: Send + Sync {
    /// Insert a record unless one with the same fingerprint exists.
    ///
    /// On `AlreadyExists` the stored record's `last_seen_at` is bumped;
    /// nothing else changes.
    fn insert_if_absent(&self, record: &FileRecord) -> Result<InsertOutcome, CatalogError>;

    /// Get a record by fingerprint.
    fn get(&self, fingerprint: &str) -> Result<FileRecord, CatalogError>;

    /// Get the single record whose fingerprint starts with `prefix`.
    /// A prefix matching no record or several records is `NotFound`.
    fn get_by_prefix(&self, prefix: &str) -> Result<FileRecord, CatalogError>;

    /// Get the record that was indexed from a given transport message.
    fn get_by_source(&self, source: &SourceRef) -> Result<FileRecord, CatalogError>;

    /// Query one page of records matching the filter.
    fn query(&self, filter: &CatalogFilter, page: &PageRequest) -> Result<Page, CatalogError>;

    /// Count records matching the filter.
    fn count(&self, filter: &CatalogFilter) -> Result<u64, CatalogError>;

    /// Distinct seasons among records matching the filter, ascending.
    fn distinct_seasons(&self, filter: &CatalogFilter) -> Result<Vec<u32>, CatalogError>;

    /// Distinct episodes among records matching the filter, ascending.
    fn distinct_episodes(&self, filter: &CatalogFilter) -> Result<Vec<u32>, CatalogError>;

    /// Get catalog statistics.
    fn stats(&self) -> Result<CatalogStats, CatalogError>;
}
