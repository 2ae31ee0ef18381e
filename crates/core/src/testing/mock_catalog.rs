//! Catalog wrapper with injectable insert failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::catalog::{
    CatalogError, CatalogFilter, CatalogStats, CatalogStore, FileRecord, InsertOutcome, Page,
    PageRequest, SourceRef, SqliteCatalog,
};

/// An in-memory `SqliteCatalog` whose inserts can be made to fail.
pub struct MockCatalog {
    inner: SqliteCatalog,
    failures: Mutex<Option<(u32, CatalogError)>>,
    insert_attempts: AtomicUsize,
}

impl std::fmt::Debug for MockCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCatalog")
            .field("insert_attempts", &self.insert_attempts)
            .finish()
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn copy_error(error: &CatalogError) -> CatalogError {
    match error {
        CatalogError::Unavailable(m) => CatalogError::Unavailable(m.clone()),
        CatalogError::NotFound(m) => CatalogError::NotFound(m.clone()),
        CatalogError::InvalidCursor(m) => CatalogError::InvalidCursor(m.clone()),
        CatalogError::Database(m) => CatalogError::Database(m.clone()),
    }
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            inner: SqliteCatalog::in_memory().expect("in-memory catalog"),
            failures: Mutex::new(None),
            insert_attempts: AtomicUsize::new(0),
        }
    }

    /// Fail the next `count` inserts with `error`.
    pub fn fail_inserts(&self, count: u32, error: CatalogError) {
        *self.failures.lock().unwrap() = Some((count, error));
    }

    /// Number of `insert_if_absent` calls so far, failed ones included.
    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }
}

impl CatalogStore for MockCatalog {
    fn insert_if_absent(&self, record: &FileRecord) -> Result<InsertOutcome, CatalogError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);

        let mut failures = self.failures.lock().unwrap();
        if let Some((remaining, error)) = failures.as_mut() {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(copy_error(error));
            }
        }
        drop(failures);

        self.inner.insert_if_absent(record)
    }

    fn get(&self, fingerprint: &str) -> Result<FileRecord, CatalogError> {
        self.inner.get(fingerprint)
    }

    fn get_by_prefix(&self, prefix: &str) -> Result<FileRecord, CatalogError> {
        self.inner.get_by_prefix(prefix)
    }

    fn get_by_source(&self, source: &SourceRef) -> Result<FileRecord, CatalogError> {
        self.inner.get_by_source(source)
    }

    fn query(&self, filter: &CatalogFilter, page: &PageRequest) -> Result<Page, CatalogError> {
        self.inner.query(filter, page)
    }

    fn count(&self, filter: &CatalogFilter) -> Result<u64, CatalogError> {
        self.inner.count(filter)
    }

    fn distinct_seasons(&self, filter: &CatalogFilter) -> Result<Vec<u32>, CatalogError> {
        self.inner.distinct_seasons(filter)
    }

    fn distinct_episodes(&self, filter: &CatalogFilter) -> Result<Vec<u32>, CatalogError> {
        self.inner.distinct_episodes(filter)
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        self.inner.stats()
    }
}
