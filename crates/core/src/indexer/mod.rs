//! Indexing jobs: resumable, rate-limited scans of a source channel.
//!
//! A job walks the source in position order from its persisted cursor,
//! running every message through extract, fingerprint and insert. The
//! cursor and counters are checkpointed to the job store so a paused or
//! interrupted job picks up where it left off.

mod config;
mod controller;
mod ingest;
mod retry;
mod signal;
mod sqlite_store;
mod store;
mod types;

pub use config::IndexerConfig;
pub use controller::IndexingController;
pub use ingest::{IngestError, IngestOutcome, Ingestor};
pub use retry::Backoff;
pub use signal::JobSignal;
pub use sqlite_store::SqliteJobStore;
pub use store::JobStore;
pub use types::*;
