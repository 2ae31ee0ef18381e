pub mod catalog;
pub mod config;
pub mod enrichment;
pub mod extractor;
pub mod fingerprint;
pub mod indexer;
pub mod metrics;
pub mod publisher;
pub mod search;
pub mod testing;
pub mod transport;

pub use catalog::{
    CatalogError, CatalogFilter, CatalogStats, CatalogStore, Category, FileRecord, InsertOutcome,
    MediaKind, Page, PageCursor, PageRequest, SortOrder, SourceRef, SqliteCatalog,
};
pub use config::{
    load_config, load_config_from_str, validate_config, ChannelConfig, Config, ConfigError,
    DatabaseConfig, SanitizedConfig, ServerConfig,
};
pub use enrichment::{Enrichment, EnrichmentError, MetadataProvider, TmdbConfig, TmdbProvider};
pub use extractor::{extract, normalize_title, CategoryPolicy, ExtractedMetadata};
pub use fingerprint::fingerprint;
pub use indexer::{
    CreateJobRequest, IndexJob, IndexerConfig, IndexerError, IndexingController, Ingestor,
    JobCounters, JobError, JobFilter, JobProgress, JobStatus, JobStore, SqliteJobStore,
};
pub use publisher::{
    link_token, PublisherConfig, PublisherError, PublisherHandle, PublisherStatus,
    UpdatePublisher, LINK_TOKEN_PREFIX,
};
pub use search::{SearchConfig, SearchEngine, SearchError, SearchPage, SearchQuery};
pub use transport::{
    Announcement, AnnouncementSink, IncomingMessage, LogSink, MessageSource, RawMessage,
    SqliteMessageLog, TelegramConfig, TelegramSink, TransportError,
};
