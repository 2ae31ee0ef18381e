use std::sync::Arc;

use mediadex_core::{
    CatalogStore, ChannelConfig, Config, IndexingController, PublisherHandle, SanitizedConfig,
    SearchEngine, SqliteMessageLog,
};

/// Shared application state
pub struct AppState {
    config: Config,
    catalog: Arc<dyn CatalogStore>,
    controller: Arc<IndexingController>,
    search: SearchEngine,
    publisher: PublisherHandle,
    message_log: Arc<SqliteMessageLog>,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: Arc<dyn CatalogStore>,
        controller: Arc<IndexingController>,
        publisher: PublisherHandle,
        message_log: Arc<SqliteMessageLog>,
    ) -> Self {
        let search = SearchEngine::new(Arc::clone(&catalog), config.search.clone());
        Self {
            config,
            catalog,
            controller,
            search,
            publisher,
            message_log,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn channels(&self) -> &[ChannelConfig] {
        &self.config.channels
    }

    pub fn channel(&self, id: i64) -> Option<&ChannelConfig> {
        self.config.channel(id)
    }

    pub fn catalog(&self) -> &dyn CatalogStore {
        self.catalog.as_ref()
    }

    pub fn controller(&self) -> &IndexingController {
        self.controller.as_ref()
    }

    pub fn search(&self) -> &SearchEngine {
        &self.search
    }

    pub fn publisher(&self) -> &PublisherHandle {
        &self.publisher
    }

    pub fn message_log(&self) -> &SqliteMessageLog {
        self.message_log.as_ref()
    }
}
