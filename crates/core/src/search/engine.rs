//! Search engine over the catalog store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SearchError, SearchPage, SearchQuery};
use crate::catalog::{CatalogFilter, CatalogStore, Category, PageCursor, PageRequest};
use crate::extractor::normalize_title;
use crate::metrics;

/// Search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Maximum length of the free-text term, in characters.
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,
}

fn default_page_size() -> u32 {
    10
}

fn default_max_page_size() -> u32 {
    100
}

fn default_max_text_len() -> usize {
    200
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_text_len: default_max_text_len(),
        }
    }
}

/// Compiles search queries into catalog filters.
pub struct SearchEngine {
    catalog: Arc<dyn CatalogStore>,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(catalog: Arc<dyn CatalogStore>, config: SearchConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Validate the filter part of a query and compile it.
    fn compile(&self, query: &SearchQuery) -> Result<CatalogFilter, SearchError> {
        if let Some(category) = query.category {
            if category != Category::Series && (query.season.is_some() || query.episode.is_some())
            {
                return Err(SearchError::EpisodeFilterRequiresSeries(category));
            }
        }

        let title = match query.text.as_deref() {
            Some(text) => {
                let len = text.chars().count();
                if len > self.config.max_text_len {
                    return Err(SearchError::TextTooLong {
                        len,
                        max: self.config.max_text_len,
                    });
                }
                Some(normalize_title(text)).filter(|t| !t.is_empty())
            }
            None => None,
        };

        let non_empty = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(CatalogFilter {
            category: query.category,
            season: query.season,
            episode: query.episode,
            quality: non_empty(&query.quality),
            audio: non_empty(&query.audio),
            title,
        })
    }

    fn page_request(&self, query: &SearchQuery) -> Result<PageRequest, SearchError> {
        let size = query.page_size.unwrap_or(self.config.default_page_size);
        if size == 0 || size > self.config.max_page_size {
            return Err(SearchError::InvalidPageSize {
                size,
                max: self.config.max_page_size,
            });
        }

        let order = query.order.unwrap_or_default();
        let mut request = PageRequest::first(size).with_order(order);

        if let Some(token) = query.cursor.as_deref().filter(|t| !t.is_empty()) {
            let cursor = PageCursor::decode(token).map_err(|_| SearchError::InvalidCursor)?;
            if cursor.order != order {
                return Err(SearchError::CursorOrderMismatch);
            }
            request = request.after(cursor);
        }

        Ok(request)
    }

    fn observe<T>(result: Result<T, SearchError>) -> Result<T, SearchError> {
        let label = match &result {
            Ok(_) => "ok",
            Err(e) if e.is_validation() => "rejected",
            Err(_) => "error",
        };
        metrics::SEARCH_QUERIES.with_label_values(&[label]).inc();
        result
    }

    /// One page of records matching the query.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchPage, SearchError> {
        Self::observe(self.run_search(query))
    }

    fn run_search(&self, query: &SearchQuery) -> Result<SearchPage, SearchError> {
        let filter = self.compile(query)?;
        let page = self.page_request(query)?;
        debug!(?filter, limit = page.limit, "Catalog search");
        Ok(self.catalog.query(&filter, &page)?.into())
    }

    /// Number of records matching the query. Paging fields are ignored.
    pub fn count(&self, query: &SearchQuery) -> Result<u64, SearchError> {
        let filter = self.compile(query)?;
        Ok(self.catalog.count(&filter)?)
    }

    /// Seasons available for the query, ignoring its season and episode.
    pub fn seasons(&self, query: &SearchQuery) -> Result<Vec<u32>, SearchError> {
        let mut filter = self.compile(query)?;
        filter.season = None;
        filter.episode = None;
        Ok(self.catalog.distinct_seasons(&filter)?)
    }

    /// Episodes available for the query, ignoring its episode.
    pub fn episodes(&self, query: &SearchQuery) -> Result<Vec<u32>, SearchError> {
        let mut filter = self.compile(query)?;
        filter.episode = None;
        Ok(self.catalog.distinct_episodes(&filter)?)
    }
}
