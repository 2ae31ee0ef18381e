//! Types for catalog search.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CatalogError, Category, FileRecord, Page, SortOrder};

/// User-facing search query. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<u32>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    /// Free text matched against the normalized title.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub order: Option<SortOrder>,
    #[serde(default)]
    pub page_size: Option<u32>,
    /// Continuation token from a previous page.
    #[serde(default)]
    pub cursor: Option<String>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_season(mut self, season: u32) -> Self {
        self.season = Some(season);
        self
    }

    pub fn with_episode(mut self, episode: u32) -> Self {
        self.episode = Some(episode);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

/// One page of search results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub records: Vec<FileRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl From<Page> for SearchPage {
    fn from(page: Page) -> Self {
        Self {
            records: page.records,
            next_cursor: page.next_cursor,
            has_more: page.has_more,
        }
    }
}

/// Errors for search operations. Everything except `Catalog` is a
/// validation failure and is never worth retrying.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Page size {size} is out of range (1..={max})")]
    InvalidPageSize { size: u32, max: u32 },

    #[error("Season/episode filters need the series category, got {0}")]
    EpisodeFilterRequiresSeries(Category),

    #[error("Search text is {len} characters, limit is {max}")]
    TextTooLong { len: usize, max: usize },

    #[error("Invalid cursor")]
    InvalidCursor,

    #[error("Cursor was issued for a different sort order")]
    CursorOrderMismatch,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl SearchError {
    /// Stable reason code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::InvalidPageSize { .. } => "invalid_page_size",
            SearchError::EpisodeFilterRequiresSeries(_) => "episode_filter_requires_series",
            SearchError::TextTooLong { .. } => "text_too_long",
            SearchError::InvalidCursor => "invalid_cursor",
            SearchError::CursorOrderMismatch => "cursor_order_mismatch",
            SearchError::Catalog(e) if e.is_transient() => "catalog_unavailable",
            SearchError::Catalog(_) => "catalog_error",
        }
    }

    pub fn is_validation(&self) -> bool {
        !matches!(self, SearchError::Catalog(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, SearchError::Catalog(e) if e.is_transient())
    }
}
