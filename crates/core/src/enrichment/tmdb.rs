//! TMDB (The Movie Database) metadata provider.
//!
//! Lookup is a search followed by a details fetch of the top hit, against
//! `movie` for movies and games and `tv` for series.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Enrichment, EnrichmentError, MetadataProvider};
use crate::catalog::Category;

/// TMDB provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    /// TMDB API key (required).
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Image base URL for posters (default: https://image.tmdb.org/t/p).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base_url: Option<String>,
    /// Language for titles and overviews.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en-US".to_string()
}

/// TMDB metadata provider.
pub struct TmdbProvider {
    client: Client,
    base_url: String,
    api_key: String,
    image_base_url: String,
    language: String,
}

impl TmdbProvider {
    pub fn new(config: TmdbConfig) -> Result<Self, EnrichmentError> {
        if config.api_key.is_empty() {
            return Err(EnrichmentError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .unwrap_or_else(|| "https://api.themoviedb.org/3".to_string()),
            api_key: config.api_key,
            image_base_url: config
                .image_base_url
                .unwrap_or_else(|| "https://image.tmdb.org/t/p".to_string()),
            language: config.language,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, EnrichmentError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == 401 {
            return Err(EnrichmentError::NotConfigured(
                "Invalid TMDB API key".to_string(),
            ));
        }
        if status == 429 {
            return Err(EnrichmentError::RateLimitExceeded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| EnrichmentError::ParseError(format!("{}: {}", path, e)))
    }

    fn poster_url(&self, poster_path: Option<String>) -> Option<String> {
        poster_path.map(|p| format!("{}/w500{}", self.image_base_url, p))
    }

    async fn lookup_movie(&self, title: &str) -> Result<Option<Enrichment>, EnrichmentError> {
        debug!("TMDB movie lookup: query='{}'", title);

        let search: TmdbSearchResponse<TmdbSearchResult> =
            self.get_json("/search/movie", &[("query", title)]).await?;
        let Some(hit) = search.results.into_iter().next() else {
            return Ok(None);
        };

        let details: TmdbDetails = self.get_json(&format!("/movie/{}", hit.id), &[]).await?;
        Ok(Some(self.to_enrichment(details)))
    }

    async fn lookup_tv(&self, title: &str) -> Result<Option<Enrichment>, EnrichmentError> {
        debug!("TMDB TV lookup: query='{}'", title);

        let search: TmdbSearchResponse<TmdbSearchResult> =
            self.get_json("/search/tv", &[("query", title)]).await?;
        let Some(hit) = search.results.into_iter().next() else {
            return Ok(None);
        };

        let details: TmdbDetails = self.get_json(&format!("/tv/{}", hit.id), &[]).await?;
        Ok(Some(self.to_enrichment(details)))
    }

    fn to_enrichment(&self, d: TmdbDetails) -> Enrichment {
        Enrichment {
            title: d.title.or(d.name).unwrap_or_default(),
            overview: d.overview.filter(|o| !o.is_empty()),
            rating: d.vote_average,
            release_date: d
                .release_date
                .or(d.first_air_date)
                .filter(|r| !r.is_empty()),
            genres: d.genres.into_iter().map(|g| g.name).collect(),
            poster_url: self.poster_url(d.poster_path),
        }
    }
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn lookup(
        &self,
        title: &str,
        category: Category,
    ) -> Result<Option<Enrichment>, EnrichmentError> {
        match category {
            Category::Series => self.lookup_tv(title).await,
            Category::Movie | Category::Game => self.lookup_movie(title).await,
        }
    }
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResult {
    id: u32,
}

/// Movie and TV details share everything but the title/date field names.
#[derive(Debug, Deserialize)]
struct TmdbDetails {
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    vote_average: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    name: String,
}
