use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::enrichment::TmdbConfig;
use crate::extractor::CategoryPolicy;
use crate::indexer::IndexerConfig;
use crate::publisher::PublisherConfig;
use crate::search::SearchConfig;
use crate::transport::TelegramConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Source channels the indexer may read.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    /// Enrichment provider; announcements go out unenriched without it.
    #[serde(default)]
    pub tmdb: Option<TmdbConfig>,
    /// Update channel sink; announcements are only logged without it.
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    /// Category policy per configured channel id.
    pub fn channel_policies(&self) -> HashMap<i64, CategoryPolicy> {
        self.channels.iter().map(|c| (c.id, c.category)).collect()
    }

    pub fn channel(&self, id: i64) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.id == id)
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file holding the catalog, job checkpoints and message log.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mediadex.db")
}

/// One source channel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChannelConfig {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub category: CategoryPolicy,
    /// Catalog new posts as they arrive, outside of any job.
    #[serde(default)]
    pub live_index: bool,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub channels: Vec<ChannelConfig>,
    pub indexer: IndexerConfig,
    pub search: SearchConfig,
    pub publisher: PublisherConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<SanitizedTmdbConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<SanitizedTelegramConfig>,
}

/// Sanitized TMDB config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTmdbConfig {
    pub api_key_configured: bool,
    pub language: String,
}

/// Sanitized Telegram config (bot token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTelegramConfig {
    pub bot_token_configured: bool,
    pub update_chat: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            channels: config.channels.clone(),
            indexer: config.indexer.clone(),
            search: config.search.clone(),
            publisher: config.publisher.clone(),
            tmdb: config.tmdb.as_ref().map(|t| SanitizedTmdbConfig {
                api_key_configured: !t.api_key.is_empty(),
                language: t.language.clone(),
            }),
            telegram: config.telegram.as_ref().map(|t| SanitizedTelegramConfig {
                bot_token_configured: !t.bot_token.is_empty(),
                update_chat: t.update_chat.clone(),
            }),
        }
    }
}
