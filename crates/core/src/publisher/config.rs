//! Update publisher configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the update publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Post announcements for new catalog entries.
    /// When disabled, notifications are drained and counted as skipped.
    #[serde(default)]
    pub enabled: bool,

    /// Maximum queued notifications. On overflow the oldest is dropped.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,

    /// Minimum time between two sends (milliseconds).
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,

    /// Upper bound for one enrichment lookup (milliseconds).
    #[serde(default = "default_enrichment_timeout_ms")]
    pub enrichment_timeout_ms: u64,

    /// Base deep link for the "GET FILE" button, e.g. `https://t.me/my_bot`.
    /// No button is attached when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_base: Option<String>,

    /// Overview text is cut to this many characters.
    #[serde(default = "default_overview_max_chars")]
    pub overview_max_chars: usize,
}

fn default_max_queue_depth() -> usize {
    1000
}

fn default_min_spacing_ms() -> u64 {
    1000
}

fn default_enrichment_timeout_ms() -> u64 {
    5000
}

fn default_overview_max_chars() -> usize {
    200
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_queue_depth: default_max_queue_depth(),
            min_spacing_ms: default_min_spacing_ms(),
            enrichment_timeout_ms: default_enrichment_timeout_ms(),
            link_base: None,
            overview_max_chars: default_overview_max_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PublisherConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.max_queue_depth, 1000);
        assert_eq!(config.min_spacing_ms, 1000);
        assert_eq!(config.enrichment_timeout_ms, 5000);
        assert!(config.link_base.is_none());
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            enabled = true
            min_spacing_ms = 3000
            link_base = "https://t.me/media_bot"
        "#;
        let config: PublisherConfig = toml::from_str(toml).unwrap();
        assert!(config.enabled);
        assert_eq!(config.min_spacing_ms, 3000);
        assert_eq!(config.max_queue_depth, 1000);
        assert_eq!(config.link_base.as_deref(), Some("https://t.me/media_bot"));
    }
}
