use std::collections::HashSet;

use super::{types::Config, ConfigError};

fn invalid(message: impl Into<String>) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(message.into()))
}

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Channel ids are unique
/// - Indexer rates, batch size and retry delays are usable
/// - Search page sizes are consistent
/// - Publisher queue depth is at least 1
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return invalid("server.port cannot be 0");
    }

    let mut seen = HashSet::new();
    for channel in &config.channels {
        if !seen.insert(channel.id) {
            return invalid(format!("duplicate channel id {}", channel.id));
        }
    }

    let indexer = &config.indexer;
    if indexer.batch_size == 0 {
        return invalid("indexer.batch_size must be at least 1");
    }
    if !indexer.max_items_per_sec.is_finite() || indexer.max_items_per_sec < 0.0 {
        return invalid("indexer.max_items_per_sec must be a non-negative number");
    }
    if indexer.checkpoint_every == 0 {
        return invalid("indexer.checkpoint_every must be at least 1");
    }
    if indexer.retry_max_delay_ms < indexer.retry_base_delay_ms {
        return invalid("indexer.retry_max_delay_ms cannot be below retry_base_delay_ms");
    }

    let search = &config.search;
    if search.max_page_size == 0 {
        return invalid("search.max_page_size must be at least 1");
    }
    if search.default_page_size == 0 || search.default_page_size > search.max_page_size {
        return invalid("search.default_page_size must be between 1 and max_page_size");
    }

    if config.publisher.max_queue_depth == 0 {
        return invalid("publisher.max_queue_depth must be at least 1");
    }

    Ok(())
}
