//! Mock metadata provider for testing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::Category;
use crate::enrichment::{Enrichment, EnrichmentError, MetadataProvider};

/// Returns configured enrichments keyed by title; unknown titles miss.
#[derive(Debug, Default)]
pub struct MockMetadataProvider {
    results: Mutex<HashMap<String, Enrichment>>,
    next_error: Mutex<Option<EnrichmentError>>,
    delay: Mutex<Option<Duration>>,
    lookups: Mutex<Vec<(String, Category)>>,
}

impl MockMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_result(&self, title: &str, enrichment: Enrichment) {
        self.results
            .lock()
            .unwrap()
            .insert(title.to_string(), enrichment);
    }

    /// Make the next lookup fail with this error.
    pub fn set_next_error(&self, error: EnrichmentError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Every lookup made so far.
    pub fn lookups(&self) -> Vec<(String, Category)> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataProvider for MockMetadataProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn lookup(
        &self,
        title: &str,
        category: Category,
    ) -> Result<Option<Enrichment>, EnrichmentError> {
        self.lookups
            .lock()
            .unwrap()
            .push((title.to_string(), category));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }

        Ok(self.results.lock().unwrap().get(title).cloned())
    }
}
