use serde::{Deserialize, Serialize};

/// Display metadata for one title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    /// Average rating out of 10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    /// YYYY-MM-DD or partial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
}

impl Enrichment {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            overview: None,
            rating: None,
            release_date: None,
            genres: Vec::new(),
            poster_url: None,
        }
    }
}
