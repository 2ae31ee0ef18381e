//! Dedup key derivation.
//!
//! A fingerprint is the lowercase hex SHA-256 of the normalized title,
//! category, season, episode, quality and size joined by the ASCII unit
//! separator. Absent values hash as empty fields.

use sha2::{Digest, Sha256};

use crate::catalog::Category;
use crate::extractor::{normalize_title, ExtractedMetadata};

const UNIT_SEPARATOR: u8 = 0x1F;

/// Fields that identify one file at metadata level.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintParts<'a> {
    pub title: &'a str,
    pub category: Category,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub quality: Option<&'a str>,
    pub size_bytes: u64,
}

impl<'a> FingerprintParts<'a> {
    pub fn from_metadata(meta: &'a ExtractedMetadata, size_bytes: u64) -> Self {
        Self {
            title: &meta.title,
            category: meta.category,
            season: meta.season,
            episode: meta.episode,
            quality: meta.quality.as_deref(),
            size_bytes,
        }
    }
}

/// Compute the fingerprint for the given parts.
pub fn compute(parts: &FingerprintParts<'_>) -> String {
    let fields = [
        normalize_title(parts.title),
        parts.category.as_str().to_string(),
        parts.season.map(|s| s.to_string()).unwrap_or_default(),
        parts.episode.map(|e| e.to_string()).unwrap_or_default(),
        parts.quality.unwrap_or_default().to_string(),
        parts.size_bytes.to_string(),
    ];

    let mut hasher = Sha256::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update([UNIT_SEPARATOR]);
        }
        hasher.update(field.as_bytes());
    }

    format!("{:x}", hasher.finalize())
}

/// Fingerprint of extracted metadata plus file size.
pub fn fingerprint(meta: &ExtractedMetadata, size_bytes: u64) -> String {
    compute(&FingerprintParts::from_metadata(meta, size_bytes))
}
