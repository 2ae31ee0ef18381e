//! Testing utilities and mock implementations.
//!
//! Every external boundary of the catalog has an in-memory stand-in here,
//! so the indexer, publisher and HTTP layer can be exercised without a
//! messaging transport or an enrichment API.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediadex_core::testing::{fixtures, MockAnnouncementSink, MockMessageSource};
//!
//! let source = MockMessageSource::new();
//! source.set_messages(-100, fixtures::media_messages(-100, 20));
//!
//! let sink = MockAnnouncementSink::new();
//! // ... run a job, then inspect sink.sent()
//! ```

mod mock_catalog;
mod mock_provider;
mod mock_sink;
mod mock_source;

pub use mock_catalog::MockCatalog;
pub use mock_provider::MockMetadataProvider;
pub use mock_sink::MockAnnouncementSink;
pub use mock_source::MockMessageSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::catalog::{Category, FileRecord, MediaKind, SourceRef};
    use crate::transport::{MediaAttachment, RawMessage};

    /// A cataloged movie with reasonable defaults.
    pub fn record(fingerprint: &str) -> FileRecord {
        let now = Utc::now();
        FileRecord {
            fingerprint: fingerprint.to_string(),
            raw_name: "Inception.2010.1080p.AAC.mkv".to_string(),
            title: "inception".to_string(),
            display_title: "Inception".to_string(),
            category: Category::Movie,
            season: None,
            episode: None,
            quality: Some("1080p".to_string()),
            audio: Some("AAC".to_string()),
            size_bytes: 700 * 1024 * 1024,
            media_kind: MediaKind::Video,
            source: SourceRef::new(-100, 1),
            unparsable: false,
            indexed_at: now,
            last_seen_at: now,
        }
    }

    /// A cataloged series episode.
    pub fn episode_record(fingerprint: &str, title: &str, season: u32, episode: u32) -> FileRecord {
        FileRecord {
            raw_name: format!("{}.S{:02}E{:02}.1080p.mkv", title, season, episode),
            title: title.to_lowercase(),
            display_title: title.to_string(),
            category: Category::Series,
            season: Some(season),
            episode: Some(episode),
            audio: None,
            size_bytes: 350 * 1024 * 1024,
            media_kind: MediaKind::Document,
            ..record(fingerprint)
        }
    }

    /// A message carrying a document named `file_name`.
    pub fn media_message(channel_id: i64, position: i64, file_name: &str, size_bytes: u64) -> RawMessage {
        RawMessage {
            position,
            source: SourceRef::new(channel_id, position + 1),
            file_name: Some(file_name.to_string()),
            caption: None,
            media: Some(MediaAttachment {
                kind: MediaKind::Document,
                size_bytes,
                file_unique_id: format!("file-{}-{}", channel_id, position),
            }),
        }
    }

    /// A plain text message without media.
    pub fn text_message(channel_id: i64, position: i64, text: &str) -> RawMessage {
        RawMessage {
            position,
            source: SourceRef::new(channel_id, position + 1),
            file_name: None,
            caption: Some(text.to_string()),
            media: None,
        }
    }

    /// `count` media messages at positions `0..count`, each a distinct file.
    pub fn media_messages(channel_id: i64, count: usize) -> Vec<RawMessage> {
        (0..count)
            .map(|i| {
                media_message(
                    channel_id,
                    i as i64,
                    &format!("Film.{:04}.1080p.x264.mkv", i),
                    1_000_000 + i as u64,
                )
            })
            .collect()
    }
}
