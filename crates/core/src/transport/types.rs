//! Types exchanged with the messaging transport.

use serde::{Deserialize, Serialize};

use crate::catalog::{MediaKind, SourceRef};

/// Media payload attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    #[serde(default)]
    pub kind: MediaKind,
    pub size_bytes: u64,
    /// Transport-level file identity, stable across forwards.
    pub file_unique_id: String,
}

/// A message as read from a source channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Ordinal within the source, starting at 0.
    pub position: i64,
    pub source: SourceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaAttachment>,
}

impl RawMessage {
    /// Text the extractor should parse: the file name, else the first
    /// non-empty caption line.
    pub fn name_text(&self) -> Option<&str> {
        self.file_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.caption
                    .as_deref()
                    .and_then(|c| c.lines().map(str::trim).find(|l| !l.is_empty()))
            })
    }
}

/// A message received for a channel, before a position is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub media: Option<MediaAttachment>,
}

/// Inline link button attached to an announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

/// A formatted post for the update channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    /// Fingerprint of the record being announced.
    pub fingerprint: String,
    /// Markdown body.
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<LinkButton>,
}
