//! Announcement formatting (Telegram legacy Markdown).

use crate::catalog::{Category, FileRecord};
use crate::enrichment::Enrichment;
use crate::transport::{Announcement, LinkButton};

use super::PublisherConfig;

/// Hex characters of the fingerprint carried in the deep link. Keeps the
/// start parameter under the transport's 64-character limit.
pub const LINK_FINGERPRINT_CHARS: usize = 32;

/// Marker in front of the fingerprint prefix in a deep-link start token.
pub const LINK_TOKEN_PREFIX: &str = "file_";

/// Start token for a record's deep link: `file_<fingerprint prefix>`.
/// `GET /records/link/{token}` resolves it back to the record.
pub fn link_token(fingerprint: &str) -> String {
    let prefix: String = fingerprint.chars().take(LINK_FINGERPRINT_CHARS).collect();
    format!("{}{}", LINK_TOKEN_PREFIX, prefix)
}

/// Human-readable size with two decimals (B, KB, MB, GB, TB, PB).
pub fn readable_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "Unknown".to_string();
    }

    let mut size = size_bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} PB", size)
}

/// Escape characters that legacy Markdown treats as entity markers.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

/// Build the announcement for a newly cataloged record.
pub fn format_announcement(
    record: &FileRecord,
    enrichment: Option<&Enrichment>,
    config: &PublisherConfig,
) -> Announcement {
    let title = enrichment
        .map(|e| e.title.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or(&record.display_title);

    let mut text = format!("🎬 *{}*\n", escape_markdown(title));

    if let Some(e) = enrichment {
        if let Some(ref overview) = e.overview {
            let (cut, truncated) = truncate_chars(overview, config.overview_max_chars);
            text.push_str(&format!(
                "\n📝 {}{}\n",
                escape_markdown(cut),
                if truncated { "..." } else { "" }
            ));
        }
        text.push('\n');
        if let Some(rating) = e.rating {
            text.push_str(&format!("⭐ *Rating:* {:.1}/10\n", rating));
        }
        if let Some(ref release) = e.release_date {
            text.push_str(&format!("📅 *Release:* {}\n", escape_markdown(release)));
        }
        if !e.genres.is_empty() {
            text.push_str(&format!(
                "🎭 *Genres:* {}\n",
                escape_markdown(&e.genres.join(", "))
            ));
        }
    } else {
        text.push('\n');
    }

    if let Some(ref quality) = record.quality {
        text.push_str(&format!("🎞 *Quality:* {}\n", escape_markdown(quality)));
    }
    if let Some(ref audio) = record.audio {
        text.push_str(&format!("🔊 *Audio:* {}\n", escape_markdown(audio)));
    }
    if let (Category::Series, Some(season), Some(episode)) =
        (record.category, record.season, record.episode)
    {
        text.push_str(&format!("📺 *S{:02}E{:02}*\n", season, episode));
    }

    text.push_str(&format!("\n💾 *Size:* {}\n", readable_size(record.size_bytes)));

    let button = config.link_base.as_ref().map(|base| LinkButton {
        label: "📁 GET FILE".to_string(),
        url: format!(
            "{}?start={}",
            base.trim_end_matches('/'),
            link_token(&record.fingerprint)
        ),
    });

    Announcement {
        fingerprint: record.fingerprint.clone(),
        text,
        photo_url: enrichment.and_then(|e| e.poster_url.clone()),
        button,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{episode_record, record};

    #[test]
    fn test_readable_size() {
        assert_eq!(readable_size(0), "Unknown");
        assert_eq!(readable_size(512), "512.00 B");
        assert_eq!(readable_size(1536), "1.50 KB");
        assert_eq!(readable_size(700 * 1024 * 1024), "700.00 MB");
        assert_eq!(readable_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_link_token_carries_fingerprint_prefix() {
        let fingerprint = "0123456789abcdef".repeat(4);
        let token = link_token(&fingerprint);
        assert_eq!(token, format!("file_{}", &fingerprint[..32]));
        assert_eq!(link_token("abc"), "file_abc");
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a_b*c"), "a\\_b\\*c");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn test_unenriched_series_announcement() {
        let record = episode_record("fp", "Dark", 1, 3);
        let a = format_announcement(&record, None, &PublisherConfig::default());

        assert!(a.text.starts_with("🎬 *Dark*"));
        assert!(a.text.contains("📺 *S01E03*"));
        assert!(a.text.contains("🎞 *Quality:* 1080p"));
        assert!(a.text.contains("💾 *Size:*"));
        assert!(!a.text.contains("Rating"));
        assert!(a.photo_url.is_none());
        assert!(a.button.is_none());
    }

    #[test]
    fn test_enriched_announcement() {
        let record = record(&"ab".repeat(32));
        let enrichment = Enrichment {
            title: "The Matrix".to_string(),
            overview: Some("x".repeat(300)),
            rating: Some(8.2),
            release_date: Some("1999-03-30".to_string()),
            genres: vec!["Action".to_string(), "Science Fiction".to_string()],
            poster_url: Some("https://image.tmdb.org/t/p/w500/p.jpg".to_string()),
        };
        let config = PublisherConfig {
            link_base: Some("https://t.me/media_bot/".to_string()),
            ..PublisherConfig::default()
        };

        let a = format_announcement(&record, Some(&enrichment), &config);

        assert!(a.text.starts_with("🎬 *The Matrix*"));
        assert!(a.text.contains(&format!("📝 {}...", "x".repeat(200))));
        assert!(!a.text.contains(&"x".repeat(201)));
        assert!(a.text.contains("⭐ *Rating:* 8.2/10"));
        assert!(a.text.contains("🎭 *Genres:* Action, Science Fiction"));
        assert_eq!(a.photo_url.as_deref(), Some("https://image.tmdb.org/t/p/w500/p.jpg"));

        let button = a.button.unwrap();
        assert_eq!(button.label, "📁 GET FILE");
        assert_eq!(
            button.url,
            format!("https://t.me/media_bot?start=file_{}", "ab".repeat(16))
        );
    }
}
