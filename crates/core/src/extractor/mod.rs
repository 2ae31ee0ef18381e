//! Metadata extraction from forwarded file names and captions.
//!
//! `extract` is a pure function: ordered rules run against a working copy of
//! the text with `_` replaced by spaces, every matched span is removed from
//! the title, and what remains becomes the display title.

mod rules;
mod vocabulary;

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::catalog::Category;

pub use rules::EpisodeRule;

/// Category policy of a source channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryPolicy {
    Movie,
    Series,
    Game,
    /// Mixed channel: Series when a season/episode marker is found, else Movie.
    MovieOrSeries,
}

impl CategoryPolicy {
    fn resolve(&self, has_episode_marker: bool) -> Category {
        match self {
            CategoryPolicy::Movie => Category::Movie,
            CategoryPolicy::Series => Category::Series,
            CategoryPolicy::Game => Category::Game,
            CategoryPolicy::MovieOrSeries if has_episode_marker => Category::Series,
            CategoryPolicy::MovieOrSeries => Category::Movie,
        }
    }
}

/// Structured metadata extracted from one name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedMetadata {
    pub display_title: String,
    /// Normalized form of `display_title`.
    pub title: String,
    pub category: Category,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub quality: Option<String>,
    pub audio: Option<String>,
    /// No season/episode, quality or audio rule matched.
    pub unparsable: bool,
}

/// Extract structured metadata from a raw file name or caption.
///
/// `context_season` is used only when a bare episode marker (`E05`) is found
/// without a season; without it such matches default to season 1.
pub fn extract(raw: &str, policy: CategoryPolicy, context_season: Option<u32>) -> ExtractedMetadata {
    // Same byte length as `raw`, so spans found here index into it too.
    let work = raw.replace('_', " ");

    let mut spans: Vec<Range<usize>> = Vec::new();

    let episode = rules::find_episode(&work, context_season);
    if let Some(ref m) = episode {
        spans.push(m.span.clone());
        spans.extend(m.season_span.clone());
    }

    let quality = vocabulary::find_quality(&work);
    if let Some(ref q) = quality {
        spans.push(q.span.clone());
    }
    spans.extend(vocabulary::quality_spans(&work));

    let audio_tags = vocabulary::find_audio(&work);
    spans.extend(audio_tags.iter().map(|t| t.span.clone()));

    let mut audio_values: Vec<String> = Vec::new();
    for tag in audio_tags {
        if !audio_values.contains(&tag.value) {
            audio_values.push(tag.value);
        }
    }

    spans.extend(rules::noise_spans(&work));

    let unparsable = episode.is_none() && quality.is_none() && audio_values.is_empty();
    let category = policy.resolve(episode.is_some());

    let (season, episode) = match (category, episode) {
        (Category::Series, Some(m)) => (Some(m.season), Some(m.episode)),
        _ => (None, None),
    };

    let mut display_title = build_title(&work, &spans);
    if display_title.is_empty() {
        display_title = raw.to_string();
    }
    let title = normalize_title(&display_title);

    ExtractedMetadata {
        display_title,
        title,
        category,
        season,
        episode,
        quality: quality.map(|q| q.value),
        audio: if audio_values.is_empty() {
            None
        } else {
            Some(audio_values.join(" "))
        },
        unparsable,
    }
}

/// Season stated in free text such as a caption, used as the context season
/// for names that only carry an episode number.
pub fn season_hint(text: &str) -> Option<u32> {
    rules::season_hint(&text.replace('_', " "))
}

/// Lowercase, map non-alphanumerics to spaces, collapse whitespace.
pub fn normalize_title(text: &str) -> String {
    let mapped: String = text
        .chars()
        .flat_map(|c| {
            let c = if c.is_alphanumeric() { c } else { ' ' };
            c.to_lowercase()
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn build_title(work: &str, spans: &[Range<usize>]) -> String {
    let masked: String = work
        .char_indices()
        .map(|(i, c)| {
            if spans.iter().any(|s| s.contains(&i)) || matches!(c, '.' | '-') {
                ' '
            } else {
                c
            }
        })
        .collect();

    masked.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_series_episode() {
        let meta = extract("Show.Name.S02E05.1080p.DDP5.1", CategoryPolicy::Series, None);

        assert_eq!(meta.category, Category::Series);
        assert_eq!(meta.season, Some(2));
        assert_eq!(meta.episode, Some(5));
        assert_eq!(meta.quality.as_deref(), Some("1080p"));
        assert!(meta.audio.as_deref().unwrap().contains("DDP5.1"));
        assert_eq!(meta.display_title, "Show Name");
        assert_eq!(meta.title, "show name");
        assert!(!meta.unparsable);
    }

    #[test]
    fn test_extract_unparsable() {
        let meta = extract("random_upload_42.mkv", CategoryPolicy::Movie, None);

        assert!(meta.unparsable);
        assert_eq!(meta.title, "random upload 42");
        assert_eq!(meta.season, None);
        assert_eq!(meta.episode, None);
        assert_eq!(meta.quality, None);
        assert_eq!(meta.audio, None);
    }

    #[test]
    fn test_mixed_policy_detects_series() {
        let series = extract("Dark S01E03 720p", CategoryPolicy::MovieOrSeries, None);
        assert_eq!(series.category, Category::Series);
        assert_eq!(series.episode, Some(3));

        let movie = extract("Inception 2010 720p", CategoryPolicy::MovieOrSeries, None);
        assert_eq!(movie.category, Category::Movie);
        assert_eq!(movie.season, None);
    }

    #[test]
    fn test_non_series_drops_episode_but_strips_span() {
        let meta = extract("Game.Of.Life.S01E02.mkv", CategoryPolicy::Game, None);
        assert_eq!(meta.category, Category::Game);
        assert_eq!(meta.season, None);
        assert_eq!(meta.episode, None);
        assert_eq!(meta.display_title, "Game Of Life");
        assert!(!meta.unparsable);
    }

    #[test]
    fn test_bare_episode_with_context() {
        let meta = extract("Show_Name_E12_480p.mp4", CategoryPolicy::Series, Some(4));
        assert_eq!((meta.season, meta.episode), (Some(4), Some(12)));
        assert_eq!(meta.display_title, "Show Name");
    }

    #[test]
    fn test_season_token_apart_from_episode() {
        for raw in [
            "Dark S02 Ep 05 720p.mkv",
            "Dark Season 2 E05 720p.mkv",
            "Dark.S02.-.E05.720p.mkv",
        ] {
            let meta = extract(raw, CategoryPolicy::Series, None);
            assert_eq!((meta.season, meta.episode), (Some(2), Some(5)), "{}", raw);
            assert_eq!(meta.display_title, "Dark", "{}", raw);
        }
    }

    #[test]
    fn test_split_season_dedups_with_code_form() {
        let split = extract("Dark S02 Ep 05 720p.mkv", CategoryPolicy::Series, None);
        let code = extract("Dark.S02E05.720p.mkv", CategoryPolicy::Series, None);
        assert_eq!(
            crate::fingerprint::fingerprint(&split, 1_000),
            crate::fingerprint::fingerprint(&code, 1_000)
        );
    }

    #[test]
    fn test_series_without_marker_has_neither() {
        let meta = extract("Some Show Complete 720p", CategoryPolicy::Series, None);
        assert_eq!(meta.category, Category::Series);
        assert_eq!(meta.season, None);
        assert_eq!(meta.episode, None);
    }

    #[test]
    fn test_noise_removed_from_title() {
        let meta = extract(
            "[TGx] The.Matrix.1999.1080p.BluRay.x264.AAC-@moviechannel.mkv",
            CategoryPolicy::Movie,
            None,
        );
        assert_eq!(meta.display_title, "The Matrix 1999");
        assert_eq!(meta.quality.as_deref(), Some("1080p"));
        assert_eq!(meta.audio.as_deref(), Some("AAC"));
    }

    #[test]
    fn test_audio_deduplicated_in_order() {
        let meta = extract("Film AAC DTS AAC", CategoryPolicy::Movie, None);
        assert_eq!(meta.audio.as_deref(), Some("AAC DTS"));
    }

    #[test]
    fn test_empty_title_falls_back_to_raw() {
        let meta = extract("1080p.mkv", CategoryPolicy::Movie, None);
        assert_eq!(meta.display_title, "1080p.mkv");
        assert_eq!(meta.quality.as_deref(), Some("1080p"));
    }

    #[test]
    fn test_extract_is_deterministic() {
        let raw = "Show.Name.S02E05.1080p.DDP5.1";
        assert_eq!(
            extract(raw, CategoryPolicy::Series, None),
            extract(raw, CategoryPolicy::Series, None)
        );
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  The   Matrix: Reloaded! "), "the matrix reloaded");
        assert_eq!(normalize_title("Show-Name"), "show name");
        assert_eq!(normalize_title(""), "");
    }
}
