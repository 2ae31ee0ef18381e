//! Season/episode and noise rules.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Which season/episode rule produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeRule {
    /// `S02E05`, `S2 E5`, `S02.E05`
    SeasonEpisodeCode,
    /// `Season 1 Episode 3`, `Season 1 Ep 3`
    SeasonEpisodeWords,
    /// `E05`, `Ep 5`, `Episode 5` without a season
    BareEpisode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EpisodeMatch {
    pub rule: EpisodeRule,
    pub season: u32,
    pub episode: u32,
    pub span: Range<usize>,
    /// Standalone season token paired with a bare episode, e.g. `S02` in `S02 Ep 05`.
    pub season_span: Option<Range<usize>>,
}

struct CompiledRule {
    rule: EpisodeRule,
    regex: Regex,
}

/// Priority order; the first rule with any match wins.
static EPISODE_RULES: Lazy<Vec<CompiledRule>> = Lazy::new(|| {
    [
        (
            EpisodeRule::SeasonEpisodeCode,
            r"(?i)\bs(\d{1,3})[\s.]?e(\d{1,4})",
        ),
        (
            EpisodeRule::SeasonEpisodeWords,
            r"(?i)\bseason[\s.]*(\d{1,3})[\s.\-]*(?:episode|ep)[\s.]*(\d{1,4})",
        ),
        (
            EpisodeRule::BareEpisode,
            r"(?i)\b(?:episode[\s.]*|ep[\s.]*|e)(\d{1,4})\b",
        ),
    ]
    .into_iter()
    .filter_map(|(rule, pattern)| Regex::new(pattern).ok().map(|regex| CompiledRule { rule, regex }))
    .collect()
});

static NOISE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // File extension at the end
        r"(?i)\.(mkv|mp4|avi|m4v|mov|wmv|flv|webm|mpg|mpeg|m2ts|ts|zip|rar|7z|iso|srt|apk|exe)\s*$",
        // Bracketed tags
        r"\[[^\]]*\]",
        r"\{[^}]*\}",
        // Mentions and links
        r"@\w+",
        r"(?i)(https?://|www\.|t\.me/)\S+",
        // Codec / encoder tokens
        r"(?i)\b(x264|x265|h\.?264|h\.?265|hevc|avc|10bit|8bit|hdr10|hdr|esubs?|msubs?)\b",
    ]
    .into_iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static SEASON_HINT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:season[\s.]*|s)(\d{1,3})\b").ok());

/// Season named on its own, e.g. `Season 2` or `S02` in a caption.
pub(crate) fn season_hint(text: &str) -> Option<u32> {
    if let Some(m) = find_episode(text, None) {
        if m.rule != EpisodeRule::BareEpisode {
            return Some(m.season);
        }
    }
    SEASON_HINT
        .as_ref()?
        .captures(text)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Find the season/episode marker, following rule priority and then the
/// leftmost match within a rule.
pub(crate) fn find_episode(text: &str, context_season: Option<u32>) -> Option<EpisodeMatch> {
    for compiled in EPISODE_RULES.iter() {
        let Some(caps) = compiled.regex.captures(text) else {
            continue;
        };
        let Some(whole) = caps.get(0) else {
            continue;
        };

        let mut season_span = None;
        let parsed = match compiled.rule {
            EpisodeRule::BareEpisode => {
                let episode = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
                // A season written in the same text wins over the context.
                let own_season = standalone_season(text, &whole.range());
                let season = match own_season {
                    Some((season, span)) => {
                        season_span = Some(span);
                        season
                    }
                    None => context_season.unwrap_or(1),
                };
                episode.map(|episode| (season, episode))
            }
            _ => {
                let season = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
                let episode = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
                season.zip(episode)
            }
        };

        if let Some((season, episode)) = parsed {
            return Some(EpisodeMatch {
                rule: compiled.rule,
                season,
                episode,
                span: whole.range(),
                season_span,
            });
        }
    }

    None
}

/// Leftmost `Season <n>` or `S<nn>` token outside `episode_span`.
fn standalone_season(text: &str, episode_span: &Range<usize>) -> Option<(u32, Range<usize>)> {
    SEASON_HINT
        .as_ref()?
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if whole.start() < episode_span.end && episode_span.start < whole.end() {
                return None;
            }
            let season = caps.get(1)?.as_str().parse().ok()?;
            Some((season, whole.range()))
        })
        .next()
}

/// Spans of noise that never belong in a title.
pub(crate) fn noise_spans(text: &str) -> Vec<Range<usize>> {
    NOISE_PATTERNS
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| m.range()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_episode_code_variants() {
        for text in ["Show S02E05", "Show s2 e5", "Show S02.E05", "Show.S02E05.720p"] {
            let m = find_episode(text, None).unwrap();
            assert_eq!(m.rule, EpisodeRule::SeasonEpisodeCode, "{}", text);
            assert_eq!((m.season, m.episode), (2, 5), "{}", text);
        }
    }

    #[test]
    fn test_season_episode_words() {
        let m = find_episode("Show Season 1 Episode 3", None).unwrap();
        assert_eq!(m.rule, EpisodeRule::SeasonEpisodeWords);
        assert_eq!((m.season, m.episode), (1, 3));

        let m = find_episode("Show season 4 ep 12", None).unwrap();
        assert_eq!((m.season, m.episode), (4, 12));
    }

    #[test]
    fn test_season_hint() {
        assert_eq!(season_hint("Dark Season 2 complete"), Some(2));
        assert_eq!(season_hint("Dark S03 pack"), Some(3));
        assert_eq!(season_hint("Dark S03E04"), Some(3));
        assert_eq!(season_hint("Dark E04"), None);
        assert_eq!(season_hint("no hint here"), None);
    }

    #[test]
    fn test_bare_episode_uses_context_season() {
        let m = find_episode("Show E07 720p", Some(3)).unwrap();
        assert_eq!(m.rule, EpisodeRule::BareEpisode);
        assert_eq!((m.season, m.episode), (3, 7));

        let m = find_episode("Show Episode 9", None).unwrap();
        assert_eq!((m.season, m.episode), (1, 9));
    }

    #[test]
    fn test_bare_episode_prefers_season_in_text() {
        let m = find_episode("Dark S02 Ep 05 720p", Some(7)).unwrap();
        assert_eq!(m.rule, EpisodeRule::BareEpisode);
        assert_eq!((m.season, m.episode), (2, 5));
        assert_eq!(m.season_span, Some(5..8));

        let m = find_episode("Dark Season 2 E05", None).unwrap();
        assert_eq!((m.season, m.episode), (2, 5));
        assert_eq!(m.season_span, Some(5..13));

        let m = find_episode("Show E07", Some(3)).unwrap();
        assert_eq!(m.season_span, None);
    }

    #[test]
    fn test_rule_priority_over_position() {
        // Bare episode appears first, but the code rule has priority.
        let m = find_episode("E01 Show S03E04", None).unwrap();
        assert_eq!((m.season, m.episode), (3, 4));
    }

    #[test]
    fn test_leftmost_within_rule() {
        let m = find_episode("Show S01E01 S01E02", None).unwrap();
        assert_eq!(m.episode, 1);
        assert_eq!(m.span, 5..11);
    }

    #[test]
    fn test_no_episode_marker() {
        assert!(find_episode("Inception 2010 1080p", None).is_none());
        assert!(find_episode("Show EAC3", None).is_none());
    }

    #[test]
    fn test_noise_spans() {
        let text = "[Group] Movie @channel x265 https://t.me/x.mkv";
        let spans = noise_spans(text);
        let removed: Vec<&str> = spans.iter().map(|s| &text[s.clone()]).collect();
        assert!(removed.contains(&"[Group]"));
        assert!(removed.contains(&"@channel"));
        assert!(removed.contains(&"x265"));
        assert!(removed.iter().any(|r| r.starts_with("https://")));
    }
}
