//! Controlled vocabularies for quality and audio tags.
//!
//! Matching is ASCII case-insensitive and token-bounded: the characters on
//! either side of a hit must not be ASCII alphanumeric.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// (lowercase needle, canonical spelling)
const QUALITY_VOCABULARY: &[(&str, &str)] = &[
    ("2160p", "2160p"),
    ("4k", "4K"),
    ("1440p", "1440p"),
    ("1080p", "1080p"),
    ("720p", "720p"),
    ("576p", "576p"),
    ("480p", "480p"),
    ("360p", "360p"),
    ("bluray", "BluRay"),
    ("blu-ray", "BluRay"),
    ("bdrip", "BDRip"),
    ("brrip", "BRRip"),
    ("web-dl", "WEB-DL"),
    ("webdl", "WEB-DL"),
    ("webrip", "WEBRip"),
    ("web-rip", "WEBRip"),
    ("hdrip", "HDRip"),
    ("dvdrip", "DVDRip"),
    ("dvdscr", "DVDScr"),
    ("hdtv", "HDTV"),
    ("hdcam", "HDCAM"),
    ("hdts", "HDTS"),
    ("camrip", "CAMRip"),
    ("cam", "CAM"),
    ("predvd", "PreDVD"),
];

const AUDIO_VOCABULARY: &[(&str, &str)] = &[
    ("ddp5.1", "DDP5.1"),
    ("ddp2.0", "DDP2.0"),
    ("ddp", "DDP"),
    ("dd5.1", "DD5.1"),
    ("dd2.0", "DD2.0"),
    ("dd+", "DD+"),
    ("e-ac3", "EAC3"),
    ("eac3", "EAC3"),
    ("ac3", "AC3"),
    ("aac5.1", "AAC5.1"),
    ("aac2.0", "AAC2.0"),
    ("aac", "AAC"),
    ("dts-hd", "DTS-HD"),
    ("dts", "DTS"),
    ("truehd", "TrueHD"),
    ("atmos", "Atmos"),
    ("flac", "FLAC"),
    ("opus", "OPUS"),
    ("mp3", "MP3"),
    ("7.1", "7.1"),
    ("5.1", "5.1"),
    ("2.0", "2.0"),
];

static QUALITY_FALLBACK: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{3,4}[pi])\b").ok());

/// A vocabulary hit in the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagMatch {
    pub value: String,
    pub span: Range<usize>,
}

/// Quality tag: earliest hit by position wins, longer needle on a tie.
/// Falls back to the first `NNNp`/`NNNi` token, lowercased.
pub(crate) fn find_quality(text: &str) -> Option<TagMatch> {
    let lower = text.to_ascii_lowercase();

    let best = scan(&lower, QUALITY_VOCABULARY)
        .into_iter()
        .min_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then(b.span.len().cmp(&a.span.len()))
        });
    if best.is_some() {
        return best;
    }

    let re = QUALITY_FALLBACK.as_ref()?;
    let m = re.captures(text)?.get(1)?;
    Some(TagMatch {
        value: m.as_str().to_lowercase(),
        span: m.range(),
    })
}

/// Spans of every quality vocabulary hit, not just the reported one.
pub(crate) fn quality_spans(text: &str) -> Vec<Range<usize>> {
    scan(&text.to_ascii_lowercase(), QUALITY_VOCABULARY)
        .into_iter()
        .map(|hit| hit.span)
        .collect()
}

/// Audio tags in order of first appearance, deduplicated.
/// Overlapping hits keep the longest.
pub(crate) fn find_audio(text: &str) -> Vec<TagMatch> {
    let lower = text.to_ascii_lowercase();

    let mut hits = scan(&lower, AUDIO_VOCABULARY);
    hits.sort_by(|a, b| {
        b.span
            .len()
            .cmp(&a.span.len())
            .then(a.span.start.cmp(&b.span.start))
    });

    let mut kept: Vec<TagMatch> = Vec::new();
    for hit in hits {
        let overlaps = kept
            .iter()
            .any(|k| hit.span.start < k.span.end && k.span.start < hit.span.end);
        if !overlaps {
            kept.push(hit);
        }
    }
    kept.sort_by_key(|k| k.span.start);
    kept
}

fn scan(lower: &str, vocabulary: &[(&str, &str)]) -> Vec<TagMatch> {
    let bytes = lower.as_bytes();
    let mut hits = Vec::new();

    for (needle, canonical) in vocabulary {
        for (start, _) in lower.match_indices(needle) {
            let end = start + needle.len();
            if is_token_boundary(bytes, start, end) {
                hits.push(TagMatch {
                    value: (*canonical).to_string(),
                    span: start..end,
                });
            }
        }
    }

    hits
}

fn is_token_boundary(bytes: &[u8], start: usize, end: usize) -> bool {
    let before = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
    let after = end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
    before && after
}
