//! Continuation cursor encoding.
//!
//! A cursor is the hex encoding of `<order>|<indexed_at>|<fingerprint>`.
//! Keyset positions stay valid while new records are inserted, which offsets
//! would not.

use chrono::{DateTime, SecondsFormat, Utc};

use super::{CatalogError, PageCursor, SortOrder};

/// Timestamp format used both in storage and in cursors. Fixed width, so the
/// string ordering matches the chronological ordering.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

impl PageCursor {
    pub fn encode(&self) -> String {
        let raw = format!(
            "{}|{}|{}",
            self.order.tag(),
            format_timestamp(&self.indexed_at),
            self.fingerprint
        );
        raw.bytes().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn decode(token: &str) -> Result<Self, CatalogError> {
        let invalid = || CatalogError::InvalidCursor(token.to_string());

        if token.is_empty() || token.len() % 2 != 0 {
            return Err(invalid());
        }

        let bytes = (0..token.len())
            .step_by(2)
            .map(|i| {
                token
                    .get(i..i + 2)
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            })
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(invalid)?;
        let raw = String::from_utf8(bytes).map_err(|_| invalid())?;

        let mut parts = raw.splitn(3, '|');
        let order = parts
            .next()
            .and_then(|tag| tag.chars().next())
            .and_then(SortOrder::from_tag)
            .ok_or_else(invalid)?;
        let indexed_at = parts.next().and_then(parse_timestamp).ok_or_else(invalid)?;
        let fingerprint = parts.next().filter(|fp| !fp.is_empty()).ok_or_else(invalid)?;

        Ok(PageCursor {
            order,
            indexed_at,
            fingerprint: fingerprint.to_string(),
        })
    }
}
