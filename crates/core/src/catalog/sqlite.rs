//! SQLite-backed media catalog implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode};

use super::cursor::{format_timestamp, parse_timestamp};
use super::{
    CatalogError, CatalogFilter, CatalogStats, CatalogStore, Category, FileRecord,
    InsertOutcome, MediaKind, Page, PageCursor, PageRequest, SortOrder, SourceRef,
};

const SELECT_COLUMNS: &str = "fingerprint, raw_name, title, display_title, category, season, \
     episode, quality, audio, size_bytes, media_kind, source_channel, source_message, \
     unparsable, indexed_at, last_seen_at";

/// How long a connection waits on a locked database before reporting busy.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed media catalog.
///
/// All access goes through one connection behind a mutex, which makes
/// `insert_if_absent` a linearizable check-and-set on the fingerprint key.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

/// Map a rusqlite error, classifying lock/IO conditions as transient.
pub(crate) fn map_sqlite_err(e: rusqlite::Error) -> CatalogError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(
                err.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::DiskFull
            ) =>
        {
            CatalogError::Unavailable(e.to_string())
        }
        _ => CatalogError::Database(e.to_string()),
    }
}

impl SqliteCatalog {
    /// Create a new SQLite catalog, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(map_sqlite_err)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
            .map_err(map_sqlite_err)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory SQLite catalog (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory().map_err(map_sqlite_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, CatalogError> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(map_sqlite_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS catalog_records (
                fingerprint TEXT PRIMARY KEY,
                raw_name TEXT NOT NULL,
                title TEXT NOT NULL,
                display_title TEXT NOT NULL,
                category TEXT NOT NULL,
                season INTEGER,
                episode INTEGER,
                quality TEXT,
                audio TEXT,
                size_bytes INTEGER NOT NULL,
                media_kind TEXT NOT NULL,
                source_channel INTEGER NOT NULL,
                source_message INTEGER NOT NULL,
                unparsable INTEGER NOT NULL DEFAULT 0,
                indexed_at TEXT NOT NULL,
                last_seen_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_catalog_indexed_at ON catalog_records(indexed_at, fingerprint);
            CREATE INDEX IF NOT EXISTS idx_catalog_category ON catalog_records(category);
            CREATE INDEX IF NOT EXISTS idx_catalog_title ON catalog_records(title);
            CREATE INDEX IF NOT EXISTS idx_catalog_source ON catalog_records(source_channel, source_message);
            "#,
        )
        .map_err(map_sqlite_err)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Unavailable("catalog connection lock poisoned".to_string()))
    }

    /// Build WHERE conditions for a filter. Returned conditions are ANDed.
    fn build_conditions(filter: &CatalogFilter) -> (Vec<&'static str>, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(category) = filter.category {
            conditions.push("category = ?");
            params.push(Box::new(category.as_str()));
        }
        if let Some(season) = filter.season {
            conditions.push("season = ?");
            params.push(Box::new(season));
        }
        if let Some(episode) = filter.episode {
            conditions.push("episode = ?");
            params.push(Box::new(episode));
        }
        if let Some(ref quality) = filter.quality {
            conditions.push("LOWER(quality) LIKE ? ESCAPE '\\'");
            params.push(Box::new(like_pattern(quality)));
        }
        if let Some(ref audio) = filter.audio {
            conditions.push("LOWER(audio) LIKE ? ESCAPE '\\'");
            params.push(Box::new(like_pattern(audio)));
        }
        if let Some(ref title) = filter.title {
            conditions.push("title LIKE ? ESCAPE '\\'");
            params.push(Box::new(like_pattern(title)));
        }

        (conditions, params)
    }

    fn where_clause(conditions: &[&str]) -> String {
        if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        }
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
        let category_str: String = row.get(4)?;
        let media_kind_str: String = row.get(10)?;
        let size_bytes: i64 = row.get(9)?;
        let unparsable: i64 = row.get(13)?;
        let indexed_at_str: String = row.get(14)?;
        let last_seen_str: String = row.get(15)?;

        let category = category_str.parse::<Category>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?;

        // Timestamps are always written by this module; fall back rather than fail the page.
        let indexed_at = parse_timestamp(&indexed_at_str).unwrap_or_else(Utc::now);
        let last_seen_at = parse_timestamp(&last_seen_str).unwrap_or(indexed_at);

        Ok(FileRecord {
            fingerprint: row.get(0)?,
            raw_name: row.get(1)?,
            title: row.get(2)?,
            display_title: row.get(3)?,
            category,
            season: row.get(5)?,
            episode: row.get(6)?,
            quality: row.get(7)?,
            audio: row.get(8)?,
            size_bytes: size_bytes.max(0) as u64,
            media_kind: MediaKind::parse(&media_kind_str),
            source: SourceRef::new(row.get(11)?, row.get(12)?),
            unparsable: unparsable != 0,
            indexed_at,
            last_seen_at,
        })
    }

    fn distinct_column(
        &self,
        column: &str,
        filter: &CatalogFilter,
    ) -> Result<Vec<u32>, CatalogError> {
        let conn = self.lock()?;
        let (conditions, params) = Self::build_conditions(filter);
        let not_null = format!("{} IS NOT NULL", column);
        let mut conditions: Vec<&str> = conditions;
        conditions.push(not_null.as_str());

        let sql = format!(
            "SELECT DISTINCT {col} FROM catalog_records {} ORDER BY {col} ASC",
            Self::where_clause(&conditions),
            col = column
        );

        let mut stmt = conn.prepare(&sql).map_err(map_sqlite_err)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| row.get::<_, u32>(0))
            .map_err(map_sqlite_err)?;

        let mut values = Vec::new();
        for row in rows {
            values.push(row.map_err(map_sqlite_err)?);
        }
        Ok(values)
    }
}

/// Build a LIKE pattern matching `value` as a literal substring.
fn like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for c in value.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl CatalogStore for SqliteCatalog {
    fn insert_if_absent(&self, record: &FileRecord) -> Result<InsertOutcome, CatalogError> {
        let conn = self.lock()?;

        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO catalog_records (fingerprint, raw_name, title, display_title, category, season, episode, quality, audio, size_bytes, media_kind, source_channel, source_message, unparsable, indexed_at, last_seen_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    record.fingerprint,
                    record.raw_name,
                    record.title,
                    record.display_title,
                    record.category.as_str(),
                    record.season,
                    record.episode,
                    record.quality,
                    record.audio,
                    record.size_bytes as i64,
                    record.media_kind.as_str(),
                    record.source.channel_id,
                    record.source.message_id,
                    record.unparsable as i64,
                    format_timestamp(&record.indexed_at),
                    format_timestamp(&record.last_seen_at),
                ],
            )
            .map_err(map_sqlite_err)?;

        if inserted == 1 {
            return Ok(InsertOutcome::Inserted);
        }

        conn.execute(
            "UPDATE catalog_records SET last_seen_at = ? WHERE fingerprint = ?",
            params![format_timestamp(&Utc::now()), record.fingerprint],
        )
        .map_err(map_sqlite_err)?;

        Ok(InsertOutcome::AlreadyExists)
    }

    fn get(&self, fingerprint: &str) -> Result<FileRecord, CatalogError> {
        let conn = self.lock()?;

        let sql = format!(
            "SELECT {} FROM catalog_records WHERE fingerprint = ?",
            SELECT_COLUMNS
        );
        match conn.query_row(&sql, params![fingerprint], Self::row_to_record) {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(CatalogError::NotFound(fingerprint.to_string()))
            }
            Err(e) => Err(map_sqlite_err(e)),
        }
    }

    fn get_by_prefix(&self, prefix: &str) -> Result<FileRecord, CatalogError> {
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CatalogError::NotFound(format!("prefix {}", prefix)));
        }

        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM catalog_records WHERE fingerprint LIKE ? ORDER BY fingerprint LIMIT 2",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).map_err(map_sqlite_err)?;
        let pattern = format!("{}%", prefix.to_ascii_lowercase());
        let mut matches = stmt
            .query_map(params![pattern], Self::row_to_record)
            .map_err(map_sqlite_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlite_err)?;

        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(CatalogError::NotFound(format!("prefix {}", prefix))),
            _ => Err(CatalogError::NotFound(format!("ambiguous prefix {}", prefix))),
        }
    }

    fn get_by_source(&self, source: &SourceRef) -> Result<FileRecord, CatalogError> {
        let conn = self.lock()?;

        let sql = format!(
            "SELECT {} FROM catalog_records WHERE source_channel = ? AND source_message = ? LIMIT 1",
            SELECT_COLUMNS
        );
        match conn.query_row(
            &sql,
            params![source.channel_id, source.message_id],
            Self::row_to_record,
        ) {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(CatalogError::NotFound(format!("source {}", source)))
            }
            Err(e) => Err(map_sqlite_err(e)),
        }
    }

    fn query(&self, filter: &CatalogFilter, page: &PageRequest) -> Result<Page, CatalogError> {
        if let Some(ref after) = page.after {
            if after.order != page.order {
                return Err(CatalogError::InvalidCursor(
                    "cursor was issued for a different sort order".to_string(),
                ));
            }
        }

        let conn = self.lock()?;
        let (mut conditions, mut params) = Self::build_conditions(filter);

        let (direction, keyset) = match page.order {
            SortOrder::NewestFirst => (
                "DESC",
                "(indexed_at < ? OR (indexed_at = ? AND fingerprint < ?))",
            ),
            SortOrder::OldestFirst => (
                "ASC",
                "(indexed_at > ? OR (indexed_at = ? AND fingerprint > ?))",
            ),
        };

        if let Some(ref after) = page.after {
            let ts = format_timestamp(&after.indexed_at);
            conditions.push(keyset);
            params.push(Box::new(ts.clone()));
            params.push(Box::new(ts));
            params.push(Box::new(after.fingerprint.clone()));
        }

        let sql = format!(
            "SELECT {} FROM catalog_records {} ORDER BY indexed_at {dir}, fingerprint {dir} LIMIT ?",
            SELECT_COLUMNS,
            Self::where_clause(&conditions),
            dir = direction
        );

        // One extra row tells us whether another page exists.
        params.push(Box::new(page.limit as i64 + 1));

        let mut stmt = conn.prepare(&sql).map_err(map_sqlite_err)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_record)
            .map_err(map_sqlite_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(map_sqlite_err)?);
        }

        let has_more = records.len() > page.limit as usize;
        records.truncate(page.limit as usize);

        let next_cursor = if has_more {
            records.last().map(|last| {
                PageCursor {
                    order: page.order,
                    indexed_at: last.indexed_at,
                    fingerprint: last.fingerprint.clone(),
                }
                .encode()
            })
        } else {
            None
        };

        Ok(Page {
            records,
            next_cursor,
            has_more,
        })
    }

    fn count(&self, filter: &CatalogFilter) -> Result<u64, CatalogError> {
        let conn = self.lock()?;
        let (conditions, params) = Self::build_conditions(filter);

        let sql = format!(
            "SELECT COUNT(*) FROM catalog_records {}",
            Self::where_clause(&conditions)
        );
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(map_sqlite_err)?;

        Ok(count.max(0) as u64)
    }

    fn distinct_seasons(&self, filter: &CatalogFilter) -> Result<Vec<u32>, CatalogError> {
        self.distinct_column("season", filter)
    }

    fn distinct_episodes(&self, filter: &CatalogFilter) -> Result<Vec<u32>, CatalogError> {
        self.distinct_column("episode", filter)
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let conn = self.lock()?;

        conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN category = 'movie' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN category = 'series' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN category = 'game' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(unparsable), 0),
                COALESCE(SUM(size_bytes), 0),
                MIN(indexed_at),
                MAX(indexed_at)
            FROM catalog_records
            "#,
            [],
            |row| {
                let oldest: Option<String> = row.get(6)?;
                let newest: Option<String> = row.get(7)?;
                Ok(CatalogStats {
                    total_records: row.get::<_, i64>(0)?.max(0) as u64,
                    movies: row.get::<_, i64>(1)?.max(0) as u64,
                    series: row.get::<_, i64>(2)?.max(0) as u64,
                    games: row.get::<_, i64>(3)?.max(0) as u64,
                    unparsable: row.get::<_, i64>(4)?.max(0) as u64,
                    total_size_bytes: row.get::<_, i64>(5)?.max(0) as u64,
                    oldest_entry: oldest.as_deref().and_then(parse_timestamp),
                    newest_entry: newest.as_deref().and_then(parse_timestamp),
                })
            },
        )
        .map_err(map_sqlite_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn record(fp: &str, title: &str, minutes: i64) -> FileRecord {
        let ts = base_time() + ChronoDuration::minutes(minutes);
        FileRecord {
            fingerprint: fp.to_string(),
            raw_name: format!("{}.1080p.mkv", title),
            title: title.to_lowercase(),
            display_title: title.to_string(),
            category: Category::Movie,
            season: None,
            episode: None,
            quality: Some("1080p".to_string()),
            audio: Some("AAC".to_string()),
            size_bytes: 1024 * 1024 * 700,
            media_kind: MediaKind::Video,
            source: SourceRef::new(-1001, minutes),
            unparsable: false,
            indexed_at: ts,
            last_seen_at: ts,
        }
    }

    fn episode(fp: &str, title: &str, season: u32, episode: u32, minutes: i64) -> FileRecord {
        let mut r = record(fp, title, minutes);
        r.category = Category::Series;
        r.season = Some(season);
        r.episode = Some(episode);
        r
    }

    #[test]
    fn test_insert_and_get() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        let r = record("fp1", "Inception", 0);

        assert_eq!(catalog.insert_if_absent(&r).unwrap(), InsertOutcome::Inserted);

        let stored = catalog.get("fp1").unwrap();
        assert_eq!(stored.title, "inception");
        assert_eq!(stored.display_title, "Inception");
        assert_eq!(stored.quality.as_deref(), Some("1080p"));
        assert_eq!(stored.media_kind, MediaKind::Video);
        assert_eq!(stored.indexed_at, r.indexed_at);
    }

    #[test]
    fn test_duplicate_insert_bumps_last_seen_only() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        let original = record("fp1", "Inception", 0);
        catalog.insert_if_absent(&original).unwrap();

        let mut again = record("fp1", "Different Caption", 30);
        again.raw_name = "other caption".to_string();
        assert_eq!(
            catalog.insert_if_absent(&again).unwrap(),
            InsertOutcome::AlreadyExists
        );

        let stored = catalog.get("fp1").unwrap();
        assert_eq!(stored.raw_name, original.raw_name);
        assert_eq!(stored.indexed_at, original.indexed_at);
        assert!(stored.last_seen_at > original.last_seen_at);
        assert_eq!(catalog.count(&CatalogFilter::new()).unwrap(), 1);
    }

    #[test]
    fn test_get_not_found() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        assert!(matches!(
            catalog.get("missing"),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn test_get_by_prefix() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        catalog.insert_if_absent(&record("abc123", "Inception", 0)).unwrap();
        catalog.insert_if_absent(&record("abd456", "Memento", 1)).unwrap();

        assert_eq!(catalog.get_by_prefix("abc").unwrap().fingerprint, "abc123");
        assert_eq!(catalog.get_by_prefix("ABD4").unwrap().fingerprint, "abd456");
        assert!(matches!(
            catalog.get_by_prefix("ab"),
            Err(CatalogError::NotFound(m)) if m.contains("ambiguous")
        ));
        assert!(matches!(
            catalog.get_by_prefix("ff"),
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            catalog.get_by_prefix("a%"),
            Err(CatalogError::NotFound(_))
        ));
        assert!(catalog.get_by_prefix("").is_err());
    }

    #[test]
    fn test_get_by_source() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        catalog.insert_if_absent(&record("fp1", "Inception", 7)).unwrap();

        let found = catalog.get_by_source(&SourceRef::new(-1001, 7)).unwrap();
        assert_eq!(found.fingerprint, "fp1");
        assert!(matches!(
            catalog.get_by_source(&SourceRef::new(-1001, 8)),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_inserts_single_winner() {
        let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let catalog = Arc::clone(&catalog);
                std::thread::spawn(move || {
                    let mut r = record("same-fp", "Inception", i);
                    r.raw_name = format!("caption variant {}", i);
                    catalog.insert_if_absent(&r).unwrap()
                })
            })
            .collect();

        let outcomes: Vec<InsertOutcome> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let inserted = outcomes
            .iter()
            .filter(|o| **o == InsertOutcome::Inserted)
            .count();

        assert_eq!(inserted, 1);
        assert_eq!(outcomes.len() - inserted, 15);
        assert_eq!(catalog.count(&CatalogFilter::new()).unwrap(), 1);
    }

    #[test]
    fn test_query_filters() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        catalog.insert_if_absent(&record("m1", "Inception", 0)).unwrap();
        catalog.insert_if_absent(&episode("s1", "Dark", 1, 1, 1)).unwrap();
        catalog.insert_if_absent(&episode("s2", "Dark", 1, 2, 2)).unwrap();
        catalog.insert_if_absent(&episode("s3", "Dark", 2, 1, 3)).unwrap();

        let series = CatalogFilter::new().with_category(Category::Series);
        assert_eq!(catalog.count(&series).unwrap(), 3);

        let season_one = series.clone().with_season(1);
        let page = catalog.query(&season_one, &PageRequest::first(10)).unwrap();
        assert_eq!(page.records.len(), 2);
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());

        let by_title = CatalogFilter::new().with_title("DAR");
        assert_eq!(catalog.count(&by_title).unwrap(), 3);

        let by_quality = CatalogFilter::new().with_quality("1080");
        assert_eq!(catalog.count(&by_quality).unwrap(), 4);

        let by_audio = CatalogFilter::new().with_audio("dts");
        assert_eq!(catalog.count(&by_audio).unwrap(), 0);
    }

    #[test]
    fn test_title_filter_escapes_wildcards() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        catalog.insert_if_absent(&record("m1", "abc", 0)).unwrap();

        assert_eq!(catalog.count(&CatalogFilter::new().with_title("%")).unwrap(), 0);
        assert_eq!(catalog.count(&CatalogFilter::new().with_title("_b_")).unwrap(), 0);
        assert_eq!(catalog.count(&CatalogFilter::new().with_title("b")).unwrap(), 1);
    }

    #[test]
    fn test_newest_first_ordering() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        for i in 0..5 {
            catalog
                .insert_if_absent(&record(&format!("fp{}", i), "Movie", i))
                .unwrap();
        }

        let page = catalog
            .query(&CatalogFilter::new(), &PageRequest::first(10))
            .unwrap();
        let order: Vec<_> = page.records.iter().map(|r| r.fingerprint.as_str()).collect();
        assert_eq!(order, vec!["fp4", "fp3", "fp2", "fp1", "fp0"]);

        let page = catalog
            .query(
                &CatalogFilter::new(),
                &PageRequest::first(10).with_order(SortOrder::OldestFirst),
            )
            .unwrap();
        assert_eq!(page.records[0].fingerprint, "fp0");
    }

    #[test]
    fn test_pagination_stable_under_concurrent_inserts() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        for i in 0..10 {
            catalog
                .insert_if_absent(&record(&format!("fp{:02}", i), "Movie", i))
                .unwrap();
        }

        let first = catalog
            .query(&CatalogFilter::new(), &PageRequest::first(4))
            .unwrap();
        assert!(first.has_more);
        let token = first.next_cursor.clone().unwrap();

        // New records land between the two page fetches.
        for i in 100..105 {
            catalog
                .insert_if_absent(&record(&format!("new{}", i), "Movie", i))
                .unwrap();
        }

        let mut seen: Vec<String> = first.records.iter().map(|r| r.fingerprint.clone()).collect();
        let mut cursor = Some(token);
        while let Some(token) = cursor {
            let after = PageCursor::decode(&token).unwrap();
            let page = catalog
                .query(&CatalogFilter::new(), &PageRequest::first(4).after(after))
                .unwrap();
            seen.extend(page.records.iter().map(|r| r.fingerprint.clone()));
            cursor = page.next_cursor;
        }

        let unique: HashSet<_> = seen.iter().cloned().collect();
        assert_eq!(unique.len(), seen.len(), "no record repeated across pages");
        let expected: HashSet<_> = (0..10).map(|i| format!("fp{:02}", i)).collect();
        assert_eq!(unique, expected, "no original record skipped");
    }

    #[test]
    fn test_same_timestamp_tiebreak_by_fingerprint() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        for fp in ["a", "b", "c", "d"] {
            catalog.insert_if_absent(&record(fp, "Movie", 0)).unwrap();
        }

        let first = catalog
            .query(&CatalogFilter::new(), &PageRequest::first(2))
            .unwrap();
        let after = PageCursor::decode(first.next_cursor.as_deref().unwrap()).unwrap();
        let second = catalog
            .query(&CatalogFilter::new(), &PageRequest::first(2).after(after))
            .unwrap();

        let all: Vec<_> = first
            .records
            .iter()
            .chain(second.records.iter())
            .map(|r| r.fingerprint.as_str())
            .collect();
        assert_eq!(all, vec!["d", "c", "b", "a"]);
        assert!(!second.has_more);
    }

    #[test]
    fn test_cursor_order_mismatch_rejected() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        let cursor = PageCursor {
            order: SortOrder::NewestFirst,
            indexed_at: base_time(),
            fingerprint: "fp".to_string(),
        };
        let request = PageRequest::first(5)
            .with_order(SortOrder::OldestFirst)
            .after(cursor);

        assert!(matches!(
            catalog.query(&CatalogFilter::new(), &request),
            Err(CatalogError::InvalidCursor(_))
        ));
    }

    #[test]
    fn test_distinct_seasons_and_episodes() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        catalog.insert_if_absent(&episode("a", "Dark", 2, 3, 0)).unwrap();
        catalog.insert_if_absent(&episode("b", "Dark", 1, 1, 1)).unwrap();
        catalog.insert_if_absent(&episode("c", "Dark", 1, 2, 2)).unwrap();
        catalog.insert_if_absent(&episode("d", "Other", 5, 9, 3)).unwrap();
        catalog.insert_if_absent(&record("m", "Dark Movie", 4)).unwrap();

        let dark = CatalogFilter::new().with_title("dark");
        assert_eq!(catalog.distinct_seasons(&dark).unwrap(), vec![1, 2]);
        assert_eq!(catalog.distinct_episodes(&dark).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            catalog.distinct_episodes(&dark.with_season(1)).unwrap(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_stats() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        let empty = catalog.stats().unwrap();
        assert_eq!(empty.total_records, 0);
        assert!(empty.oldest_entry.is_none());

        catalog.insert_if_absent(&record("m1", "Inception", 0)).unwrap();
        catalog.insert_if_absent(&episode("s1", "Dark", 1, 1, 5)).unwrap();
        let mut game = record("g1", "Portal", 10);
        game.category = Category::Game;
        game.unparsable = true;
        catalog.insert_if_absent(&game).unwrap();

        let stats = catalog.stats().unwrap();
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.movies, 1);
        assert_eq!(stats.series, 1);
        assert_eq!(stats.games, 1);
        assert_eq!(stats.unparsable, 1);
        assert_eq!(stats.total_size_bytes, 3 * 1024 * 1024 * 700);
        assert_eq!(stats.oldest_entry, Some(base_time()));
        assert_eq!(
            stats.newest_entry,
            Some(base_time() + ChronoDuration::minutes(10))
        );
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.db");

        {
            let catalog = SqliteCatalog::new(&path).unwrap();
            catalog.insert_if_absent(&record("fp1", "Inception", 0)).unwrap();
        }

        let reopened = SqliteCatalog::new(&path).unwrap();
        assert_eq!(reopened.get("fp1").unwrap().display_title, "Inception");
    }

    #[test]
    fn test_map_sqlite_err_classification() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(map_sqlite_err(busy).is_transient());

        let other = rusqlite::Error::QueryReturnedNoRows;
        assert!(!map_sqlite_err(other).is_transient());
    }
}
