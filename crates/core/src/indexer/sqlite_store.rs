//! SQLite-backed job store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::{IndexJob, JobCounters, JobError, JobFilter, JobStatus, JobStore};
use crate::catalog::{format_timestamp, parse_timestamp};

const SELECT_COLUMNS: &str = "id, source, status, skip_count, end_position, cursor, scanned, \
     inserted, duplicates, unparsable, non_media, errors, error, created_at, started_at, \
     updated_at, finished_at";

/// SQLite-backed job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

fn map_err(e: rusqlite::Error) -> JobError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::SystemIoFailure
            ) =>
        {
            JobError::Unavailable(e.to_string())
        }
        _ => JobError::Database(e.to_string()),
    }
}

impl SqliteJobStore {
    /// Create a new SQLite job store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, JobError> {
        let conn = Connection::open(path).map_err(map_err)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory SQLite job store (useful for testing).
    pub fn in_memory() -> Result<Self, JobError> {
        let conn = Connection::open_in_memory().map_err(map_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, JobError> {
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(map_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS index_jobs (
                id TEXT PRIMARY KEY,
                source INTEGER NOT NULL,
                status TEXT NOT NULL,
                skip_count INTEGER NOT NULL DEFAULT 0,
                end_position INTEGER,
                cursor INTEGER NOT NULL DEFAULT 0,
                scanned INTEGER NOT NULL DEFAULT 0,
                inserted INTEGER NOT NULL DEFAULT 0,
                duplicates INTEGER NOT NULL DEFAULT 0,
                unparsable INTEGER NOT NULL DEFAULT 0,
                non_media INTEGER NOT NULL DEFAULT 0,
                errors INTEGER NOT NULL DEFAULT 0,
                error TEXT,
                created_at TEXT NOT NULL,
                started_at TEXT,
                updated_at TEXT NOT NULL,
                finished_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_index_jobs_source ON index_jobs(source);
            CREATE INDEX IF NOT EXISTS idx_index_jobs_status ON index_jobs(status);
            "#,
        )
        .map_err(map_err)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, JobError> {
        self.conn
            .lock()
            .map_err(|_| JobError::Unavailable("job store lock poisoned".to_string()))
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<IndexJob> {
        let status_str: String = row.get(2)?;
        let created_at: String = row.get(13)?;
        let started_at: Option<String> = row.get(14)?;
        let updated_at: String = row.get(15)?;
        let finished_at: Option<String> = row.get(16)?;

        Ok(IndexJob {
            id: row.get(0)?,
            source: row.get(1)?,
            status: status_str.parse().unwrap_or(JobStatus::Failed),
            skip_count: row.get::<_, i64>(3)?.max(0) as u64,
            end_position: row.get(4)?,
            cursor: row.get(5)?,
            counters: JobCounters {
                scanned: row.get::<_, i64>(6)? as u64,
                inserted: row.get::<_, i64>(7)? as u64,
                duplicates: row.get::<_, i64>(8)? as u64,
                unparsable: row.get::<_, i64>(9)? as u64,
                non_media: row.get::<_, i64>(10)? as u64,
                errors: row.get::<_, i64>(11)? as u64,
            },
            error: row.get(12)?,
            created_at: parse_timestamp(&created_at).unwrap_or_else(Utc::now),
            started_at: started_at.as_deref().and_then(parse_timestamp),
            updated_at: parse_timestamp(&updated_at).unwrap_or_else(Utc::now),
            finished_at: finished_at.as_deref().and_then(parse_timestamp),
        })
    }
}

impl JobStore for SqliteJobStore {
    fn insert(&self, job: &IndexJob) -> Result<(), JobError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO index_jobs (id, source, status, skip_count, end_position, cursor, \
             scanned, inserted, duplicates, unparsable, non_media, errors, error, created_at, \
             started_at, updated_at, finished_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                job.id,
                job.source,
                job.status.as_str(),
                job.skip_count as i64,
                job.end_position,
                job.cursor,
                job.counters.scanned as i64,
                job.counters.inserted as i64,
                job.counters.duplicates as i64,
                job.counters.unparsable as i64,
                job.counters.non_media as i64,
                job.counters.errors as i64,
                job.error,
                format_timestamp(&job.created_at),
                job.started_at.as_ref().map(format_timestamp),
                format_timestamp(&job.updated_at),
                job.finished_at.as_ref().map(format_timestamp),
            ],
        )
        .map_err(map_err)?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<IndexJob, JobError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM index_jobs WHERE id = ?1", SELECT_COLUMNS),
            params![id],
            Self::row_to_job,
        )
        .optional()
        .map_err(map_err)?
        .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    fn save(&self, job: &IndexJob) -> Result<(), JobError> {
        let conn = self.lock()?;
        let updated = conn
            .execute(
                "UPDATE index_jobs SET status = ?2, skip_count = ?3, end_position = ?4, \
                 cursor = ?5, scanned = ?6, inserted = ?7, duplicates = ?8, unparsable = ?9, \
                 non_media = ?10, errors = ?11, error = ?12, started_at = ?13, updated_at = ?14, \
                 finished_at = ?15 WHERE id = ?1",
                params![
                    job.id,
                    job.status.as_str(),
                    job.skip_count as i64,
                    job.end_position,
                    job.cursor,
                    job.counters.scanned as i64,
                    job.counters.inserted as i64,
                    job.counters.duplicates as i64,
                    job.counters.unparsable as i64,
                    job.counters.non_media as i64,
                    job.counters.errors as i64,
                    job.error,
                    job.started_at.as_ref().map(format_timestamp),
                    format_timestamp(&job.updated_at),
                    job.finished_at.as_ref().map(format_timestamp),
                ],
            )
            .map_err(map_err)?;

        if updated == 0 {
            return Err(JobError::NotFound(job.id.clone()));
        }
        Ok(())
    }

    fn list(&self, filter: &JobFilter) -> Result<Vec<IndexJob>, JobError> {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(source) = filter.source {
            conditions.push("source = ?");
            params.push(Box::new(source));
        }
        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        params.push(Box::new(filter.limit.max(0)));

        let sql = format!(
            "SELECT {} FROM index_jobs {} ORDER BY created_at DESC, id DESC LIMIT ?",
            SELECT_COLUMNS, where_clause
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).map_err(map_err)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let jobs = stmt
            .query_map(param_refs.as_slice(), Self::row_to_job)
            .map_err(map_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_err)?;
        Ok(jobs)
    }
}
