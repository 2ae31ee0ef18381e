//! SQLite-backed log of channel messages received by the service.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::{IncomingMessage, MediaAttachment, MessageSource, RawMessage, TransportError};
use crate::catalog::{MediaKind, SourceRef};

/// Channel messages appended in arrival order. Each channel gets its own
/// position sequence starting at 0; re-delivered message ids are ignored.
pub struct SqliteMessageLog {
    conn: Mutex<Connection>,
}

fn map_err(e: rusqlite::Error) -> TransportError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            TransportError::Unavailable(e.to_string())
        }
        _ => TransportError::Storage(e.to_string()),
    }
}

impl SqliteMessageLog {
    pub fn new(path: &Path) -> Result<Self, TransportError> {
        let conn = Connection::open(path).map_err(map_err)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self, TransportError> {
        let conn = Connection::open_in_memory().map_err(map_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, TransportError> {
        conn.busy_timeout(Duration::from_secs(5)).map_err(map_err)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS channel_messages (
                channel_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                message_id INTEGER NOT NULL,
                file_name TEXT,
                caption TEXT,
                media_kind TEXT,
                size_bytes INTEGER,
                file_unique_id TEXT,
                received_at TEXT NOT NULL,
                PRIMARY KEY (channel_id, position),
                UNIQUE (channel_id, message_id)
            );
            "#,
        )
        .map_err(map_err)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, TransportError> {
        self.conn
            .lock()
            .map_err(|_| TransportError::Unavailable("message log lock poisoned".to_string()))
    }

    /// Append a message. Returns the stored message, or `None` when the
    /// message id was already logged for this channel.
    pub fn append(
        &self,
        channel_id: i64,
        message: &IncomingMessage,
    ) -> Result<Option<RawMessage>, TransportError> {
        let conn = self.lock()?;

        let position: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM channel_messages WHERE channel_id = ?",
                params![channel_id],
                |row| row.get(0),
            )
            .map_err(map_err)?;

        let media = message.media.as_ref();
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO channel_messages (channel_id, position, message_id, file_name, caption, media_kind, size_bytes, file_unique_id, received_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    channel_id,
                    position,
                    message.message_id,
                    message.file_name,
                    message.caption,
                    media.map(|m| m.kind.as_str()),
                    media.map(|m| m.size_bytes as i64),
                    media.map(|m| m.file_unique_id.as_str()),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(map_err)?;

        if inserted == 0 {
            return Ok(None);
        }

        Ok(Some(RawMessage {
            position,
            source: SourceRef::new(channel_id, message.message_id),
            file_name: message.file_name.clone(),
            caption: message.caption.clone(),
            media: message.media.clone(),
        }))
    }

    /// The logged message with this id, if any.
    pub fn get(&self, channel_id: i64, message_id: i64) -> Result<Option<RawMessage>, TransportError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT channel_id, position, message_id, file_name, caption, media_kind, size_bytes, file_unique_id FROM channel_messages WHERE channel_id = ? AND message_id = ?",
            params![channel_id, message_id],
            Self::row_to_message,
        )
        .optional()
        .map_err(map_err)
    }

    /// Highest position logged for a channel.
    pub fn last_position(&self, channel_id: i64) -> Result<Option<i64>, TransportError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT MAX(position) FROM channel_messages WHERE channel_id = ?",
            params![channel_id],
            |row| row.get::<_, Option<i64>>(0),
        )
        .optional()
        .map(Option::flatten)
        .map_err(map_err)
    }

    fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<RawMessage> {
        let channel_id: i64 = row.get(0)?;
        let media_kind: Option<String> = row.get(5)?;
        let size_bytes: Option<i64> = row.get(6)?;
        let file_unique_id: Option<String> = row.get(7)?;

        let media = match (media_kind, file_unique_id) {
            (Some(kind), Some(file_unique_id)) => Some(MediaAttachment {
                kind: MediaKind::parse(&kind),
                size_bytes: size_bytes.unwrap_or(0).max(0) as u64,
                file_unique_id,
            }),
            _ => None,
        };

        Ok(RawMessage {
            position: row.get(1)?,
            source: SourceRef::new(channel_id, row.get(2)?),
            file_name: row.get(3)?,
            caption: row.get(4)?,
            media,
        })
    }
}

#[async_trait]
impl MessageSource for SqliteMessageLog {
    async fn read(
        &self,
        channel_id: i64,
        from: i64,
        limit: u32,
    ) -> Result<Vec<RawMessage>, TransportError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT channel_id, position, message_id, file_name, caption, media_kind, size_bytes, file_unique_id FROM channel_messages WHERE channel_id = ? AND position >= ? ORDER BY position ASC LIMIT ?",
            )
            .map_err(map_err)?;

        let rows = stmt
            .query_map(params![channel_id, from, limit as i64], Self::row_to_message)
            .map_err(map_err)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row.map_err(map_err)?);
        }
        Ok(messages)
    }
}
