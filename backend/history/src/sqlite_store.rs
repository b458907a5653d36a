/// SQLite-backed scan history.
///
/// Each row keeps the full record as JSON next to the columns used for
/// lookups, so result payloads round-trip exactly, unknown model keys included.
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use sanjeevani_core::{ScanError, ScanId, ScanRecord};

use crate::store::{DeleteOutcome, HistoryStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS scans (
         id            TEXT PRIMARY KEY,
         owner_id      TEXT,
         scan_type     TEXT NOT NULL,
         language_code TEXT NOT NULL,
         record_json   TEXT NOT NULL,
         created_at    INTEGER NOT NULL
     );
     CREATE INDEX IF NOT EXISTS idx_scans_owner ON scans(owner_id, created_at);";

pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

fn storage(err: rusqlite::Error) -> ScanError {
    ScanError::Storage(err.to_string())
}

impl SqliteHistoryStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).context("Failed to open SQLite history database")?;
        conn.execute_batch(&format!("PRAGMA journal_mode=WAL;\n{SCHEMA}"))
            .context("Failed to initialize scans schema")?;

        info!("History store opened at {:?}", path.as_ref());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// `:memory:` opens an in-memory store; anything else is a file path.
    pub fn from_location(location: &str) -> Result<Self> {
        if location == ":memory:" {
            Self::in_memory()
        } else {
            Self::open(location)
        }
    }
}

fn decode_rows(rows: Vec<String>) -> Vec<ScanRecord> {
    rows.into_iter()
        .filter_map(|json| match serde_json::from_str(&json) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable history row");
                None
            }
        })
        .collect()
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn create(&self, record: &ScanRecord) -> Result<(), ScanError> {
        let record_json = serde_json::to_string(record).map_err(|e| ScanError::Storage(e.to_string()))?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO scans (id, owner_id, scan_type, language_code, record_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                record.owner_id,
                record.scan_type.as_str(),
                record.language_code,
                record_json,
                record.created_at.timestamp_micros(),
            ],
        )
        .map_err(storage)?;
        debug!(scan_id = %record.id, "Scan persisted");
        Ok(())
    }

    async fn get_by_owner(&self, owner_id: &str, limit: usize) -> Result<Vec<ScanRecord>, ScanError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT record_json FROM scans WHERE owner_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )
            .map_err(storage)?;
        let rows = stmt
            .query_map(params![owner_id, limit as i64], |row| row.get::<_, String>(0))
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;
        Ok(decode_rows(rows))
    }

    async fn get_by_id(&self, id: ScanId) -> Result<Option<ScanRecord>, ScanError> {
        let conn = self.conn.lock().await;
        let row: Option<String> = conn
            .query_row(
                "SELECT record_json FROM scans WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?;
        Ok(decode_rows(row.into_iter().collect()).pop())
    }

    async fn delete_by_id(&self, id: ScanId) -> Result<DeleteOutcome, ScanError> {
        let conn = self.conn.lock().await;
        let rows = conn
            .execute("DELETE FROM scans WHERE id = ?1", params![id.to_string()])
            .map_err(storage)?;
        Ok(DeleteOutcome::from_rows(rows))
    }

    async fn delete_owned(&self, owner_id: &str, id: ScanId) -> Result<DeleteOutcome, ScanError> {
        let conn = self.conn.lock().await;
        let rows = conn
            .execute(
                "DELETE FROM scans WHERE id = ?1 AND owner_id = ?2",
                params![id.to_string(), owner_id],
            )
            .map_err(storage)?;
        Ok(DeleteOutcome::from_rows(rows))
    }

    async fn delete_by_owner(&self, owner_id: &str) -> Result<usize, ScanError> {
        let conn = self.conn.lock().await;
        let rows = conn
            .execute("DELETE FROM scans WHERE owner_id = ?1", params![owner_id])
            .map_err(storage)?;
        info!(owner_id, removed = rows, "Owner history cleared");
        Ok(rows)
    }
}
