//! Capture Record persistence
//!
//! Timestamps are stored as INTEGER milliseconds since the epoch. Captures of
//! one entity are totally ordered by `(created_at, id)`.

use crate::db;
use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use snapwatch_core::errors::{ExError, ExErrorKind};
use snapwatch_core::model::{BlobPointer, Capture, EntityKind, EntityRef, NewCapture};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CAPTURE_COLUMNS: &str =
    "id, recordable_type, recordable_id, bucket, path, version, created_at, compared_at";

/// Handle to the ledger database file
///
/// Hands out configured connections so each dispatch run can use its own.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    path: PathBuf,
    busy_timeout: Duration,
}

impl LedgerDb {
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a configured connection
    pub fn connect(&self) -> Result<Connection> {
        let conn = db::open(&self.path)?;
        db::configure(&conn, self.busy_timeout)?;
        Ok(conn)
    }

    /// Open a connection and apply pending migrations
    pub fn migrate(&self) -> Result<Connection> {
        let mut conn = self.connect()?;
        apply_migrations(&mut conn)?;
        Ok(conn)
    }
}

/// Insert a Capture Record and return the stored row
///
/// `created_at` defaults to now and is truncated to millisecond precision.
pub fn insert_capture(conn: &Connection, new: &NewCapture) -> Result<Capture> {
    let created_at_ms = new
        .created_at
        .unwrap_or_else(Utc::now)
        .timestamp_millis();

    conn.execute(
        "INSERT INTO captures (recordable_type, recordable_id, bucket, path, version, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.recordable.kind.as_str(),
            new.recordable.id,
            new.pointer.bucket,
            new.pointer.path,
            new.pointer.version,
            created_at_ms,
        ],
    )
    .map_err(from_rusqlite)?;

    Ok(Capture {
        id: conn.last_insert_rowid(),
        recordable: new.recordable.clone(),
        pointer: new.pointer.clone(),
        created_at: from_millis(created_at_ms)?,
        compared_at: None,
    })
}

/// Load a capture by id
pub fn fetch_capture(conn: &Connection, id: i64) -> Result<Option<Capture>> {
    let sql = format!("SELECT {} FROM captures WHERE id = ?1", CAPTURE_COLUMNS);
    let row = conn
        .query_row(&sql, [id], read_row)
        .optional()
        .map_err(from_rusqlite)?;
    row.map(into_capture).transpose()
}

/// Every capture of an entity, oldest first
pub fn list_captures(conn: &Connection, entity: &EntityRef) -> Result<Vec<Capture>> {
    query_captures(
        conn,
        &format!(
            "SELECT {} FROM captures
             WHERE recordable_type = ?1 AND recordable_id = ?2
             ORDER BY created_at ASC, id ASC",
            CAPTURE_COLUMNS
        ),
        entity,
    )
}

/// Captures of an entity not yet folded into a comparison, oldest first
pub fn unprocessed_captures(conn: &Connection, entity: &EntityRef) -> Result<Vec<Capture>> {
    query_captures(
        conn,
        &format!(
            "SELECT {} FROM captures
             WHERE recordable_type = ?1 AND recordable_id = ?2 AND compared_at IS NULL
             ORDER BY created_at ASC, id ASC",
            CAPTURE_COLUMNS
        ),
        entity,
    )
}

/// The newest capture of an entity that has already been compared
pub fn last_compared_capture(conn: &Connection, entity: &EntityRef) -> Result<Option<Capture>> {
    let sql = format!(
        "SELECT {} FROM captures
         WHERE recordable_type = ?1 AND recordable_id = ?2 AND compared_at IS NOT NULL
         ORDER BY created_at DESC, id DESC
         LIMIT 1",
        CAPTURE_COLUMNS
    );
    let row = conn
        .query_row(
            &sql,
            params![entity.kind.as_str(), entity.id],
            read_row,
        )
        .optional()
        .map_err(from_rusqlite)?;
    row.map(into_capture).transpose()
}

/// Mark every unprocessed capture of `newest`'s entity up to and including
/// `newest` as compared at `now`
///
/// This single conditional UPDATE is the commit point for a batch: rows
/// already claimed by another run are excluded by `compared_at IS NULL`.
/// Returns the number of rows claimed.
pub fn claim_captures(conn: &Connection, newest: &Capture, now: DateTime<Utc>) -> Result<usize> {
    let created_at_ms = newest.created_at.timestamp_millis();
    conn.execute(
        "UPDATE captures SET compared_at = ?1
         WHERE recordable_type = ?2 AND recordable_id = ?3
           AND compared_at IS NULL
           AND (created_at < ?4 OR (created_at = ?4 AND id <= ?5))",
        params![
            now.timestamp_millis(),
            newest.recordable.kind.as_str(),
            newest.recordable.id,
            created_at_ms,
            newest.id,
        ],
    )
    .map_err(from_rusqlite)
}

/// Entities holding unprocessed captures, with the id of their newest one
pub fn entities_with_unprocessed(conn: &Connection) -> Result<Vec<(EntityRef, i64)>> {
    let mut stmt = conn
        .prepare(
            "SELECT recordable_type, recordable_id, MAX(id) FROM captures
             WHERE compared_at IS NULL
             GROUP BY recordable_type, recordable_id
             ORDER BY recordable_type, recordable_id",
        )
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    Ok(rows
        .into_iter()
        .map(|(kind, id, capture_id)| (EntityRef::new(EntityKind::parse(&kind), id), capture_id))
        .collect())
}

/// A raw row from the `captures` table
struct CaptureRow {
    id: i64,
    recordable_type: String,
    recordable_id: i64,
    bucket: Option<String>,
    path: Option<String>,
    version: Option<String>,
    created_at: i64,
    compared_at: Option<i64>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<CaptureRow> {
    Ok(CaptureRow {
        id: row.get(0)?,
        recordable_type: row.get(1)?,
        recordable_id: row.get(2)?,
        bucket: row.get(3)?,
        path: row.get(4)?,
        version: row.get(5)?,
        created_at: row.get(6)?,
        compared_at: row.get(7)?,
    })
}

fn into_capture(row: CaptureRow) -> Result<Capture> {
    Ok(Capture {
        id: row.id,
        recordable: EntityRef::new(EntityKind::parse(&row.recordable_type), row.recordable_id),
        pointer: BlobPointer {
            bucket: row.bucket,
            path: row.path,
            version: row.version,
        },
        created_at: from_millis(row.created_at)?,
        compared_at: row.compared_at.map(from_millis).transpose()?,
    })
}

fn query_captures(conn: &Connection, sql: &str, entity: &EntityRef) -> Result<Vec<Capture>> {
    let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
    let rows = stmt
        .query_map(params![entity.kind.as_str(), entity.id], read_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    rows.into_iter().map(into_capture).collect()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
        ExError::new(ExErrorKind::Persistence)
            .with_op("read_capture")
            .with_message(format!("timestamp out of range: {}", ms))
    })
}
