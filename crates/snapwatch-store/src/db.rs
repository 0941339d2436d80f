//! Database connection management
//!
//! Provides utilities for opening and managing SQLite connections

use crate::errors::{from_rusqlite, Result};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection for concurrent dispatch workers
///
/// Enables foreign keys and WAL, and makes writers wait up to `busy_timeout`
/// for the database lock instead of failing immediately.
pub fn configure(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.busy_timeout(busy_timeout).map_err(from_rusqlite)?;

    // journal_mode returns a row, so go through execute_batch
    conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
        .map_err(from_rusqlite)?;

    Ok(())
}

/// Run `f` inside a `BEGIN IMMEDIATE` transaction
///
/// The write lock is taken up front, so two connections running this at the
/// same time are serialised rather than both reading and then one failing on
/// upgrade. Commits if `f` succeeds, rolls back otherwise.
pub fn with_immediate_tx<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction<'_>) -> Result<T>,
{
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;
    let value = f(&tx)?;
    tx.commit().map_err(from_rusqlite)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_configure_file_database() {
        let dir = TempDir::new().unwrap();
        let conn = open(dir.path().join("ledger.db")).unwrap();
        configure(&conn, Duration::from_millis(500)).unwrap();

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_failed_closure_rolls_back() {
        let mut conn = open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();

        let result: Result<()> = with_immediate_tx(&mut conn, |tx| {
            tx.execute("INSERT INTO t (v) VALUES (1)", [])
                .map_err(from_rusqlite)?;
            Err(snapwatch_core::errors::ExError::new(
                snapwatch_core::errors::ExErrorKind::Internal,
            ))
        });
        assert!(result.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
