//! Error handling for snapwatch-store
//!
//! Wraps snapwatch-core ExError with store-specific helpers

use snapwatch_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error for an already-applied migration
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, expected, actual
        ))
}

/// Create a missing blob error
pub fn blob_missing(bucket: &str, key: &str, version: &str) -> ExError {
    ExError::new(ExErrorKind::MissingBlob)
        .with_op("blob_get")
        .with_message(format!(
            "no blob for bucket '{}', key '{}', version '{}'",
            bucket, key, version
        ))
}

/// Create an error for a key that would escape the store root
pub fn invalid_key(key: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("blob_key")
        .with_message(format!("invalid blob key '{}'", key))
}

/// Create a database error from rusqlite::Error
///
/// `SQLITE_BUSY` and `SQLITE_LOCKED` map to `Concurrency` so job queues retry
/// them; everything else is `Persistence`.
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let kind = match err.sqlite_error_code() {
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
            ExErrorKind::Concurrency
        }
        _ => ExErrorKind::Persistence,
    };
    ExError::new(kind)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
