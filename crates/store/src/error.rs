//! Mapping of SQLite failures onto the storage error taxonomy.

use imgsearch_core::{AppError, StorageErrorKind};
use rusqlite::ffi;
use rusqlite::ErrorCode;

/// Convert a rusqlite error into `AppError::Storage` with a meaningful kind.
pub fn sql_error(err: rusqlite::Error) -> AppError {
    let kind = classify(&err);
    AppError::storage(kind, err.to_string())
}

fn classify(err: &rusqlite::Error) -> StorageErrorKind {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            let message = message.as_deref().unwrap_or_default();
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_CHECK
                || message.contains("dimension mismatch")
            {
                return StorageErrorKind::DimensionMismatch;
            }
            match failure.code {
                ErrorCode::ConstraintViolation => StorageErrorKind::Constraint,
                ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::PermissionDenied
                | ErrorCode::ReadOnly
                | ErrorCode::SystemIoFailure => StorageErrorKind::Connectivity,
                _ if message.contains("no such table") => StorageErrorKind::MissingCollection,
                _ => StorageErrorKind::Query,
            }
        }
        _ => StorageErrorKind::Query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_constraint_violation() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY); INSERT INTO t VALUES (1);")
            .unwrap();
        let err = conn.execute("INSERT INTO t VALUES (1)", []).unwrap_err();
        assert_eq!(
            sql_error(err).storage_kind(),
            Some(StorageErrorKind::Constraint)
        );
    }

    #[test]
    fn test_check_violation_is_dimension_mismatch() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v BLOB CHECK (length(v) = 8))")
            .unwrap();
        let err = conn
            .execute("INSERT INTO t VALUES (?1)", [vec![0u8; 4]])
            .unwrap_err();
        assert_eq!(
            sql_error(err).storage_kind(),
            Some(StorageErrorKind::DimensionMismatch)
        );
    }

    #[test]
    fn test_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn.prepare("SELECT * FROM nowhere").unwrap_err();
        assert_eq!(
            sql_error(err).storage_kind(),
            Some(StorageErrorKind::MissingCollection)
        );
    }
}
