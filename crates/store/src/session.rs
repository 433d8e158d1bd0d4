//! Scoped storage sessions.

use crate::error::sql_error;
use imgsearch_core::AppResult;
use rusqlite::{Connection, Transaction};

/// Run `f` inside a transaction.
///
/// The transaction commits when `f` returns `Ok`. On `Err` (or a panic) the
/// transaction is dropped uncommitted, which rolls it back.
pub fn with_session<T, F>(conn: &mut Connection, f: F) -> AppResult<T>
where
    F: FnOnce(&Transaction<'_>) -> AppResult<T>,
{
    let tx = conn.transaction().map_err(sql_error)?;
    let value = f(&tx)?;
    tx.commit().map_err(sql_error)?;
    Ok(value)
}
