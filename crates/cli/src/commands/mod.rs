//! Command handlers for the imgsearch CLI.

pub mod delete;
pub mod drop;
pub mod ingest;
pub mod init;
pub mod query;
pub mod stats;

pub use delete::DeleteCommand;
pub use drop::DropCommand;
pub use ingest::{IngestCommand, IngestTextCommand};
pub use init::InitCommand;
pub use query::{QueryCommand, QueryImageCommand, SimilarCommand};
pub use stats::StatsCommand;

use imgsearch_core::AppResult;
use imgsearch_store::Filter;

/// Parse an optional `--filter` argument.
pub(crate) fn parse_filter(filter: Option<&str>) -> AppResult<Option<Filter>> {
    filter.map(Filter::from_json_str).transpose()
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgsearch_core::AppError;

    #[test]
    fn test_parse_filter() {
        assert!(parse_filter(None).unwrap().is_none());
        assert!(parse_filter(Some(r#"{"page": {"$gt": 1}}"#)).unwrap().is_some());
        assert!(matches!(
            parse_filter(Some(r#"{"page": {"$regex": "x"}}"#)),
            Err(AppError::InvalidFilter(_))
        ));
    }
}
