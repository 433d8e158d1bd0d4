//! Delete command handler.

use super::parse_filter;
use clap::Args;
use imgsearch_core::{config::AppConfig, AppError, AppResult};
use imgsearch_search::open_collection;

/// Delete records by item id and/or metadata filter
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Item identifiers to delete (repeatable)
    #[arg(long = "id")]
    pub ids: Vec<i64>,

    /// Metadata filter as JSON
    #[arg(long)]
    pub filter: Option<String>,

    /// Delete every record when no id or filter is given
    #[arg(long)]
    pub all: bool,
}

impl DeleteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let filter = parse_filter(self.filter.as_deref())?;
        if self.ids.is_empty() && filter.is_none() && !self.all {
            return Err(AppError::Input(
                "Refusing to delete everything without --all; pass --id or --filter".to_string(),
            ));
        }

        let mut collection = open_collection(config)?;
        let ids = (!self.ids.is_empty()).then_some(self.ids.as_slice());
        let removed = collection.delete(ids, filter.as_ref())?;

        println!("Deleted {} records from '{}'", removed, collection.name());
        Ok(())
    }
}
