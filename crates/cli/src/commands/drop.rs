//! Drop command handler.

use clap::Args;
use imgsearch_core::{config::AppConfig, AppResult};
use imgsearch_search::open_collection;

/// Drop the collection and all its records
#[derive(Args, Debug)]
pub struct DropCommand {}

impl DropCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let collection = open_collection(config)?;
        let name = collection.name().to_string();
        collection.drop_collection()?;

        println!("Collection '{}' dropped", name);
        Ok(())
    }
}
