//! Init command handler.

use clap::Args;
use imgsearch_core::{config::AppConfig, AppResult};
use imgsearch_store::SchemaMode;

/// Create the collection, replacing any existing one
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Keep an existing collection with the same dimension and metric
    #[arg(long)]
    pub keep_existing: bool,
}

impl InitCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let mode = if self.keep_existing {
            SchemaMode::CreateIfMissing
        } else {
            SchemaMode::Recreate
        };
        tracing::info!(
            "Initializing collection '{}' ({:?})",
            config.storage.collection,
            mode
        );

        let collection = imgsearch_search::init_collection(config, mode)?;
        let stats = collection.stats()?;

        println!(
            "Collection '{}' ready: {} dimensions, {} distance, {} records ({})",
            stats.name,
            stats.dimension,
            stats.metric,
            stats.records,
            config.database_path().display()
        );
        Ok(())
    }
}
