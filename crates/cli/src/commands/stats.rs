//! Stats command handler.

use clap::Args;
use imgsearch_core::{config::AppConfig, AppResult};
use imgsearch_search::open_collection;

/// Show collection statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::debug!("Stats options: {:?}", self);
        let stats = open_collection(config)?.stats()?;

        if self.json {
            return super::print_json(&stats);
        }

        println!("Collection: {}", stats.name);
        println!("Database:   {}", config.database_path().display());
        println!("Dimension:  {}", stats.dimension);
        println!("Metric:     {}", stats.metric);
        println!("Records:    {}", stats.records);
        println!("Created:    {}", stats.created_at);
        Ok(())
    }
}
