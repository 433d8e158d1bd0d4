//! Ingest command handlers.

use clap::Args;
use imgsearch_core::{config::AppConfig, AppResult};
use imgsearch_encoder::create_encoder;
use imgsearch_search::{ingest, load_images, open_collection, text_items, IngestStats, Item};
use imgsearch_store::Collection;
use std::path::PathBuf;

/// Index image files and directories
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Image files or directories to walk
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Identifier of the first item; later items are numbered sequentially.
    /// Defaults to one past the largest id already stored
    #[arg(long)]
    pub start_id: Option<i64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Ingesting images from {} paths", self.paths.len());
        let mut collection = open_collection(config)?;
        let start_id = resolve_start_id(&collection, self.start_id)?;
        let items = load_images(&self.paths, start_id)?;
        run(config, &mut collection, &items, self.json).await
    }
}

/// Index text documents
#[derive(Args, Debug)]
pub struct IngestTextCommand {
    /// Texts to index, one item each
    #[arg(required = true)]
    pub texts: Vec<String>,

    /// Identifier of the first item (default: next free id)
    #[arg(long)]
    pub start_id: Option<i64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestTextCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Ingesting {} texts", self.texts.len());
        let mut collection = open_collection(config)?;
        let start_id = resolve_start_id(&collection, self.start_id)?;
        let items = text_items(&self.texts, start_id);
        run(config, &mut collection, &items, self.json).await
    }
}

fn resolve_start_id(collection: &Collection, start_id: Option<i64>) -> AppResult<i64> {
    match start_id {
        Some(id) => Ok(id),
        None => {
            let id = collection.next_item_id()?;
            tracing::debug!("Numbering new items from {}", id);
            Ok(id)
        }
    }
}

async fn run(
    config: &AppConfig,
    collection: &mut Collection,
    items: &[Item],
    json: bool,
) -> AppResult<()> {
    let encoder = create_encoder(&config.encoder).await?;

    let stats = ingest(
        collection,
        encoder.as_ref(),
        items,
        config.encoder.batch_size,
    )
    .await?;

    report(collection.name(), &stats, json)
}

fn report(collection: &str, stats: &IngestStats, json: bool) -> AppResult<()> {
    if json {
        return super::print_json(&serde_json::json!({
            "collection": collection,
            "items": stats.items,
            "records": stats.records,
            "idRange": stats.id_range,
            "durationSecs": stats.duration_secs,
        }));
    }

    match stats.id_range {
        Some((first, last)) => println!(
            "Ingested {} items (ids {}..={}) into '{}' in {:.2}s",
            stats.records, first, last, collection, stats.duration_secs
        ),
        None => println!("Nothing ingested into '{}'", collection),
    }
    Ok(())
}
