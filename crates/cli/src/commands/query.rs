//! Query command handlers.

use super::{parse_filter, print_json};
use clap::Args;
use imgsearch_core::{config::AppConfig, AppError, AppResult};
use imgsearch_encoder::{create_encoder, ImageInput};
use imgsearch_search::{open_collection, query_image, query_text, similar_to_item, SearchResult};
use std::path::PathBuf;

/// Search with a text query
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Query text
    pub text: String,

    /// Number of results
    #[arg(short = 'k', long = "top-k", default_value_t = 5, allow_negative_numbers = true)]
    pub k: i64,

    /// Metadata filter as JSON, e.g. '{"page": {"$gt": 1}}'
    #[arg(long)]
    pub filter: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        ensure_positive_k(self.k)?;
        tracing::info!("Querying '{}' (k={})", config.storage.collection, self.k);
        let filter = parse_filter(self.filter.as_deref())?;
        let collection = open_collection(config)?;
        let encoder = create_encoder(&config.encoder).await?;

        let result = query_text(
            &collection,
            encoder.as_ref(),
            &self.text,
            self.k,
            filter.as_ref(),
        )
        .await?;
        print_result(&result, self.json)
    }
}

/// Search with an image query
#[derive(Args, Debug)]
pub struct QueryImageCommand {
    /// Query image file
    pub path: PathBuf,

    /// Number of results
    #[arg(short = 'k', long = "top-k", default_value_t = 5, allow_negative_numbers = true)]
    pub k: i64,

    /// Metadata filter as JSON
    #[arg(long)]
    pub filter: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryImageCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        ensure_positive_k(self.k)?;
        tracing::info!("Querying '{}' with {:?}", config.storage.collection, self.path);
        let filter = parse_filter(self.filter.as_deref())?;
        let image = ImageInput::new(std::fs::read(&self.path)?);
        let collection = open_collection(config)?;
        let encoder = create_encoder(&config.encoder).await?;

        let result = query_image(
            &collection,
            encoder.as_ref(),
            &image,
            self.k,
            filter.as_ref(),
        )
        .await?;
        print_result(&result, self.json)
    }
}

/// Find items similar to an indexed item
#[derive(Args, Debug)]
pub struct SimilarCommand {
    /// Item identifier
    pub item_id: i64,

    /// Number of results
    #[arg(short = 'k', long = "top-k", default_value_t = 5, allow_negative_numbers = true)]
    pub k: i64,

    /// Metadata filter as JSON
    #[arg(long)]
    pub filter: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SimilarCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        ensure_positive_k(self.k)?;
        tracing::info!("Finding items similar to {}", self.item_id);
        let filter = parse_filter(self.filter.as_deref())?;
        let collection = open_collection(config)?;

        let result = similar_to_item(&collection, self.item_id, self.k, filter.as_ref())?;
        print_result(&result, self.json)
    }
}

/// Reject a non-positive `k` before the collection, encoder or query file
/// is touched.
fn ensure_positive_k(k: i64) -> AppResult<()> {
    if k <= 0 {
        return Err(AppError::InvalidK(k));
    }
    Ok(())
}

fn print_result(result: &SearchResult, json: bool) -> AppResult<()> {
    if json {
        return print_json(result);
    }

    if result.is_empty() {
        println!("No matches in '{}'", result.collection);
        return Ok(());
    }

    println!("Top {} by {} distance:", result.hits.len(), result.metric);
    for (rank, hit) in result.hits.iter().enumerate() {
        println!(
            "{:>3}. item {:<6} {:.4}  {}",
            rank + 1,
            hit.item_id,
            hit.distance,
            hit.label.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A workspace with no collection and an unreachable model server.
    fn unusable_config(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.workspace = dir.path().to_path_buf();
        config.encoder.provider = "http".to_string();
        config.encoder.endpoint = "http://127.0.0.1:9".to_string();
        config
    }

    #[tokio::test]
    async fn test_non_positive_k_rejected_first() {
        let dir = TempDir::new().unwrap();
        let config = unusable_config(&dir);

        for k in [0, -3] {
            let err = QueryCommand {
                text: "a cat".to_string(),
                k,
                filter: Some("not json".to_string()),
                json: false,
            }
            .execute(&config)
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::InvalidK(n) if n == k), "{err}");

            let err = QueryImageCommand {
                path: dir.path().join("missing.png"),
                k,
                filter: None,
                json: false,
            }
            .execute(&config)
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::InvalidK(_)), "{err}");

            let err = SimilarCommand {
                item_id: 1,
                k,
                filter: None,
                json: false,
            }
            .execute(&config)
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::InvalidK(_)), "{err}");
        }

        assert!(!config.database_path().exists());
    }
}
