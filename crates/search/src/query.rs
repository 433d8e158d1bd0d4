//! Query pipeline: query → encoder → ranked hits.
//!
//! Every entry point rejects a non-positive `k` before any encoding or
//! storage access happens. Queries never write.

use crate::types::SearchResult;
use imgsearch_core::{AppError, AppResult};
use imgsearch_encoder::{Encoder, ImageInput};
use imgsearch_store::{Collection, Filter};
use tracing::{debug, instrument};

fn check_k(k: i64) -> AppResult<()> {
    if k <= 0 {
        return Err(AppError::InvalidK(k));
    }
    Ok(())
}

/// Rank stored records against a text query.
#[instrument(skip(collection, encoder, filter), fields(collection = %collection.name()))]
pub async fn query_text(
    collection: &Collection,
    encoder: &dyn Encoder,
    text: &str,
    k: i64,
    filter: Option<&Filter>,
) -> AppResult<SearchResult> {
    check_k(k)?;
    let embedding = encoder.encode_text(text).await?;
    query_vector(collection, &embedding, k, filter)
}

/// Rank stored records against an image query.
#[instrument(skip_all, fields(collection = %collection.name(), k = k))]
pub async fn query_image(
    collection: &Collection,
    encoder: &dyn Encoder,
    image: &ImageInput,
    k: i64,
    filter: Option<&Filter>,
) -> AppResult<SearchResult> {
    check_k(k)?;
    let embedding = encoder.encode_image(image).await?;
    query_vector(collection, &embedding, k, filter)
}

/// Rank stored records against an embedding the caller already holds.
pub fn query_vector(
    collection: &Collection,
    embedding: &[f32],
    k: i64,
    filter: Option<&Filter>,
) -> AppResult<SearchResult> {
    check_k(k)?;
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(AppError::Input(
            "Query embedding contains non-finite values".to_string(),
        ));
    }
    let hits = collection.query(embedding, k, filter)?;
    debug!("Query returned {} hits", hits.len());

    Ok(SearchResult {
        collection: collection.name().to_string(),
        metric: collection.metric().to_string(),
        k,
        hits,
    })
}

/// Records nearest to a stored item, excluding the item itself.
pub fn similar_to_item(
    collection: &Collection,
    item_id: i64,
    k: i64,
    filter: Option<&Filter>,
) -> AppResult<SearchResult> {
    check_k(k)?;
    let embedding = collection
        .embedding(item_id)?
        .ok_or_else(|| AppError::Input(format!("Item {} is not indexed", item_id)))?;

    let mut result = query_vector(collection, &embedding, k.saturating_add(1), filter)?;
    result.hits.retain(|h| h.item_id != item_id);
    result.hits.truncate(k as usize);
    result.k = k;
    Ok(result)
}
