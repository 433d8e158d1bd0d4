//! Ingestion pipeline: items → encoder → one atomic write.

use crate::types::{IngestStats, Item, ItemPayload};
use imgsearch_core::{AppError, AppResult, StorageErrorKind};
use imgsearch_encoder::{Encoder, ImageInput};
use imgsearch_store::{Collection, NewRecord};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Encode `items` and store them as one batch.
///
/// Payloads are grouped by modality and encoded in chunks of `batch_size`,
/// but the write is a single transaction: either every record lands or none
/// does. Any encoder failure aborts before storage is touched.
#[instrument(skip_all, fields(collection = %collection.name(), items = items.len()))]
pub async fn ingest(
    collection: &mut Collection,
    encoder: &dyn Encoder,
    items: &[Item],
    batch_size: usize,
) -> AppResult<IngestStats> {
    let start = Instant::now();

    if items.is_empty() {
        return Err(AppError::Input("Nothing to ingest".to_string()));
    }
    if encoder.dimensions() != collection.dimension() {
        return Err(AppError::storage(
            StorageErrorKind::DimensionMismatch,
            format!(
                "Encoder '{}' produces {}-dimensional embeddings, collection '{}' stores {}",
                encoder.model_name(),
                encoder.dimensions(),
                collection.name(),
                collection.dimension()
            ),
        ));
    }

    let embeddings = encode_items(encoder, items, batch_size.max(1)).await?;

    let records: Vec<NewRecord> = items
        .iter()
        .zip(embeddings)
        .map(|(item, embedding)| NewRecord {
            item_id: item.id,
            label: item.label.clone(),
            modality: item.modality().as_str().to_string(),
            content_hash: Some(item.content_hash()),
            metadata: item.metadata.clone(),
            embedding,
        })
        .collect();

    let record_ids = collection.insert_batch(&records)?;

    let stats = IngestStats {
        items: items.len(),
        records: record_ids.len(),
        id_range: items
            .iter()
            .map(|i| i.id)
            .min()
            .zip(items.iter().map(|i| i.id).max()),
        duration_secs: start.elapsed().as_secs_f64(),
    };

    info!(
        "Ingested {} items into '{}' in {:.2}s",
        stats.records,
        collection.name(),
        stats.duration_secs
    );
    Ok(stats)
}

/// One embedding per item, in item order.
async fn encode_items(
    encoder: &dyn Encoder,
    items: &[Item],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    let mut image_slots = Vec::new();
    let mut images: Vec<ImageInput> = Vec::new();
    let mut text_slots = Vec::new();
    let mut texts: Vec<String> = Vec::new();

    for (slot, item) in items.iter().enumerate() {
        match &item.payload {
            ItemPayload::Image(image) => {
                image_slots.push(slot);
                images.push(image.clone());
            }
            ItemPayload::Text(text) => {
                text_slots.push(slot);
                texts.push(text.clone());
            }
        }
    }

    let mut embeddings: Vec<Option<Vec<f32>>> = vec![None; items.len()];

    for (chunk_slots, chunk) in image_slots.chunks(batch_size).zip(images.chunks(batch_size)) {
        debug!("Encoding {} images", chunk.len());
        let vectors = encoder.encode_images(chunk).await?;
        place(&mut embeddings, chunk_slots, vectors)?;
    }

    for (chunk_slots, chunk) in text_slots.chunks(batch_size).zip(texts.chunks(batch_size)) {
        debug!("Encoding {} texts", chunk.len());
        let vectors = encoder.encode_texts(chunk).await?;
        place(&mut embeddings, chunk_slots, vectors)?;
    }

    embeddings
        .into_iter()
        .enumerate()
        .map(|(slot, e)| {
            e.ok_or_else(|| AppError::Encoding(format!("No embedding produced for item {}", slot)))
        })
        .collect()
}

fn place(
    embeddings: &mut [Option<Vec<f32>>],
    slots: &[usize],
    vectors: Vec<Vec<f32>>,
) -> AppResult<()> {
    if vectors.len() != slots.len() {
        return Err(AppError::Encoding(format!(
            "Encoder returned {} embeddings for {} inputs",
            vectors.len(),
            slots.len()
        )));
    }
    for (slot, vector) in slots.iter().zip(vectors) {
        embeddings[*slot] = Some(vector);
    }
    Ok(())
}
