//! Pipeline scenario tests and shared fixtures.


use crate::types::Item;
use imgsearch_encoder::providers::HashEncoder;
use imgsearch_encoder::ImageInput;
use imgsearch_store::{open_in_memory, Collection, CollectionSchema, DistanceMetric, SchemaMode};

pub(crate) const DIM: usize = 32;

/// Bytes carrying a PNG signature, distinct per seed.
pub(crate) fn png(seed: u8) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend((0..64u8).map(|i| i.wrapping_mul(seed).wrapping_add(seed)));
    bytes
}

pub(crate) fn encoder() -> HashEncoder {
    HashEncoder::new("hash-v1", DIM, true)
}

pub(crate) fn collection(metric: DistanceMetric) -> Collection {
    let schema = CollectionSchema::new("scenario", DIM, metric).unwrap();
    Collection::create(open_in_memory().unwrap(), schema, SchemaMode::Recreate).unwrap()
}

/// Five image items with ids 1..=5.
pub(crate) fn five_images() -> Vec<Item> {
    (1..=5)
        .map(|id| {
            Item::image(id, ImageInput::new(png(id as u8 * 3)))
                .with_label(format!("img{}.png", id))
                .with_metadata(serde_json::json!({"page": id, "even": id % 2 == 0}))
        })
        .collect()
}
