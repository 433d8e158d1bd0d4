//! Image search pipelines.
//!
//! Ties an [`Encoder`](imgsearch_encoder::Encoder) to a
//! [`Collection`](imgsearch_store::Collection): ingestion writes
//! `(item, embedding)` pairs in one transaction, queries encode with the same
//! encoder and rank stored embeddings by the collection's distance metric.

pub mod discovery;
pub mod ingest;
pub mod query;
pub mod setup;
pub mod types;

#[cfg(test)]
mod tests;

pub use discovery::{find_images, load_images, text_items};
pub use ingest::ingest;
pub use query::{query_image, query_text, query_vector, similar_to_item};
pub use setup::{init_collection, open_collection, schema_for};
pub use types::{IngestStats, Item, ItemPayload, SearchResult};
