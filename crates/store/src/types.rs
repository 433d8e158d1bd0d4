//! Storage record types.

use serde::{Deserialize, Serialize};

/// A record to insert: the source item plus its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    /// Identifier of the source item, assigned at ingestion
    pub item_id: i64,
    /// Display label (file path, caption)
    pub label: Option<String>,
    /// "image" or "text"
    pub modality: String,
    /// Hex digest of the item payload
    pub content_hash: Option<String>,
    /// Free-form JSON object used by filters
    pub metadata: serde_json::Value,
    pub embedding: Vec<f32>,
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Embedding record primary key
    pub record_id: i64,
    pub item_id: i64,
    pub distance: f64,
    pub label: Option<String>,
    pub metadata: serde_json::Value,
}

/// Summary of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    pub records: u64,
    pub created_at: String,
}
