//! Pipeline types.

use imgsearch_encoder::{ImageInput, Modality};
use imgsearch_store::SearchHit;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Raw content of an item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemPayload {
    Image(ImageInput),
    Text(String),
}

impl ItemPayload {
    pub fn modality(&self) -> Modality {
        match self {
            ItemPayload::Image(_) => Modality::Image,
            ItemPayload::Text(_) => Modality::Text,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            ItemPayload::Image(image) => image.bytes(),
            ItemPayload::Text(text) => text.as_bytes(),
        }
    }
}

/// A source item to be indexed. The id is fixed at ingestion time.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub payload: ItemPayload,
    pub label: Option<String>,
    pub metadata: serde_json::Value,
}

impl Item {
    pub fn image(id: i64, image: ImageInput) -> Self {
        Self {
            id,
            payload: ItemPayload::Image(image),
            label: None,
            metadata: serde_json::json!({}),
        }
    }

    pub fn text(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            payload: ItemPayload::Text(text.into()),
            label: None,
            metadata: serde_json::json!({}),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn modality(&self) -> Modality {
        self.payload.modality()
    }

    /// SHA-256 of the payload, hex encoded.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.payload.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Ingestion summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    pub items: usize,
    pub records: usize,
    /// First and last item id written
    pub id_range: Option<(i64, i64)>,
    pub duration_secs: f64,
}

/// Ranked query outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub collection: String,
    pub metric: String,
    pub k: i64,
    pub hits: Vec<SearchHit>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn item_ids(&self) -> Vec<i64> {
        self.hits.iter().map(|h| h.item_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        let a = Item::text(1, "a red bicycle");
        let b = Item::text(2, "a red bicycle");
        let c = Item::text(3, "a blue bicycle");

        assert_eq!(a.content_hash().len(), 64);
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn test_builders() {
        let item = Item::text(7, "caption")
            .with_label("captions/7.txt")
            .with_metadata(serde_json::json!({"page": 7}));
        assert_eq!(item.modality(), Modality::Text);
        assert_eq!(item.label.as_deref(), Some("captions/7.txt"));
        assert_eq!(item.metadata["page"], 7);
    }
}
