//! Encoder capability trait.

use crate::types::{ImageInput, Modality};
use imgsearch_core::{AppError, AppResult};

/// A pretrained vision-language model mapping images and text into one
/// embedding space.
///
/// Implementations return exactly one vector per input, in input order, each
/// `dimensions()` long. An empty batch is an input error.
#[async_trait::async_trait]
pub trait Encoder: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g., "hash", "http")
    fn provider_name(&self) -> &str;

    /// Model identifier
    fn model_name(&self) -> &str;

    /// Embedding dimensions
    fn dimensions(&self) -> usize;

    /// Encode a batch of images.
    async fn encode_images(&self, images: &[ImageInput]) -> AppResult<Vec<Vec<f32>>>;

    /// Encode a batch of texts.
    async fn encode_texts(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Encode a single text query.
    async fn encode_text(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.encode_texts(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Encoding("No embedding returned".to_string()))
    }

    /// Encode a single image query.
    async fn encode_image(&self, image: &ImageInput) -> AppResult<Vec<f32>> {
        let mut results = self.encode_images(std::slice::from_ref(image)).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Encoding("No embedding returned".to_string()))
    }
}

/// Reject empty batches before any work is done.
pub fn ensure_non_empty(len: usize, modality: Modality) -> AppResult<()> {
    if len == 0 {
        return Err(AppError::Input(format!(
            "Cannot encode an empty {} batch",
            modality
        )));
    }
    Ok(())
}

/// Check a model response against the request: one finite vector of the
/// right length per input.
pub fn check_embeddings(
    embeddings: &[Vec<f32>],
    expected_count: usize,
    dimensions: usize,
) -> AppResult<()> {
    if embeddings.len() != expected_count {
        return Err(AppError::Encoding(format!(
            "Model returned {} embeddings for {} inputs",
            embeddings.len(),
            expected_count
        )));
    }

    for (i, embedding) in embeddings.iter().enumerate() {
        if embedding.len() != dimensions {
            return Err(AppError::Encoding(format!(
                "Embedding {} has {} dimensions, expected {}",
                i,
                embedding.len(),
                dimensions
            )));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(AppError::Encoding(format!(
                "Embedding {} contains non-finite values",
                i
            )));
        }
    }

    Ok(())
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub fn normalize(embedding: &mut [f32]) {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in embedding.iter_mut() {
            *v /= norm;
        }
    }
}
