//! Deterministic offline encoder based on feature hashing.

use crate::encoder::{ensure_non_empty, normalize, Encoder};
use crate::types::{ImageInput, Modality};
use imgsearch_core::AppResult;
use std::collections::{HashMap, HashSet};

const STOP_WORDS: [&str; 32] = [
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Feature-hashing encoder for tests and local development.
///
/// Text is hashed by word and character trigram, images by byte trigram of
/// the encoded payload. The output is stable across runs and platforms but
/// carries no visual semantics: a text query only lands near an image whose
/// bytes share its features.
#[derive(Debug)]
pub struct HashEncoder {
    model: String,
    dimensions: usize,
    normalize: bool,
}

impl HashEncoder {
    pub fn new(model: impl Into<String>, dimensions: usize, normalize: bool) -> Self {
        Self {
            model: model.into(),
            dimensions,
            normalize,
        }
    }

    fn bucket(&self, hash: u64) -> usize {
        (hash % self.dimensions as u64) as usize
    }

    fn text_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];
        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

        let lower = text.to_lowercase();
        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split_whitespace()
            .filter(|w| !stop_words.contains(w) && w.len() > 2)
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let idx = self.bucket(fold_hash(trigram.bytes(), 37));
                embedding[idx] += (*freq as f32).sqrt();
            }

            let idx = self.bucket(fold_hash(word.bytes(), 31));
            embedding[idx] += *freq as f32;
        }

        if self.normalize {
            normalize(&mut embedding);
        }
        embedding
    }

    fn image_embedding(&self, image: &ImageInput) -> AppResult<Vec<f32>> {
        image.format()?;

        let mut embedding = vec![0.0; self.dimensions];
        for window in image.bytes().windows(3) {
            let idx = self.bucket(fold_hash(window.iter().copied(), 37));
            embedding[idx] += 1.0;
        }

        if self.normalize {
            normalize(&mut embedding);
        }
        Ok(embedding)
    }
}

fn fold_hash(bytes: impl Iterator<Item = u8>, multiplier: u64) -> u64 {
    bytes.fold(0u64, |acc, b| {
        acc.wrapping_mul(multiplier).wrapping_add(b as u64)
    })
}

#[async_trait::async_trait]
impl Encoder for HashEncoder {
    fn provider_name(&self) -> &str {
        "hash"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn encode_images(&self, images: &[ImageInput]) -> AppResult<Vec<Vec<f32>>> {
        ensure_non_empty(images.len(), Modality::Image)?;
        images
            .iter()
            .map(|image| self.image_embedding(image))
            .collect()
    }

    async fn encode_texts(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        ensure_non_empty(texts.len(), Modality::Text)?;
        Ok(texts.iter().map(|text| self.text_embedding(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::png_bytes;
    use imgsearch_core::AppError;

    fn encoder() -> HashEncoder {
        HashEncoder::new("hash-v1", 512, true)
    }

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_text_batch_dimensions() {
        let texts = vec![
            "a photo of a cat".to_string(),
            "sunset over the mountains".to_string(),
            "red bicycle".to_string(),
        ];
        let embeddings = encoder().encode_texts(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 3);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 512);
            assert!((norm(embedding) - 1.0).abs() < 0.001);
        }
    }

    #[tokio::test]
    async fn test_image_batch_dimensions() {
        let images: Vec<ImageInput> = (1..=4).map(|s| ImageInput::new(png_bytes(s))).collect();
        let embeddings = encoder().encode_images(&images).await.unwrap();

        assert_eq!(embeddings.len(), 4);
        assert!(embeddings.iter().all(|e| e.len() == 512));
        assert_ne!(embeddings[0], embeddings[1]);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let a = encoder().encode_text("deterministic test").await.unwrap();
        let b = encoder().encode_text("deterministic test").await.unwrap();
        assert_eq!(a, b);

        let image = ImageInput::new(png_bytes(7));
        let c = encoder().encode_image(&image).await.unwrap();
        let d = encoder().encode_image(&image).await.unwrap();
        assert_eq!(c, d);
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let embedding = encoder().encode_text("").await.unwrap();
        assert_eq!(embedding.len(), 512);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_corrupt_image_fails_batch() {
        let images = vec![
            ImageInput::new(png_bytes(1)),
            ImageInput::new(b"definitely not a png".to_vec()),
        ];
        let err = encoder().encode_images(&images).await.unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let err = encoder().encode_texts(&[]).await.unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
        let err = encoder().encode_images(&[]).await.unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
    }

    #[tokio::test]
    async fn test_unnormalized_output() {
        let raw = HashEncoder::new("hash-v1", 64, false);
        let embedding = raw.encode_text("zebra zebra zebra").await.unwrap();
        assert!(norm(&embedding) > 1.0);
    }
}
