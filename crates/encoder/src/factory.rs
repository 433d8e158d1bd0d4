//! Encoder factory.
//!
//! Resolves the configured provider name to an `Encoder` implementation.

use crate::encoder::Encoder;
use crate::providers::{HashEncoder, HttpEncoder};
use imgsearch_core::config::KNOWN_PROVIDERS;
use imgsearch_core::{AppError, AppResult, EncoderConfig};
use std::sync::Arc;

/// Create an encoder from configuration.
///
/// The `http` provider is verified with one check request, so a server that is
/// down or serving the wrong dimension fails here with
/// `AppError::ModelUnavailable` rather than halfway through an ingest.
pub async fn create_encoder(config: &EncoderConfig) -> AppResult<Arc<dyn Encoder>> {
    if config.dimensions == 0 {
        return Err(AppError::Config(
            "Encoder dimensions must be greater than zero".to_string(),
        ));
    }

    match config.provider.to_lowercase().as_str() {
        "hash" => Ok(Arc::new(HashEncoder::new(
            config.model.clone(),
            config.dimensions,
            config.normalize,
        ))),
        "http" => Ok(Arc::new(HttpEncoder::connect(config).await?)),
        other => Err(AppError::Config(format!(
            "Unknown encoder provider: '{}'. Supported providers: {}",
            other,
            KNOWN_PROVIDERS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_hash_encoder() {
        let config = EncoderConfig::default();
        let encoder = create_encoder(&config).await.unwrap();
        assert_eq!(encoder.provider_name(), "hash");
        assert_eq!(encoder.model_name(), "hash-v1");
        assert_eq!(encoder.dimensions(), 512);
    }

    #[tokio::test]
    async fn test_create_unknown_provider() {
        let config = EncoderConfig {
            provider: "onnx".to_string(),
            ..Default::default()
        };
        let err = create_encoder(&config).await.unwrap_err();
        assert!(err.to_string().contains("Unknown encoder provider"));
    }

    #[tokio::test]
    async fn test_zero_dimensions_rejected() {
        let config = EncoderConfig {
            dimensions: 0,
            ..Default::default()
        };
        assert!(matches!(
            create_encoder(&config).await,
            Err(AppError::Config(_))
        ));
    }
}
