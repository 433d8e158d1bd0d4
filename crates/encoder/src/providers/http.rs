//! HTTP encoder for an external inference server.
//!
//! The server hosts a pretrained vision-language model (CLIP or similar) and
//! exposes one batch endpoint:
//!
//! ```text
//! POST {endpoint}/embed
//! {"model": "clip-vit-b-32", "modality": "image", "inputs": ["<base64>", ...]}
//!
//! 200 {"embeddings": [[0.01, ...], ...]}
//! ```
//!
//! Text inputs are sent verbatim, images base64-encoded. Requests are not
//! retried; the caller decides what to do with a failure.

use crate::encoder::{check_embeddings, ensure_non_empty, normalize, Encoder};
use crate::types::{ImageInput, Modality};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use imgsearch_core::{AppError, AppResult, EncoderConfig};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const EMBED_PATH: &str = "/embed";

/// Encoder backed by a remote model server.
#[derive(Debug, Clone)]
pub struct HttpEncoder {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    normalize: bool,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    modality: Modality,
    inputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl HttpEncoder {
    /// Build the client without contacting the server.
    pub fn new(config: &EncoderConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::ModelUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            normalize: config.normalize,
        })
    }

    /// Build the client and verify the model answers with the expected
    /// dimension.
    pub async fn connect(config: &EncoderConfig) -> AppResult<Self> {
        let encoder = Self::new(config)?;
        encoder.verify().await?;
        Ok(encoder)
    }

    #[instrument(skip(self), fields(model = %self.model))]
    async fn verify(&self) -> AppResult<()> {
        debug!("Verifying model server at {}", self.base_url);
        match self.encode_text("connection check").await {
            Ok(_) => {
                debug!("Model '{}' ready", self.model);
                Ok(())
            }
            Err(AppError::Encoding(msg)) => Err(AppError::ModelUnavailable(format!(
                "Model '{}' at {} is misconfigured: {}",
                self.model, self.base_url, msg
            ))),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, inputs), fields(batch_size = inputs.len(), modality = %modality))]
    async fn request(&self, modality: Modality, inputs: Vec<String>) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}{}", self.base_url, EMBED_PATH);
        let expected = inputs.len();
        let body = EmbedRequest {
            model: &self.model,
            modality,
            inputs,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::ModelUnavailable(format!("Model server unreachable at {}: {}", url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|r| r.error)
                .unwrap_or(text);
            return Err(classify_status(status, &detail));
        }

        let mut parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Encoding(format!("Malformed model response: {}", e)))?;

        check_embeddings(&parsed.embeddings, expected, self.dimensions)?;

        if self.normalize {
            parsed.embeddings.iter_mut().for_each(|e| normalize(e));
        }

        debug!("Received {} embeddings", parsed.embeddings.len());
        Ok(parsed.embeddings)
    }
}

/// Map a non-success status onto the error taxonomy.
fn classify_status(status: StatusCode, detail: &str) -> AppError {
    match status {
        StatusCode::NOT_FOUND | StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
            AppError::ModelUnavailable(format!("Model server returned {}: {}", status, detail))
        }
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::PAYLOAD_TOO_LARGE => {
            AppError::Input(format!("Model rejected input ({}): {}", status, detail))
        }
        _ => AppError::Encoding(format!("Model server returned {}: {}", status, detail)),
    }
}

#[async_trait::async_trait]
impl Encoder for HttpEncoder {
    fn provider_name(&self) -> &str {
        "http"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn encode_images(&self, images: &[ImageInput]) -> AppResult<Vec<Vec<f32>>> {
        ensure_non_empty(images.len(), Modality::Image)?;

        let mut inputs = Vec::with_capacity(images.len());
        for image in images {
            image.format()?;
            inputs.push(STANDARD.encode(image.bytes()));
        }

        self.request(Modality::Image, inputs).await
    }

    async fn encode_texts(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        ensure_non_empty(texts.len(), Modality::Text)?;
        self.request(Modality::Text, texts.to_vec()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> EncoderConfig {
        EncoderConfig {
            provider: "http".to_string(),
            model: "clip-vit-b-32".to_string(),
            // Port 9 (discard) is closed on test machines.
            endpoint: "http://127.0.0.1:9/".to_string(),
            timeout_secs: 2,
            ..Default::default()
        }
    }

    /// Serve `body` with `status` to every request on a local port.
    async fn canned_server(status: u16, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                    let text = String::from_utf8_lossy(&request).to_ascii_lowercase();
                    if let Some(end) = text.find("\r\n\r\n") {
                        let length = text
                            .lines()
                            .find_map(|l| l.strip_prefix("content-length:"))
                            .and_then(|v| v.trim().parse::<usize>().ok())
                            .unwrap_or(0);
                        if request.len() >= end + 4 + length {
                            break;
                        }
                    }
                }
                let response = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    fn served_config(endpoint: String, dimensions: usize, normalize: bool) -> EncoderConfig {
        EncoderConfig {
            provider: "http".to_string(),
            model: "clip-vit-b-32".to_string(),
            endpoint,
            dimensions,
            normalize,
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_embeddings_parsed_and_normalized() {
        let endpoint = canned_server(200, r#"{"embeddings": [[3.0, 4.0], [0.0, 2.0]]}"#).await;

        let encoder = HttpEncoder::new(&served_config(endpoint.clone(), 2, true)).unwrap();
        let vectors = encoder
            .encode_texts(&["a cat".to_string(), "a dog".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![0.6, 0.8], vec![0.0, 1.0]]);

        let raw = HttpEncoder::new(&served_config(endpoint, 2, false)).unwrap();
        let vectors = raw
            .encode_texts(&["a cat".to_string(), "a dog".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![3.0, 4.0], vec![0.0, 2.0]]);
    }

    #[tokio::test]
    async fn test_embedding_count_mismatch_is_encoding_error() {
        let endpoint = canned_server(200, r#"{"embeddings": [[1.0, 0.0]]}"#).await;
        let encoder = HttpEncoder::new(&served_config(endpoint, 2, true)).unwrap();

        let err = encoder
            .encode_texts(&["one".to_string(), "two".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Encoding(_)), "{err}");
    }

    #[tokio::test]
    async fn test_malformed_response_is_encoding_error() {
        let endpoint = canned_server(200, r#"{"vectors": []}"#).await;
        let encoder = HttpEncoder::new(&served_config(endpoint, 2, true)).unwrap();

        let err = encoder.encode_text("a cat").await.unwrap_err();
        assert!(matches!(err, AppError::Encoding(_)), "{err}");
    }

    #[tokio::test]
    async fn test_error_status_carries_server_detail() {
        let endpoint = canned_server(404, r#"{"error": "model not loaded"}"#).await;
        let encoder = HttpEncoder::new(&served_config(endpoint, 2, true)).unwrap();

        let err = encoder.encode_text("a cat").await.unwrap_err();
        match err {
            AppError::ModelUnavailable(msg) => assert!(msg.contains("model not loaded"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_connect_reports_dimension_mismatch_as_unavailable() {
        let endpoint = canned_server(200, r#"{"embeddings": [[1.0, 0.0, 0.0]]}"#).await;

        let err = HttpEncoder::connect(&served_config(endpoint.clone(), 2, true))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ModelUnavailable(_)), "{err}");

        assert!(HttpEncoder::connect(&served_config(endpoint, 3, true)).await.is_ok());
    }

    #[test]
    fn test_new_trims_endpoint() {
        let encoder = HttpEncoder::new(&unreachable_config()).unwrap();
        assert_eq!(encoder.base_url, "http://127.0.0.1:9");
        assert_eq!(encoder.provider_name(), "http");
        assert_eq!(encoder.model_name(), "clip-vit-b-32");
        assert_eq!(encoder.dimensions(), 512);
    }

    #[test]
    fn test_request_body_shape() {
        let body = EmbedRequest {
            model: "clip",
            modality: Modality::Image,
            inputs: vec![STANDARD.encode([1u8, 2, 3])],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["modality"], "image");
        assert_eq!(json["inputs"][0], "AQID");
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "no such model"),
            AppError::ModelUnavailable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, "cannot decode"),
            AppError::Input(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, "oom"),
            AppError::Encoding(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_model_unavailable() {
        let err = HttpEncoder::connect(&unreachable_config()).await.unwrap_err();
        assert!(matches!(err, AppError::ModelUnavailable(_)), "{err}");
    }

    #[tokio::test]
    async fn test_corrupt_image_rejected_before_request() {
        let encoder = HttpEncoder::new(&unreachable_config()).unwrap();
        let err = encoder
            .encode_images(&[ImageInput::new(b"nope".to_vec())])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
    }
}
