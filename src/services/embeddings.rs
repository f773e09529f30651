//! Embedding oracle: text and images into one vector space
//!
//! Text and image embeddings share a single multimodal model so cross-modal
//! similarity is meaningful. The remote implementation talks to the Voyage
//! AI multimodal API; the hashed implementation is an offline stand-in with
//! the same contract, used when no API key is available and by tests.

use crate::config::EmbeddingConfig;
use crate::error::{ClickshopError, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Maximum retry attempts for rate limiting
const MAX_RETRIES: usize = 3;

/// Backoff base duration in milliseconds
const BACKOFF_BASE_MS: u64 = 1000;

/// Request timeout duration
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Embedding oracle trait: map text or image bytes to a fixed-dimension
/// unit-normalized vector.
#[async_trait]
pub trait EmbeddingOracle: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_image(&self, image: &[u8]) -> Result<Vec<f32>>;

    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Remote multimodal embedding oracle (Voyage AI)
pub struct RemoteEmbeddingOracle {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct MultimodalRequest {
    inputs: Vec<MultimodalInput>,
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct MultimodalInput {
    content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageBase64 { image_base64: String },
}

#[derive(Debug, Deserialize)]
struct MultimodalResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl RemoteEmbeddingOracle {
    pub fn new(api_key: String, config: &EmbeddingConfig) -> Result<Self> {
        if api_key.is_empty() {
            return Err(ClickshopError::EmbeddingFailure(
                "API key cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            dimensions: config.dimension,
        })
    }

    async fn call_api_with_retry(&self, input: MultimodalInput) -> Result<Vec<f32>> {
        let mut retries = 0;

        loop {
            match self.call_api(&input).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) => {
                    let retryable = matches!(&e, ClickshopError::EmbeddingFailure(msg)
                        if msg.contains("rate limit") || msg.contains("timeout"));
                    if retries >= MAX_RETRIES || !retryable {
                        return Err(e);
                    }

                    let backoff_ms = BACKOFF_BASE_MS * 2_u64.pow(retries as u32);
                    warn!(
                        "Embedding API call failed, retrying after {}ms (attempt {}/{})",
                        backoff_ms,
                        retries + 1,
                        MAX_RETRIES
                    );
                    sleep(Duration::from_millis(backoff_ms)).await;
                    retries += 1;
                }
            }
        }
    }

    async fn call_api(&self, input: &MultimodalInput) -> Result<Vec<f32>> {
        debug!("Calling embedding API, model: {}", self.model);

        let request = MultimodalRequest {
            inputs: vec![input.clone()],
            model: self.model.clone(),
            input_type: Some("query".to_string()),
        };

        let response = self
            .client
            .post(format!("{}/multimodalembeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ClickshopError::EmbeddingFailure(format!("timeout or connect: {}", e))
                } else {
                    ClickshopError::Http(e)
                }
            })?;

        match response.status() {
            StatusCode::OK => {
                let body: MultimodalResponse = response
                    .json()
                    .await
                    .map_err(|e| ClickshopError::EmbeddingFailure(e.to_string()))?;

                let embedding = body
                    .data
                    .into_iter()
                    .next()
                    .map(|d| d.embedding)
                    .ok_or_else(|| {
                        ClickshopError::EmbeddingFailure("empty response".to_string())
                    })?;

                self.validate_embedding(&embedding)?;
                Ok(normalize(embedding))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
                ClickshopError::EmbeddingFailure("invalid or missing API key".to_string()),
            ),
            StatusCode::TOO_MANY_REQUESTS => Err(ClickshopError::EmbeddingFailure(
                "rate limit exceeded".to_string(),
            )),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(ClickshopError::EmbeddingFailure(format!(
                    "API error (status {}): {}",
                    status, text
                )))
            }
        }
    }

    fn validate_embedding(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimensions {
            return Err(ClickshopError::EmbeddingFailure(format!(
                "expected {} dimensions, got {}",
                self.dimensions,
                embedding.len()
            )));
        }

        if embedding.iter().any(|&x| !x.is_finite()) {
            return Err(ClickshopError::EmbeddingFailure(
                "embedding contains NaN or Inf".to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl EmbeddingOracle for RemoteEmbeddingOracle {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(ClickshopError::EmbeddingFailure(
                "text cannot be empty".to_string(),
            ));
        }

        self.call_api_with_retry(MultimodalInput {
            content: vec![ContentPart::Text {
                text: text.to_string(),
            }],
        })
        .await
    }

    async fn embed_image(&self, image: &[u8]) -> Result<Vec<f32>> {
        if image.is_empty() {
            return Err(ClickshopError::EmbeddingFailure(
                "image cannot be empty".to_string(),
            ));
        }

        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        self.call_api_with_retry(MultimodalInput {
            content: vec![ContentPart::ImageBase64 {
                image_base64: format!("data:image/jpeg;base64,{}", encoded),
            }],
        })
        .await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Offline embedding oracle over character n-gram and word hashing
///
/// Deterministic: the same input always maps to the same unit vector, and
/// inputs sharing words land near each other. Image bytes hash the same
/// way, so the contract (one vector space, fixed dimension) holds.
pub struct HashedEmbeddingOracle {
    dimensions: usize,
}

impl HashedEmbeddingOracle {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_tokens<'a>(&self, tokens: impl Iterator<Item = &'a str>) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimensions];

        for token in tokens {
            let token = token.to_lowercase();

            // Word-level hashing, weighted above n-grams
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let dim = (hasher.finish() as usize) % self.dimensions;
            embedding[dim] += 2.0;

            // Character trigram hashing
            let chars: Vec<char> = token.chars().collect();
            for window in chars.windows(3) {
                let mut hasher = DefaultHasher::new();
                window.iter().collect::<String>().hash(&mut hasher);
                let dim = (hasher.finish() as usize) % self.dimensions;
                embedding[dim] += 1.0;
            }
        }

        normalize(embedding)
    }
}

#[async_trait]
impl EmbeddingOracle for HashedEmbeddingOracle {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_tokens(text.split_whitespace()))
    }

    async fn embed_image(&self, image: &[u8]) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0_f32; self.dimensions];
        for chunk in image.chunks(16) {
            let mut hasher = DefaultHasher::new();
            chunk.hash(&mut hasher);
            let dim = (hasher.finish() as usize) % self.dimensions;
            embedding[dim] += 1.0;
        }
        Ok(normalize(embedding))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "hashed-ngram"
    }
}

/// Scale a vector to unit length; zero vectors stay zero
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in &mut vector {
            *value /= magnitude;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hashed_embedding_is_unit_normalized() {
        let oracle = HashedEmbeddingOracle::new(256);
        let embedding = oracle.embed_text("running shoes").await.unwrap();

        assert_eq!(embedding.len(), 256);
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_hashed_embedding_is_deterministic() {
        let oracle = HashedEmbeddingOracle::new(128);
        let a = oracle.embed_text("foam roller").await.unwrap();
        let b = oracle.embed_text("foam roller").await.unwrap();
        assert_eq!(a, b);
    }

    // Outputs are unit-normalized, so the dot product is the cosine
    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_similar_texts_are_closer() {
        let oracle = HashedEmbeddingOracle::new(512);
        let running = oracle.embed_text("running shoes for marathon").await.unwrap();
        let jogging = oracle.embed_text("running shoes for training").await.unwrap();
        let rowing = oracle.embed_text("indoor rowing machine").await.unwrap();

        assert!(dot(&running, &jogging) > dot(&running, &rowing));
    }

    #[tokio::test]
    async fn test_image_embedding_shares_dimension() {
        let oracle = HashedEmbeddingOracle::new(64);
        let image = oracle.embed_image(&[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3]).await.unwrap();
        assert_eq!(image.len(), 64);
    }

    #[test]
    fn test_normalize_zero_vector() {
        assert_eq!(normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_remote_oracle_rejects_empty_key() {
        let result = RemoteEmbeddingOracle::new(
            String::new(),
            &crate::config::EmbeddingConfig::default(),
        );
        assert!(result.is_err());
    }
}
