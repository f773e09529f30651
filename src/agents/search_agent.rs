//! Search worker: hybrid text search and visual search
//!
//! Owns the embedding oracle and the hybrid retriever. An embedding-oracle
//! failure on the text path degrades to lexical-only retrieval and is
//! recorded in the trace; it never fails the turn while a lexical path can
//! still answer. Store failures are hard errors.

use super::{ToolSpec, WorkerReply, SEARCH_WORKER};
use crate::activity::{ActivityEvent, ActivityKind, ActivityRecorder};
use crate::catalog::display_filter_sql;
use crate::config::UploadConfig;
use crate::error::{ClickshopError, Result};
use crate::search::{parse, HybridRetriever, ParsedQuery};
use crate::services::EmbeddingOracle;
use crate::types::ScoredProduct;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Search worker
pub struct SearchWorker {
    embeddings: Arc<dyn EmbeddingOracle>,
    retriever: Arc<HybridRetriever>,
    upload: UploadConfig,
    default_limit: usize,
}

impl SearchWorker {
    pub fn new(
        embeddings: Arc<dyn EmbeddingOracle>,
        retriever: Arc<HybridRetriever>,
        upload: UploadConfig,
        default_limit: usize,
    ) -> Self {
        Self {
            embeddings,
            retriever,
            upload,
            default_limit,
        }
    }

    /// Hybrid text search: embed the query, parse it into filters, and run
    /// the hybrid retriever. Falls back to lexical-only if the embedding
    /// oracle fails.
    pub async fn text_search(
        &self,
        query: &str,
        limit: Option<usize>,
        recorder: &ActivityRecorder,
    ) -> Result<WorkerReply> {
        let limit = limit.unwrap_or(self.default_limit);
        let parsed = parse(query);

        let embed_start = Instant::now();
        let query_vector = match self.embeddings.embed_text(query).await {
            Ok(vector) => {
                recorder.record(
                    ActivityEvent::new(ActivityKind::Embedding, "Text embedding generated")
                        .with_details(format!("Dimension: {}", vector.len()))
                        .with_latency(embed_start.elapsed().as_millis() as u64)
                        .with_worker(SEARCH_WORKER),
                );
                Some(vector)
            }
            Err(e) => {
                warn!("Embedding oracle failed, falling back to lexical: {}", e);
                recorder.record(
                    ActivityEvent::new(ActivityKind::Error, "Embedding failed")
                        .with_details(format!("{}; falling back to lexical search", e))
                        .with_worker(SEARCH_WORKER),
                );
                None
            }
        };

        let search_start = Instant::now();
        let products = self
            .retriever
            .retrieve(&parsed, query_vector.as_deref(), limit)
            .await?;
        let search_latency = search_start.elapsed().as_millis() as u64;

        let (title, sql_summary) = if query_vector.is_some() {
            (
                format!("Semantic search: '{}'", query),
                hybrid_sql_summary(&parsed, limit),
            )
        } else {
            (
                format!("Text search: {}", query),
                display_filter_sql(&parsed, limit),
            )
        };

        recorder.record(
            ActivityEvent::new(ActivityKind::Search, title)
                .with_details(format!("Found {} products", products.len()))
                .with_sql(sql_summary)
                .with_latency(search_latency)
                .with_worker(SEARCH_WORKER),
        );
        recorder.record(
            ActivityEvent::new(
                ActivityKind::Result,
                format!("Found {} products", products.len()),
            )
            .with_worker(SEARCH_WORKER),
        );

        Ok(reply_for(products, query))
    }

    /// Visual search: embed the image and retrieve by semantic similarity
    /// alone. There is no lexical component, so an oracle failure here is
    /// a real error.
    pub async fn image_search(
        &self,
        image: &[u8],
        limit: Option<usize>,
        recorder: &ActivityRecorder,
    ) -> Result<WorkerReply> {
        let limit = limit.unwrap_or(self.default_limit);
        self.validate_image(image)?;

        let embed_start = Instant::now();
        let query_vector = match self.embeddings.embed_image(image).await {
            Ok(vector) => {
                recorder.record(
                    ActivityEvent::new(ActivityKind::Embedding, "Image embedding generated")
                        .with_details(format!(
                            "Image size: {} bytes, dimension: {}",
                            image.len(),
                            vector.len()
                        ))
                        .with_latency(embed_start.elapsed().as_millis() as u64)
                        .with_worker(SEARCH_WORKER),
                );
                vector
            }
            Err(e) => {
                recorder.record(
                    ActivityEvent::new(ActivityKind::Error, "Image embedding failed")
                        .with_details(e.to_string())
                        .with_worker(SEARCH_WORKER),
                );
                return Err(e);
            }
        };

        let search_start = Instant::now();
        let empty = ParsedQuery::default();
        let products = self
            .retriever
            .retrieve(&empty, Some(&query_vector), limit)
            .await?;

        recorder.record(
            ActivityEvent::new(ActivityKind::Search, "Visual search completed")
                .with_details(format!("Found {} similar products", products.len()))
                .with_sql(hybrid_sql_summary(&empty, limit))
                .with_latency(search_start.elapsed().as_millis() as u64)
                .with_worker(SEARCH_WORKER),
        );
        recorder.record(
            ActivityEvent::new(
                ActivityKind::Result,
                format!("Found {} products", products.len()),
            )
            .with_worker(SEARCH_WORKER),
        );

        debug!("Visual search returned {} products", products.len());

        let message = if products.is_empty() {
            "I couldn't find anything similar to your image.".to_string()
        } else {
            "Based on your image, here are similar products:".to_string()
        };
        Ok(WorkerReply {
            message,
            products: Some(products),
            order: None,
        })
    }

    fn validate_image(&self, image: &[u8]) -> Result<()> {
        if image.is_empty() {
            return Err(ClickshopError::BadImage("empty upload".to_string()));
        }
        if image.len() > self.upload.max_image_bytes {
            return Err(ClickshopError::BadImage(format!(
                "image exceeds {} byte limit",
                self.upload.max_image_bytes
            )));
        }
        if !is_supported_format(image) {
            return Err(ClickshopError::BadImage(
                "supported formats: jpeg, png, webp".to_string(),
            ));
        }
        Ok(())
    }

    /// This worker's tool registry
    pub fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "text_search".to_string(),
                description: "Search products with natural language.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" },
                        "limit": { "type": "integer", "default": self.default_limit }
                    },
                    "required": ["query"]
                }),
            },
            ToolSpec {
                name: "image_search".to_string(),
                description: "Find visually similar products from an uploaded image."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "image": { "type": "string", "description": "Base64 image data" },
                        "limit": { "type": "integer", "default": self.default_limit }
                    },
                    "required": ["image"]
                }),
            },
        ]
    }
}

fn reply_for(products: Vec<ScoredProduct>, query: &str) -> WorkerReply {
    let message = if products.is_empty() {
        format!(
            "I couldn't find any products matching \"{}\". Could you try a different search term?",
            query
        )
    } else {
        format!(
            "I found {} products that might interest you:",
            products.len()
        )
    };
    WorkerReply {
        message,
        products: Some(products),
        order: None,
    }
}

fn hybrid_sql_summary(query: &ParsedQuery, limit: usize) -> String {
    let lexical = if query.cleaned_text.is_empty() {
        String::new()
    } else {
        format!(" + bm25('{}')", query.cleaned_text)
    };
    format!(
        "SELECT ... ORDER BY vector_distance_cos(embedding, :query){} LIMIT {}",
        lexical, limit
    )
}

fn is_supported_format(image: &[u8]) -> bool {
    image.starts_with(&[0xFF, 0xD8, 0xFF])
        || image.starts_with(&[0x89, b'P', b'N', b'G'])
        || (image.len() >= 12 && &image[0..4] == b"RIFF" && &image[8..12] == b"WEBP")
}
