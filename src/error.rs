//! Error types for the ClickShop core
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use thiserror::Error;

/// Main error type for ClickShop operations
#[derive(Error, Debug)]
pub enum ClickshopError {
    /// Order item quantity below 1
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Required request field missing
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Uploaded image rejected (format or size)
    #[error("Bad image: {0}")]
    BadImage(String),

    /// Product or order not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Inventory cannot cover the requested quantity
    #[error("Insufficient inventory for {product_id}: requested {requested}, available {available}")]
    InsufficientInventory {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// Retrieval path cannot reach the catalog store
    #[error("Retriever unavailable: {0}")]
    RetrieverUnavailable(String),

    /// Embedding oracle call failed
    #[error("Embedding error: {0}")]
    EmbeddingFailure(String),

    /// LLM oracle call failed
    #[error("LLM error: {0}")]
    LlmFailure(String),

    /// Supervisor exceeded its tool-call bound
    #[error("Tool loop exhausted after {0} calls")]
    LoopExhausted(usize),

    /// Whole-turn deadline exceeded
    #[error("Turn deadline exceeded")]
    TurnTimeout,

    /// Catalog store operation failed
    #[error("Store error: {0}")]
    StoreFailure(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for ClickShop operations
pub type Result<T> = std::result::Result<T, ClickshopError>;

impl From<libsql::Error> for ClickshopError {
    fn from(err: libsql::Error) -> Self {
        ClickshopError::StoreFailure(err.to_string())
    }
}

/// Convert anyhow::Error to ClickshopError
impl From<anyhow::Error> for ClickshopError {
    fn from(err: anyhow::Error) -> Self {
        ClickshopError::StoreFailure(err.to_string())
    }
}

impl ClickshopError {
    /// Short machine-readable code for the activity trace
    pub fn code(&self) -> &'static str {
        match self {
            ClickshopError::InvalidQuantity(_) => "invalid_quantity",
            ClickshopError::MissingField(_) => "missing_field",
            ClickshopError::BadImage(_) => "bad_image",
            ClickshopError::NotFound(_) => "not_found",
            ClickshopError::InsufficientInventory { .. } => "insufficient_inventory",
            ClickshopError::RetrieverUnavailable(_) => "retriever_unavailable",
            ClickshopError::EmbeddingFailure(_) => "embedding_failure",
            ClickshopError::LlmFailure(_) => "llm_failure",
            ClickshopError::LoopExhausted(_) => "loop_exhausted",
            ClickshopError::TurnTimeout => "turn_timeout",
            ClickshopError::StoreFailure(_) => "store_failure",
            ClickshopError::Config(_) => "config_error",
            ClickshopError::Io(_) => "io_error",
            ClickshopError::Serialization(_) => "serialization_error",
            ClickshopError::Http(_) => "http_error",
        }
    }

    /// User-facing message: specific for business errors, generic for
    /// infrastructure failures.
    pub fn user_message(&self) -> String {
        match self {
            ClickshopError::InvalidQuantity(q) => {
                format!("Order quantities must be at least 1 (got {}).", q)
            }
            ClickshopError::BadImage(reason) => {
                format!("I couldn't read that image: {}.", reason)
            }
            ClickshopError::NotFound(what) => {
                format!("I couldn't find {}.", what)
            }
            ClickshopError::InsufficientInventory {
                requested,
                available,
                ..
            } => {
                if *available == 0 {
                    "That item is out of stock right now.".to_string()
                } else {
                    format!(
                        "We only have {} of those left (you asked for {}).",
                        available, requested
                    )
                }
            }
            ClickshopError::TurnTimeout => {
                "That took longer than expected — please try again.".to_string()
            }
            _ => "I couldn't complete that — please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClickshopError::NotFound("product SKU-001".to_string());
        assert_eq!(err.to_string(), "Not found: product SKU-001");
    }

    #[test]
    fn test_inventory_message_is_specific() {
        let err = ClickshopError::InsufficientInventory {
            product_id: "SKU-001".to_string(),
            requested: 3,
            available: 2,
        };
        assert!(err.user_message().contains("only have 2"));
        assert_eq!(err.code(), "insufficient_inventory");
    }

    #[test]
    fn test_store_failure_message_is_generic() {
        let err = ClickshopError::StoreFailure("connection refused".to_string());
        assert!(!err.user_message().contains("connection refused"));
    }
}
