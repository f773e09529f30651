//! Configuration for the ClickShop core
//!
//! All tunables are resolved once at startup and immutable afterwards;
//! swapping any of them requires a restart. Values load from an optional
//! TOML file with `CLICKSHOP_`-prefixed environment overrides on top.

use crate::error::{ClickshopError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Which transport the catalog store is spoken through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreTransport {
    /// Parameterized SQL over the direct connection
    #[default]
    Direct,
    /// Same semantics through the `connect`/`run_query` tool server
    Mediated,
}

/// Hybrid retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Weight for semantic (vector) similarity
    pub semantic_weight: f32,

    /// Weight for lexical (full-text) rank
    pub lexical_weight: f32,

    /// Candidate set is `max(candidate_multiplier · limit, candidate_minimum)`
    pub candidate_multiplier: usize,
    pub candidate_minimum: usize,

    /// Default result limit when a caller does not specify one
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.7,
            lexical_weight: 0.3,
            candidate_multiplier: 4,
            candidate_minimum: 50,
            default_limit: 5,
        }
    }
}

impl SearchConfig {
    /// Validate search configuration
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("semantic_weight", self.semantic_weight),
            ("lexical_weight", self.lexical_weight),
        ];

        for (name, weight) in &weights {
            if *weight < 0.0 || *weight > 1.0 {
                return Err(ClickshopError::Config(config::ConfigError::Message(
                    format!("{} must be between 0.0 and 1.0, got {}", name, weight),
                )));
            }
        }

        let sum = self.semantic_weight + self.lexical_weight;
        if (sum - 1.0).abs() > 0.001 {
            return Err(ClickshopError::Config(config::ConfigError::Message(
                format!("hybrid weights must sum to 1.0, got {}", sum),
            )));
        }

        if self.candidate_multiplier < 1 {
            return Err(ClickshopError::Config(config::ConfigError::Message(
                "candidate_multiplier must be at least 1".to_string(),
            )));
        }

        if self.candidate_minimum < 50 {
            warn!(
                "candidate_minimum {} is below the recommended floor of 50",
                self.candidate_minimum
            );
        }

        Ok(())
    }

    /// Candidate set size for a given result limit
    pub fn candidate_size(&self, limit: usize) -> usize {
        (self.candidate_multiplier * limit).max(self.candidate_minimum)
    }
}

/// Order pricing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    /// Sales tax rate applied to the subtotal
    pub tax_rate: Decimal,

    /// Subtotal at or above which shipping is free
    pub free_shipping_threshold: Decimal,

    /// Flat shipping fee below the threshold
    pub flat_shipping: Decimal,

    /// Delivery estimate range in days
    pub min_delivery_days: i64,
    pub max_delivery_days: i64,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(85, 3),                 // 0.085
            free_shipping_threshold: Decimal::new(7500, 2), // 75.00
            flat_shipping: Decimal::new(799, 2),            // 7.99
            min_delivery_days: 3,
            max_delivery_days: 7,
        }
    }
}

impl OrderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tax_rate < Decimal::ZERO || self.tax_rate >= Decimal::ONE {
            return Err(ClickshopError::Config(config::ConfigError::Message(
                format!("tax_rate must be in [0, 1), got {}", self.tax_rate),
            )));
        }
        if self.flat_shipping < Decimal::ZERO || self.free_shipping_threshold < Decimal::ZERO {
            return Err(ClickshopError::Config(config::ConfigError::Message(
                "shipping amounts must be non-negative".to_string(),
            )));
        }
        if self.min_delivery_days > self.max_delivery_days {
            return Err(ClickshopError::Config(config::ConfigError::Message(
                "min_delivery_days must not exceed max_delivery_days".to_string(),
            )));
        }
        Ok(())
    }
}

/// Supervisor loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Bound on tool invocations per turn
    pub max_tool_calls: usize,

    /// Whole-turn deadline in milliseconds
    pub turn_deadline_ms: u64,

    /// Per-call deadline for external calls (store, oracles)
    pub call_deadline_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: 5,
            turn_deadline_ms: 30_000,
            call_deadline_ms: 10_000,
        }
    }
}

impl AgentConfig {
    pub fn turn_deadline(&self) -> Duration {
        Duration::from_millis(self.turn_deadline_ms)
    }

    pub fn call_deadline(&self) -> Duration {
        Duration::from_millis(self.call_deadline_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tool_calls == 0 {
            return Err(ClickshopError::Config(config::ConfigError::Message(
                "max_tool_calls must be at least 1".to_string(),
            )));
        }
        Ok(())
    }
}

/// Embedding oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// System-wide embedding dimension
    pub dimension: usize,

    /// Model identifier for the remote oracle
    pub model: String,

    /// API base URL
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: 1024,
            model: "voyage-multimodal-3".to_string(),
            base_url: "https://api.voyageai.com/v1".to_string(),
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(ClickshopError::Config(config::ConfigError::Message(
                "embedding dimension must be positive".to_string(),
            )));
        }
        Ok(())
    }
}

/// Uploaded-image constraints for visual search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum image size in bytes
    pub max_image_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Main configuration container
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickshopConfig {
    pub search: SearchConfig,
    pub order: OrderConfig,
    pub agent: AgentConfig,
    pub embedding: EmbeddingConfig,
    pub upload: UploadConfig,
    pub store_transport: StoreTransport,
}

impl ClickshopConfig {
    /// Load from a TOML file with `CLICKSHOP_`-prefixed environment overrides
    /// (e.g. `CLICKSHOP_SEARCH__SEMANTIC_WEIGHT=0.8`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CLICKSHOP").separator("__"))
            .build()?;

        let cfg: ClickshopConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the full tree
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.order.validate()?;
        self.agent.validate()?;
        self.embedding.validate()?;
        Ok(())
    }
}
