//! ClickShop - Conversational Product Discovery and Ordering Core
//!
//! A Rust backend core for a conversational shopping assistant that provides:
//! - Hybrid retrieval combining vector similarity with full-text rank
//! - Supervisor/worker agent orchestration over a closed delegation set
//! - Query understanding (category, brand, and price extraction)
//! - Progressive, streamable activity traces for UI replay
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (Product, Order, TurnResult, etc.)
//! - **Catalog**: SQL storage with vector and FTS5 indexes, direct or
//!   mediated through a tool server
//! - **Services**: LLM and embedding oracles behind narrow interfaces
//! - **Agents**: Search, product, and order workers behind a supervisor
//! - **Orchestrator**: The per-turn entry point tying it all together
//!
//! # Example
//!
//! ```ignore
//! use clickshop::{
//!     ClickshopConfig, DirectTransport, Phase, SupervisorBackend, TurnOrchestrator,
//!     TurnRequest,
//! };
//! use clickshop::services::AnthropicOracle;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClickshopConfig::from_file("clickshop.toml")?;
//!     let transport = Arc::new(DirectTransport::open("catalog.db").await?);
//!     let oracle = Arc::new(AnthropicOracle::with_default()?);
//!     let embeddings = Arc::new(clickshop::services::HashedEmbeddingOracle::new(
//!         config.embedding.dimension,
//!     ));
//!
//!     let orchestrator = TurnOrchestrator::assemble(
//!         config,
//!         transport,
//!         embeddings,
//!         SupervisorBackend::Oracle(oracle),
//!     );
//!     orchestrator.store().init_schema().await?;
//!
//!     let result = orchestrator
//!         .handle_turn(TurnRequest::text(Phase::Agentic, "running shoes under $150"))
//!         .await;
//!     println!("{}", result.reply_text);
//!
//!     Ok(())
//! }
//! ```

pub mod activity;
pub mod agents;
pub mod catalog;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod search;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use activity::{ActivityEvent, ActivityKind, ActivityRecorder};
pub use agents::{
    Delegation, OrderWorker, ProductWorker, RoutingTable, SearchWorker, Supervisor, ToolSpec,
    WorkerKind, WorkerReply,
};
pub use catalog::{
    CatalogStore, DirectTransport, MediatedTransport, QueryToolServer, SqlTransport,
};
pub use config::{
    AgentConfig, ClickshopConfig, EmbeddingConfig, OrderConfig, SearchConfig, StoreTransport,
    UploadConfig,
};
pub use error::{ClickshopError, Result};
pub use orchestrator::{SupervisorBackend, TurnOrchestrator};
pub use search::{parse, CategoryFilter, HybridRetriever, ParsedQuery};
pub use services::{
    AnthropicOracle, EmbeddingOracle, HashedEmbeddingOracle, LlmOracle, RemoteEmbeddingOracle,
};
pub use types::{
    Category, InventoryStatus, Order, OrderDraftItem, OrderItem, OrderQuote, OrderStatus, Phase,
    Product, ProductId, ScoredProduct, TurnRequest, TurnResult,
};
