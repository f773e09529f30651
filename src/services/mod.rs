//! External oracle services
//!
//! The LLM and the embedding model are treated as oracles behind narrow
//! interfaces; everything here is swappable without touching the workers.

pub mod embeddings;
pub mod llm;

pub use embeddings::{EmbeddingOracle, HashedEmbeddingOracle, RemoteEmbeddingOracle};
pub use llm::{AnthropicOracle, ChatMessage, LlmConfig, LlmOracle, LlmTurn};
