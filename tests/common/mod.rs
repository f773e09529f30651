//! Shared helpers for integration tests
#![allow(dead_code)]

use crate::fixtures::{axis_vector, TestData, TEST_DIM};
use async_trait::async_trait;
use clickshop::services::{ChatMessage, LlmTurn};
use clickshop::{
    ActivityRecorder, CatalogStore, ClickshopConfig, ClickshopError, Delegation, DirectTransport,
    EmbeddingOracle, LlmOracle, RoutingTable, SupervisorBackend, ToolSpec, TurnOrchestrator,
    WorkerKind,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Configuration sized for the fixture embedding space
pub fn test_config() -> ClickshopConfig {
    let mut config = ClickshopConfig::default();
    config.embedding.dimension = TEST_DIM;
    config
}

/// Enable log output when running with RUST_LOG set
pub fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// In-memory transport with the fixture catalog seeded
pub async fn seeded_transport() -> Arc<DirectTransport> {
    init_tracing();
    let transport = Arc::new(DirectTransport::in_memory().await.unwrap());
    let store = CatalogStore::new(transport.clone(), TEST_DIM);
    store.init_schema().await.unwrap();

    for product in TestData::all() {
        store.upsert_product(&product).await.unwrap();
    }
    store.upsert_product(&TestData::unembedded()).await.unwrap();

    transport
}

/// Seeded store on its own transport (retriever and worker tests)
pub async fn seeded_store() -> Arc<CatalogStore> {
    let transport = seeded_transport().await;
    Arc::new(CatalogStore::new(transport, TEST_DIM))
}

/// Keyword routing used by the deterministic supervisor in tests
pub fn default_routing() -> RoutingTable {
    RoutingTable::new()
        .route("place an order", WorkerKind::Order)
        .route("in stock", WorkerKind::Product)
        .fallback(WorkerKind::Search)
}

/// Orchestrator over a fresh seeded catalog with the given embedding oracle
pub async fn orchestrator_with(embeddings: Arc<dyn EmbeddingOracle>) -> TurnOrchestrator {
    let transport = seeded_transport().await;
    TurnOrchestrator::assemble(
        test_config(),
        transport,
        embeddings,
        SupervisorBackend::Routing(default_routing()),
    )
}

/// Orchestrator driven by a scripted oracle instead of the routing table
pub async fn orchestrator_with_oracle(
    embeddings: Arc<dyn EmbeddingOracle>,
    oracle: Arc<dyn LlmOracle>,
) -> TurnOrchestrator {
    let transport = seeded_transport().await;
    TurnOrchestrator::assemble(
        test_config(),
        transport,
        embeddings,
        SupervisorBackend::Oracle(oracle),
    )
}

pub fn recorder() -> ActivityRecorder {
    ActivityRecorder::new(Uuid::new_v4())
}

/// Deterministic embedding oracle: the first matching keyword selects a
/// category axis in the fixture space, so queries land exactly on the
/// embeddings of that category's products.
pub struct KeywordEmbeddingOracle {
    rules: Vec<(&'static str, usize)>,
    image_axis: usize,
}

impl KeywordEmbeddingOracle {
    /// Rules covering the fixture categories
    pub fn fixture() -> Self {
        Self {
            rules: vec![
                ("marathon", 0),
                ("running", 0),
                ("run", 0),
                ("shoe", 0),
                ("sneaker", 0),
                ("gym", 1),
                ("training", 1),
                ("lifting", 1),
                ("equipment", 2),
                ("dumbbell", 2),
                ("shirt", 3),
                ("apparel", 3),
                ("watch", 4),
                ("recovery", 5),
                ("massage", 5),
                ("roller", 5),
            ],
            image_axis: 0,
        }
    }

    /// Oracle whose image embeddings land on the given category axis
    pub fn with_image_axis(mut self, axis: usize) -> Self {
        self.image_axis = axis;
        self
    }
}

#[async_trait]
impl EmbeddingOracle for KeywordEmbeddingOracle {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ClickshopError> {
        let text = text.to_lowercase();
        for (keyword, axis) in &self.rules {
            if text.contains(keyword) {
                return Ok(axis_vector(*axis));
            }
        }
        // Unrecognized text lands on an axis no product occupies
        Ok(axis_vector(TEST_DIM - 1))
    }

    async fn embed_image(&self, _image: &[u8]) -> Result<Vec<f32>, ClickshopError> {
        Ok(axis_vector(self.image_axis))
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }

    fn model_name(&self) -> &str {
        "keyword-fixture"
    }
}

/// Embedding oracle that always fails (fallback-path tests)
pub struct FailingEmbeddingOracle;

#[async_trait]
impl EmbeddingOracle for FailingEmbeddingOracle {
    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>, ClickshopError> {
        Err(ClickshopError::EmbeddingFailure("oracle offline".to_string()))
    }

    async fn embed_image(&self, _image: &[u8]) -> Result<Vec<f32>, ClickshopError> {
        Err(ClickshopError::EmbeddingFailure("oracle offline".to_string()))
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }

    fn model_name(&self) -> &str {
        "failing-fixture"
    }
}

enum Script {
    Steps(Mutex<VecDeque<LlmTurn>>),
    Repeat(LlmTurn),
}

/// LLM oracle that replays a fixed script of turns
pub struct ScriptedOracle {
    script: Script,
}

impl ScriptedOracle {
    /// Play the given turns in order; further calls fail
    pub fn steps(steps: Vec<LlmTurn>) -> Self {
        Self {
            script: Script::Steps(Mutex::new(steps.into())),
        }
    }

    /// Return the same turn on every call (loop-bound tests)
    pub fn repeating(turn: LlmTurn) -> Self {
        Self {
            script: Script::Repeat(turn),
        }
    }

    /// A search delegation for the given query
    pub fn search(query: &str) -> LlmTurn {
        LlmTurn::Invoke(Delegation::Search {
            query: query.to_string(),
            limit: None,
        })
    }
}

#[async_trait]
impl LlmOracle for ScriptedOracle {
    async fn next_turn(
        &self,
        _system: &str,
        _transcript: &[ChatMessage],
        _tools: &[ToolSpec],
    ) -> Result<LlmTurn, ClickshopError> {
        match &self.script {
            Script::Steps(steps) => steps
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ClickshopError::LlmFailure("script exhausted".to_string())),
            Script::Repeat(turn) => Ok(turn.clone()),
        }
    }
}
