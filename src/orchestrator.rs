//! Turn orchestrator: the public entry point
//!
//! Accepts a turn, drives the phase-appropriate path, and returns the
//! assembled reply with its activity trace. Phase 1 runs the parser and
//! lexical retrieval directly; Phase 2 runs the same retrieval through the
//! mediated tool server; Phase 3 runs the supervisor. The orchestrator
//! always returns a successful `TurnResult`: internal failures land in the
//! trace and an apologetic reply, never in the transport.

use crate::activity::{ActivityEvent, ActivityKind, ActivityRecorder};
use crate::agents::{
    OrderWorker, ProductWorker, RoutingTable, SearchWorker, Supervisor, SUPERVISOR_NAME,
};
use crate::catalog::{
    display_filter_sql, CatalogStore, MediatedTransport, QueryToolServer, SqlTransport,
};
use crate::config::{ClickshopConfig, StoreTransport};
use crate::error::{ClickshopError, Result};
use crate::search::{parse, CategoryFilter, HybridRetriever};
use crate::services::{EmbeddingOracle, LlmOracle};
use crate::types::{
    Category, Order, OrderDraftItem, Phase, ProductId, ScoredProduct, TurnRequest, TurnResult,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

/// How the supervisor decides routing
pub enum SupervisorBackend {
    /// Live LLM oracle tool-calling
    Oracle(Arc<dyn LlmOracle>),
    /// Fixed keyword routing (testing and offline runs)
    Routing(RoutingTable),
}

/// Public entry point for turns
pub struct TurnOrchestrator {
    config: ClickshopConfig,
    direct_store: Arc<CatalogStore>,
    direct_retriever: Arc<HybridRetriever>,
    mediated_retriever: Arc<HybridRetriever>,
    supervisor: Arc<Supervisor>,
    order_worker: Arc<OrderWorker>,
    mediated_order_worker: Arc<OrderWorker>,
    sink: broadcast::Sender<ActivityEvent>,
}

impl TurnOrchestrator {
    /// Wire the full system from a direct transport and the two oracles.
    /// The mediated path wraps the same transport in the tool server, so
    /// both phases see one catalog.
    pub fn assemble(
        config: ClickshopConfig,
        transport: Arc<dyn SqlTransport>,
        embeddings: Arc<dyn EmbeddingOracle>,
        backend: SupervisorBackend,
    ) -> Self {
        let direct_store = Arc::new(CatalogStore::new(
            transport.clone(),
            config.embedding.dimension,
        ));
        let tool_server = Arc::new(QueryToolServer::new(transport));
        // Both transports reach the same database, so write transactions
        // must share one lock.
        let mediated_store = Arc::new(CatalogStore::with_shared_lock(
            Arc::new(MediatedTransport::new(tool_server)),
            config.embedding.dimension,
            &direct_store,
        ));

        let direct_retriever = Arc::new(HybridRetriever::new(direct_store.clone(), &config.search));
        let mediated_retriever =
            Arc::new(HybridRetriever::new(mediated_store.clone(), &config.search));

        // The configured transport governs the agentic workers; the phase
        // contract alone decides the Phase 1/2 paths.
        let (worker_store, worker_retriever) = match config.store_transport {
            StoreTransport::Direct => (direct_store.clone(), direct_retriever.clone()),
            StoreTransport::Mediated => (mediated_store.clone(), mediated_retriever.clone()),
        };

        let search_worker = Arc::new(SearchWorker::new(
            embeddings,
            worker_retriever,
            config.upload.clone(),
            config.search.default_limit,
        ));
        let product_worker = Arc::new(ProductWorker::new(worker_store.clone()));
        let order_worker = Arc::new(OrderWorker::new(worker_store, config.order.clone()));
        let mediated_order_worker =
            Arc::new(OrderWorker::new(mediated_store, config.order.clone()));

        let supervisor = Arc::new(match backend {
            SupervisorBackend::Oracle(oracle) => Supervisor::with_oracle(
                oracle,
                search_worker,
                product_worker,
                order_worker.clone(),
                &config.agent,
            ),
            SupervisorBackend::Routing(table) => Supervisor::deterministic(
                table,
                search_worker,
                product_worker,
                order_worker.clone(),
                &config.agent,
            ),
        });

        let (sink, _rx) = broadcast::channel(1024);

        Self {
            config,
            direct_store,
            direct_retriever,
            mediated_retriever,
            supervisor,
            order_worker,
            mediated_order_worker,
            sink,
        }
    }

    /// Catalog store on the direct transport (seeding, diagnostics)
    pub fn store(&self) -> Arc<CatalogStore> {
        self.direct_store.clone()
    }

    /// Subscribe to the streaming view of activity events across turns;
    /// events carry a turn id so multiplexed consumers can filter.
    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.sink.subscribe()
    }

    /// Handle one conversational turn
    pub async fn handle_turn(&self, request: TurnRequest) -> TurnResult {
        let turn_id = Uuid::new_v4();
        let recorder = ActivityRecorder::with_sink(turn_id, self.sink.clone());

        info!("Turn {} starting ({})", turn_id, request.phase);

        let outcome = tokio::time::timeout(
            self.config.agent.turn_deadline(),
            self.run_phase(&request, &recorder),
        )
        .await;

        let (reply_text, products, order) = match outcome {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                recorder.record(
                    ActivityEvent::new(ActivityKind::Error, "Turn failed")
                        .with_details(format!("{}: {}", e.code(), e))
                        .with_worker(SUPERVISOR_NAME),
                );
                (e.user_message(), None, None)
            }
            Err(_) => {
                let e = ClickshopError::TurnTimeout;
                recorder.record(
                    ActivityEvent::new(ActivityKind::Error, "Turn deadline exceeded")
                        .with_details(e.code().to_string())
                        .with_worker(SUPERVISOR_NAME),
                );
                (e.user_message(), None, None)
            }
        };

        let follow_ups = follow_up_suggestions(products.as_deref(), order.as_ref());

        // An empty product list reads as "no products" on the wire
        let products = products.filter(|p| !p.is_empty());

        TurnResult {
            turn_id,
            reply_text,
            products,
            order,
            activity_trace: recorder.take(),
            follow_ups,
        }
    }

    async fn run_phase(
        &self,
        request: &TurnRequest,
        recorder: &ActivityRecorder,
    ) -> Result<TurnOutcome> {
        match request.phase {
            Phase::Direct => {
                let message = required_message(request)?;
                self.lexical_turn(&self.direct_retriever, message, false, recorder)
                    .await
            }
            Phase::Mediated => {
                let message = required_message(request)?;
                self.lexical_turn(&self.mediated_retriever, message, true, recorder)
                    .await
            }
            Phase::Agentic => {
                let message = match (&request.message, &request.image) {
                    (Some(message), _) => message.clone(),
                    (None, Some(_)) => String::new(),
                    (None, None) => {
                        return Err(ClickshopError::MissingField("message".to_string()))
                    }
                };

                let outcome = self
                    .supervisor
                    .run(
                        &message,
                        request.image.as_deref(),
                        request.customer_id.as_deref(),
                        recorder,
                    )
                    .await?;
                Ok((outcome.reply, outcome.products, outcome.order))
            }
        }
    }

    /// Phases 1 and 2: parser then lexical-only retrieval. No embedding,
    /// no agent loop. The mediated variant records the tool-server hop.
    async fn lexical_turn(
        &self,
        retriever: &HybridRetriever,
        message: String,
        mediated: bool,
        recorder: &ActivityRecorder,
    ) -> Result<TurnOutcome> {
        let parsed = parse(&message);
        let limit = self.config.search.default_limit;
        let sql_summary = display_filter_sql(&parsed, limit);

        debug!("Lexical turn: {:?}", parsed);

        let start = Instant::now();
        let products = retriever.retrieve(&parsed, None, limit).await?;
        let latency = start.elapsed().as_millis() as u64;

        if mediated {
            recorder.record(
                ActivityEvent::new(ActivityKind::Mcp, "Tool server: run_query")
                    .with_details("Database access via connect/run_query tools".to_string())
                    .with_sql(sql_summary.clone())
                    .with_latency(latency),
            );
        } else {
            recorder.record(
                ActivityEvent::new(ActivityKind::Database, "Executing catalog query")
                    .with_sql(sql_summary.clone())
                    .with_latency(latency),
            );
        }

        let title = match &parsed.category {
            Some(CategoryFilter::Single(category)) => {
                format!("Category filter: {}", category)
            }
            Some(CategoryFilter::Shoes) => "Searching shoe categories".to_string(),
            None => format!("Text search: {}", message),
        };
        recorder.record(
            ActivityEvent::new(ActivityKind::Search, title)
                .with_details(format!("Found {} products", products.len()))
                .with_sql(sql_summary),
        );

        let reply = if products.is_empty() {
            format!(
                "I couldn't find any products matching \"{}\". Could you try a different search term?",
                message
            )
        } else {
            format!(
                "I found {} products that might interest you:",
                products.len()
            )
        };

        Ok((reply, Some(products), None))
    }

    /// Order RPC: place an order for one product outside the chat loop
    pub async fn place_order(
        &self,
        product_id: ProductId,
        size: Option<String>,
        quantity: i64,
        phase: Phase,
        customer_id: Option<String>,
    ) -> TurnResult {
        let turn_id = Uuid::new_v4();
        let recorder = ActivityRecorder::with_sink(turn_id, self.sink.clone());
        let customer = customer_id.unwrap_or_else(|| "guest".to_string());

        let worker = match phase {
            Phase::Mediated => &self.mediated_order_worker,
            _ => &self.order_worker,
        };

        let items = vec![OrderDraftItem {
            product_id,
            size,
            quantity,
        }];

        let outcome = tokio::time::timeout(
            self.config.agent.turn_deadline(),
            worker.place(&customer, &items, &recorder),
        )
        .await;

        let (reply_text, order) = match outcome {
            Ok(Ok(order)) => (
                format!(
                    "Order {} confirmed! Total: ${} including tax and shipping.",
                    order.order_id, order.total
                ),
                Some(order),
            ),
            Ok(Err(e)) => (e.user_message(), None),
            Err(_) => {
                let e = ClickshopError::TurnTimeout;
                recorder.record(
                    ActivityEvent::new(ActivityKind::Error, "Order deadline exceeded")
                        .with_details(e.code().to_string()),
                );
                (e.user_message(), None)
            }
        };

        TurnResult {
            turn_id,
            reply_text,
            products: None,
            order,
            activity_trace: recorder.take(),
            follow_ups: Vec::new(),
        }
    }
}

type TurnOutcome = (String, Option<Vec<ScoredProduct>>, Option<Order>);

fn required_message(request: &TurnRequest) -> Result<String> {
    request
        .message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ClickshopError::MissingField("message".to_string()))
}

/// Follow-up suggestions are a small deterministic function of the result
/// shape: search results yield three related category queries, orders none.
fn follow_up_suggestions(
    products: Option<&[ScoredProduct]>,
    order: Option<&Order>,
) -> Vec<String> {
    if order.is_some() {
        return Vec::new();
    }

    let Some(products) = products else {
        return Vec::new();
    };

    let mut categories: Vec<Category> = Vec::new();
    for scored in products {
        if !categories.contains(&scored.product.category) {
            categories.push(scored.product.category);
        }
    }
    for category in Category::ALL {
        if categories.len() >= 3 {
            break;
        }
        if !categories.contains(&category) {
            categories.push(category);
        }
    }

    categories
        .into_iter()
        .take(3)
        .map(|c| format!("Show me {}", c.as_str().to_lowercase()))
        .collect()
}
