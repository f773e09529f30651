//! Supervisor: routes a turn to specialized workers
//!
//! Drives the LLM oracle in a tool-calling loop over the closed delegation
//! set. The supervisor has no direct store access; every side effect goes
//! through a worker. A deterministic keyword-routing mode bypasses the
//! oracle entirely so the end-to-end path can be driven without a live
//! model.

use super::{
    Delegation, OrderWorker, ProductWorker, SearchWorker, WorkerReply, SUPERVISOR_NAME,
};
use crate::activity::{ActivityEvent, ActivityKind, ActivityRecorder};
use crate::config::AgentConfig;
use crate::error::{ClickshopError, Result};
use crate::services::{ChatMessage, LlmOracle, LlmTurn};
use crate::types::{Order, ProductId, ScoredProduct};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "\
You are a supervisor agent for a sports-gear shop, coordinating specialized \
agents to help customers.

You have three specialized agents you can delegate to:
1. Search Agent - for finding products via semantic text search or visual image search
2. Product Agent - for product details and inventory checks
3. Order Agent - for pricing and placing orders

Your role is to understand the customer's request, delegate to the right \
agent, coordinate multi-step workflows (e.g. search -> details -> order), \
and synthesize the final answer. When you have enough information, reply \
directly to the customer instead of calling another tool.";

/// Worker selector for the deterministic routing table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerKind {
    Search,
    Product,
    Order,
}

/// Fixed keyword -> worker routing used in deterministic mode
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    rules: Vec<(String, WorkerKind)>,
    fallback: Option<WorkerKind>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule; rules are evaluated in insertion order
    pub fn route(mut self, keyword: impl Into<String>, worker: WorkerKind) -> Self {
        self.rules.push((keyword.into().to_lowercase(), worker));
        self
    }

    /// Worker used when no keyword matches
    pub fn fallback(mut self, worker: WorkerKind) -> Self {
        self.fallback = Some(worker);
        self
    }

    fn resolve(&self, message: &str) -> Option<WorkerKind> {
        let message = message.to_lowercase();
        self.rules
            .iter()
            .find(|(keyword, _)| message.contains(keyword))
            .map(|(_, worker)| *worker)
            .or(self.fallback)
    }
}

enum RoutingMode {
    Oracle(Arc<dyn LlmOracle>),
    Deterministic(RoutingTable),
}

/// The assembled result of a supervised turn
#[derive(Debug, Clone)]
pub struct SupervisorOutcome {
    pub reply: String,
    pub products: Option<Vec<ScoredProduct>>,
    pub order: Option<Order>,
}

/// Supervisor agent
pub struct Supervisor {
    mode: RoutingMode,
    search: Arc<SearchWorker>,
    product: Arc<ProductWorker>,
    order: Arc<OrderWorker>,
    max_tool_calls: usize,
    call_deadline: Duration,
}

impl Supervisor {
    /// Supervisor driven by the LLM oracle
    pub fn with_oracle(
        oracle: Arc<dyn LlmOracle>,
        search: Arc<SearchWorker>,
        product: Arc<ProductWorker>,
        order: Arc<OrderWorker>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            mode: RoutingMode::Oracle(oracle),
            search,
            product,
            order,
            max_tool_calls: config.max_tool_calls,
            call_deadline: config.call_deadline(),
        }
    }

    /// Supervisor with a fixed routing table, bypassing the oracle
    pub fn deterministic(
        table: RoutingTable,
        search: Arc<SearchWorker>,
        product: Arc<ProductWorker>,
        order: Arc<OrderWorker>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            mode: RoutingMode::Deterministic(table),
            search,
            product,
            order,
            max_tool_calls: config.max_tool_calls,
            call_deadline: config.call_deadline(),
        }
    }

    /// Process one customer message by coordinating workers
    pub async fn run(
        &self,
        message: &str,
        image: Option<&[u8]>,
        customer_id: Option<&str>,
        recorder: &ActivityRecorder,
    ) -> Result<SupervisorOutcome> {
        recorder.record(
            ActivityEvent::new(ActivityKind::Reasoning, "Supervisor processing request")
                .with_details(summarize(message, image))
                .with_worker(SUPERVISOR_NAME),
        );

        match &self.mode {
            RoutingMode::Deterministic(table) => {
                self.run_deterministic(table, message, image, recorder).await
            }
            RoutingMode::Oracle(oracle) => {
                self.run_oracle(oracle.as_ref(), message, image, customer_id, recorder)
                    .await
            }
        }
    }

    async fn run_deterministic(
        &self,
        table: &RoutingTable,
        message: &str,
        image: Option<&[u8]>,
        recorder: &ActivityRecorder,
    ) -> Result<SupervisorOutcome> {
        let worker = table.resolve(message).unwrap_or(WorkerKind::Search);

        let delegation = match worker {
            WorkerKind::Search => Delegation::Search {
                query: message.to_string(),
                limit: None,
            },
            WorkerKind::Product => Delegation::Product {
                // Routing-table turns carry the product id as the last token
                product_id: message
                    .split_whitespace()
                    .next_back()
                    .unwrap_or_default()
                    .to_string(),
                size: None,
            },
            WorkerKind::Order => {
                // Order placement needs structured items; chat turns point
                // the customer at the order flow instead.
                return Ok(SupervisorOutcome {
                    reply: "To place an order, pick a product and use the order form."
                        .to_string(),
                    products: None,
                    order: None,
                });
            }
        };

        let reply = self.dispatch(&delegation, image, recorder).await?;
        Ok(SupervisorOutcome {
            reply: reply.message,
            products: reply.products,
            order: reply.order,
        })
    }

    async fn run_oracle(
        &self,
        oracle: &dyn LlmOracle,
        message: &str,
        image: Option<&[u8]>,
        customer_id: Option<&str>,
        recorder: &ActivityRecorder,
    ) -> Result<SupervisorOutcome> {
        let tools = Delegation::tool_specs();
        let opening = match customer_id {
            Some(customer_id) => format!("[customer_id: {}] {}", customer_id, message),
            None => message.to_string(),
        };
        let mut transcript = vec![ChatMessage::user(opening)];
        let mut products = None;
        let mut order = None;
        let mut consecutive_errors = 0_usize;

        for _ in 0..self.max_tool_calls {
            let turn = match tokio::time::timeout(
                self.call_deadline,
                oracle.next_turn(SYSTEM_PROMPT, &transcript, &tools),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ClickshopError::LlmFailure(
                    "oracle call deadline exceeded".to_string(),
                )),
            };

            let turn = match turn {
                Ok(turn) => turn,
                Err(e) => {
                    recorder.record(
                        ActivityEvent::new(ActivityKind::Error, "Oracle call failed")
                            .with_details(e.to_string())
                            .with_worker(SUPERVISOR_NAME),
                    );
                    return Ok(SupervisorOutcome {
                        reply: e.user_message(),
                        products,
                        order,
                    });
                }
            };

            match turn {
                LlmTurn::Reply(text) => {
                    debug!("Supervisor finished with a direct reply");
                    return Ok(SupervisorOutcome {
                        reply: text,
                        products,
                        order,
                    });
                }
                LlmTurn::Invoke(delegation) => {
                    match self.dispatch(&delegation, image, recorder).await {
                        Ok(reply) => {
                            consecutive_errors = 0;
                            if reply.products.is_some() {
                                products = reply.products.clone();
                            }
                            if reply.order.is_some() {
                                order = reply.order.clone();
                            }
                            let output = serde_json::to_string(&reply)?;
                            transcript.push(ChatMessage::assistant(format!(
                                "[{}]",
                                delegation.tool_name()
                            )));
                            transcript.push(ChatMessage::user(format!(
                                "Tool {} returned: {}",
                                delegation.tool_name(),
                                output
                            )));
                        }
                        Err(e) => {
                            warn!("Worker {} failed: {}", delegation.worker_name(), e);
                            recorder.record(
                                ActivityEvent::new(
                                    ActivityKind::Error,
                                    format!("{} failed", delegation.worker_name()),
                                )
                                .with_details(e.to_string())
                                .with_worker(delegation.worker_name()),
                            );

                            consecutive_errors += 1;
                            let fatal = matches!(e, ClickshopError::StoreFailure(_));
                            if fatal || consecutive_errors >= 2 {
                                return Ok(SupervisorOutcome {
                                    reply: e.user_message(),
                                    products,
                                    order,
                                });
                            }

                            transcript.push(ChatMessage::assistant(format!(
                                "[{}]",
                                delegation.tool_name()
                            )));
                            transcript.push(ChatMessage::user(format!(
                                "Tool {} failed: {}. Try a different approach or apologize.",
                                delegation.tool_name(),
                                e
                            )));
                        }
                    }
                }
            }
        }

        Err(ClickshopError::LoopExhausted(self.max_tool_calls))
    }

    /// Dispatch one delegation to its worker, recording the delegation and
    /// its result. Worker calls run under the per-call deadline.
    async fn dispatch(
        &self,
        delegation: &Delegation,
        image: Option<&[u8]>,
        recorder: &ActivityRecorder,
    ) -> Result<WorkerReply> {
        recorder.record(
            ActivityEvent::new(
                ActivityKind::Delegation,
                format!("Delegating to {}", delegation.worker_name()),
            )
            .with_details(delegation_details(delegation, image))
            .with_worker(SUPERVISOR_NAME),
        );

        let start = Instant::now();
        let call = async {
            match delegation {
                Delegation::Search { query, limit } => match image {
                    Some(image) => self.search.image_search(image, *limit, recorder).await,
                    None => self.search.text_search(query, *limit, recorder).await,
                },
                Delegation::Product { product_id, size } => {
                    let id = ProductId::new(product_id.clone());
                    let status = self
                        .product
                        .check_inventory(&id, size.as_deref(), recorder)
                        .await?;
                    let details = self.product.get_details(&id, recorder).await?;

                    let message = if status.in_stock {
                        format!(
                            "{} is in stock ({} units available).",
                            details.name, status.units
                        )
                    } else {
                        format!("{} is currently out of stock.", details.name)
                    };
                    Ok(WorkerReply {
                        message,
                        products: Some(vec![ScoredProduct {
                            product: details,
                            similarity: None,
                            score: 0.0,
                        }]),
                        order: None,
                    })
                }
                Delegation::Order { customer_id, items } => {
                    let order = self.order.place(customer_id, items, recorder).await?;
                    let message = format!(
                        "Order {} confirmed. Total: ${}.",
                        order.order_id, order.total
                    );
                    Ok(WorkerReply {
                        message,
                        products: None,
                        order: Some(order),
                    })
                }
            }
        };

        let result = match tokio::time::timeout(self.call_deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(ClickshopError::StoreFailure(
                "tool call deadline exceeded".to_string(),
            )),
        };

        if let Ok(ref reply) = result {
            recorder.record(
                ActivityEvent::new(
                    ActivityKind::Result,
                    format!("{} completed", delegation.worker_name()),
                )
                .with_details(match &reply.products {
                    Some(products) => format!("Found {} products", products.len()),
                    None => reply.message.clone(),
                })
                .with_latency(start.elapsed().as_millis() as u64)
                .with_worker(delegation.worker_name()),
            );
        }

        result
    }
}

fn summarize(message: &str, image: Option<&[u8]>) -> String {
    let mut summary = format!("Message: {}", truncate(message, 100));
    if image.is_some() {
        summary.push_str(" [with image]");
    }
    summary
}

fn delegation_details(delegation: &Delegation, image: Option<&[u8]>) -> String {
    match delegation {
        Delegation::Search { query, .. } => {
            format!("Query: {}, Visual: {}", truncate(query, 80), image.is_some())
        }
        Delegation::Product { product_id, size } => match size {
            Some(size) => format!("Product: {}, Size: {}", product_id, size),
            None => format!("Product: {}", product_id),
        },
        Delegation::Order { customer_id, items } => {
            format!("Customer: {}, Items: {}", customer_id, items.len())
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
