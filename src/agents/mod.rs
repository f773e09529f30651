//! Supervisor and specialized workers
//!
//! Three workers own one concern each (search, product, order) and expose
//! their operations as a typed tool registry. The supervisor holds no
//! direct store access and operates purely through delegation; the closed
//! delegation set is modeled as a tagged variant the LLM oracle produces
//! via structured output.

pub mod order_agent;
pub mod product_agent;
pub mod search_agent;
pub mod supervisor;

pub use order_agent::OrderWorker;
pub use product_agent::ProductWorker;
pub use search_agent::SearchWorker;
pub use supervisor::{RoutingTable, Supervisor, SupervisorOutcome, WorkerKind};

use crate::error::{ClickshopError, Result};
use crate::types::OrderDraftItem;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Worker names as they appear in activity traces
pub const SUPERVISOR_NAME: &str = "SupervisorAgent";
pub const SEARCH_WORKER: &str = "SearchAgent";
pub const PRODUCT_WORKER: &str = "ProductAgent";
pub const ORDER_WORKER: &str = "OrderAgent";

/// Tool schema entry in a worker's registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name (e.g. "delegate_search")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,
}

/// Structured result a worker hands back to the supervisor
#[derive(Debug, Clone, Serialize)]
pub struct WorkerReply {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<crate::types::ScoredProduct>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<crate::types::Order>,
}

impl WorkerReply {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            products: None,
            order: None,
        }
    }
}

/// Closed set of supervisor delegations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "delegation", rename_all = "snake_case")]
pub enum Delegation {
    /// Delegate to the search worker
    Search {
        query: String,
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Delegate to the product worker
    Product {
        product_id: String,
        #[serde(default)]
        size: Option<String>,
    },

    /// Delegate to the order worker
    Order {
        customer_id: String,
        items: Vec<OrderDraftItem>,
    },
}

impl Delegation {
    /// The tool name the oracle invokes to produce this delegation
    pub fn tool_name(&self) -> &'static str {
        match self {
            Delegation::Search { .. } => "delegate_search",
            Delegation::Product { .. } => "delegate_product",
            Delegation::Order { .. } => "delegate_order",
        }
    }

    /// Worker this delegation dispatches to
    pub fn worker_name(&self) -> &'static str {
        match self {
            Delegation::Search { .. } => SEARCH_WORKER,
            Delegation::Product { .. } => PRODUCT_WORKER,
            Delegation::Order { .. } => ORDER_WORKER,
        }
    }

    /// Build a delegation from an oracle tool invocation
    pub fn from_tool_call(name: &str, input: Value) -> Result<Delegation> {
        match name {
            "delegate_search" => {
                let query = input
                    .get("query")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ClickshopError::MissingField("query".to_string()))?
                    .to_string();
                let limit = input
                    .get("limit")
                    .and_then(Value::as_u64)
                    .map(|l| l as usize);
                Ok(Delegation::Search { query, limit })
            }
            "delegate_product" => {
                let product_id = input
                    .get("product_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ClickshopError::MissingField("product_id".to_string()))?
                    .to_string();
                let size = input
                    .get("size")
                    .and_then(Value::as_str)
                    .map(String::from);
                Ok(Delegation::Product { product_id, size })
            }
            "delegate_order" => {
                let customer_id = input
                    .get("customer_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ClickshopError::MissingField("customer_id".to_string()))?
                    .to_string();
                let items: Vec<OrderDraftItem> = serde_json::from_value(
                    input
                        .get("items")
                        .cloned()
                        .ok_or_else(|| ClickshopError::MissingField("items".to_string()))?,
                )?;
                Ok(Delegation::Order { customer_id, items })
            }
            other => Err(ClickshopError::LlmFailure(format!(
                "unknown tool: {}",
                other
            ))),
        }
    }

    /// The supervisor's tool catalog, consumed uniformly by the oracle
    pub fn tool_specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "delegate_search".to_string(),
                description: "Find products via semantic text search or visual image search."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Natural language search query"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of results",
                            "default": 5
                        }
                    },
                    "required": ["query"]
                }),
            },
            ToolSpec {
                name: "delegate_product".to_string(),
                description: "Get product details and check inventory by product id.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "product_id": {
                            "type": "string",
                            "description": "Product identifier"
                        },
                        "size": {
                            "type": "string",
                            "description": "Optional size for the inventory check"
                        }
                    },
                    "required": ["product_id"]
                }),
            },
            ToolSpec {
                name: "delegate_order".to_string(),
                description: "Price and place an order for a customer.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "customer_id": {
                            "type": "string",
                            "description": "Customer identifier"
                        },
                        "items": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "product_id": { "type": "string" },
                                    "size": { "type": "string" },
                                    "quantity": { "type": "integer", "minimum": 1 }
                                },
                                "required": ["product_id", "quantity"]
                            }
                        }
                    },
                    "required": ["customer_id", "items"]
                }),
            },
        ]
    }
}
