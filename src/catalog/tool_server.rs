//! Mediated store transport via an in-process tool server
//!
//! Phase 2 routes all database access through a JSON-RPC 2.0 tool server
//! that exposes exactly two tools: `connect` and `run_query(sql, params)`.
//! The semantics match the direct transport; only the path differs, and the
//! activity trace reflects the mediation.

use super::transport::{Row, SqlTransport};
use crate::error::{ClickshopError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

const RPC_VERSION: &str = "2.0";

/// Request envelope on the tool-server wire (JSON-RPC 2.0)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Option<Value>,
}

impl ToolRequest {
    /// A `tools/call` request for one named tool
    pub fn tool_call(id: u64, tool: &str, arguments: Value) -> Self {
        Self {
            jsonrpc: RPC_VERSION.to_string(),
            method: "tools/call".to_string(),
            params: json!({ "name": tool, "arguments": arguments }),
            id: Some(json!(id)),
        }
    }
}

/// Everything this server can actually raise. Serialized with the standard
/// JSON-RPC reserved codes so generic clients can interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcFault {
    /// Malformed envelope or tool arguments
    BadRequest(String),
    /// Method outside `tools/list` / `tools/call`
    NoSuchMethod(String),
    /// The underlying SQL statement failed
    QueryFailed(String),
}

impl RpcFault {
    fn code(&self) -> i32 {
        match self {
            RpcFault::BadRequest(_) => -32602,
            RpcFault::NoSuchMethod(_) => -32601,
            RpcFault::QueryFailed(_) => -32000,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RpcFault::BadRequest(m) | RpcFault::NoSuchMethod(m) | RpcFault::QueryFailed(m) => m,
        }
    }
}

impl Serialize for RpcFault {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut wire = serializer.serialize_struct("RpcFault", 2)?;
        wire.serialize_field("code", &self.code())?;
        wire.serialize_field("message", self.message())?;
        wire.end()
    }
}

impl<'de> Deserialize<'de> for RpcFault {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Wire {
            code: i32,
            message: String,
        }

        let wire = Wire::deserialize(deserializer)?;
        Ok(match wire.code {
            -32601 => RpcFault::NoSuchMethod(wire.message),
            -32000 => RpcFault::QueryFailed(wire.message),
            _ => RpcFault::BadRequest(wire.message),
        })
    }
}

/// Response envelope: exactly one of `result` / `error` is present
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcFault>,
    pub id: Option<Value>,
}

impl ToolResponse {
    fn reply(id: Option<Value>, outcome: std::result::Result<Value, RpcFault>) -> Self {
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(fault) => (None, Some(fault)),
        };
        Self {
            jsonrpc: RPC_VERSION.to_string(),
            result,
            error,
            id,
        }
    }
}

/// Tool server exposing the store over `connect` / `run_query`
pub struct QueryToolServer {
    inner: Arc<dyn SqlTransport>,
}

impl QueryToolServer {
    pub fn new(inner: Arc<dyn SqlTransport>) -> Self {
        Self { inner }
    }

    /// Tool catalog in MCP shape
    pub fn list_tools(&self) -> Value {
        json!({
            "tools": [
                {
                    "name": "connect",
                    "description": "Open a session against the catalog database.",
                    "input_schema": { "type": "object", "properties": {} }
                },
                {
                    "name": "run_query",
                    "description": "Execute one parameterized SQL statement and return its rows.",
                    "input_schema": {
                        "type": "object",
                        "properties": {
                            "sql": { "type": "string" },
                            "params": { "type": "array" }
                        },
                        "required": ["sql"]
                    }
                }
            ]
        })
    }

    /// Process a single request
    pub async fn handle(&self, request: ToolRequest) -> ToolResponse {
        let id = request.id.clone();
        ToolResponse::reply(id, self.dispatch(request).await)
    }

    async fn dispatch(&self, request: ToolRequest) -> std::result::Result<Value, RpcFault> {
        if request.jsonrpc != RPC_VERSION {
            return Err(RpcFault::BadRequest(format!(
                "unsupported protocol version {:?}",
                request.jsonrpc
            )));
        }

        match request.method.as_str() {
            "tools/list" => Ok(self.list_tools()),
            "tools/call" => self.call_tool(&request.params).await,
            other => Err(RpcFault::NoSuchMethod(format!(
                "this server only speaks tools/list and tools/call, got {:?}",
                other
            ))),
        }
    }

    async fn call_tool(&self, params: &Value) -> std::result::Result<Value, RpcFault> {
        let tool = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcFault::BadRequest("tool call without a name".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        debug!("Tool server call: {}", tool);

        match tool {
            "connect" => Ok(json!({ "status": "connected", "database": "clickshop" })),
            "run_query" => {
                let sql = arguments.get("sql").and_then(Value::as_str).ok_or_else(|| {
                    RpcFault::BadRequest("run_query needs a sql argument".to_string())
                })?;
                let params: Vec<Value> = arguments
                    .get("params")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();

                let rows = self
                    .inner
                    .execute(sql, &params)
                    .await
                    .map_err(|e| RpcFault::QueryFailed(e.to_string()))?;
                Ok(json!({ "rows": rows, "row_count": rows.len() }))
            }
            other => Err(RpcFault::BadRequest(format!(
                "this server has no tool named {:?}",
                other
            ))),
        }
    }
}

/// Transport that round-trips every statement through the tool server
pub struct MediatedTransport {
    server: Arc<QueryToolServer>,
    connected: AtomicBool,
    next_id: AtomicU64,
}

impl MediatedTransport {
    pub fn new(server: Arc<QueryToolServer>) -> Self {
        Self {
            server,
            connected: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            return Ok(());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .server
            .handle(ToolRequest::tool_call(id, "connect", json!({})))
            .await;
        if let Some(fault) = response.error {
            return Err(ClickshopError::StoreFailure(fault.message().to_string()));
        }

        self.connected.store(true, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl SqlTransport for MediatedTransport {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.ensure_connected().await?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request =
            ToolRequest::tool_call(id, "run_query", json!({ "sql": sql, "params": params }));

        let response = self.server.handle(request).await;
        if let Some(fault) = response.error {
            return Err(ClickshopError::StoreFailure(fault.message().to_string()));
        }

        let result = response
            .result
            .ok_or_else(|| ClickshopError::StoreFailure("empty tool response".to_string()))?;
        let rows = result
            .get("rows")
            .and_then(Value::as_array)
            .ok_or_else(|| ClickshopError::StoreFailure("malformed tool response".to_string()))?;

        rows.iter()
            .map(|row| {
                row.as_object().cloned().ok_or_else(|| {
                    ClickshopError::StoreFailure("row is not an object".to_string())
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::transport::DirectTransport;

    async fn mediated() -> MediatedTransport {
        let direct = Arc::new(DirectTransport::in_memory().await.unwrap());
        MediatedTransport::new(Arc::new(QueryToolServer::new(direct)))
    }

    fn request(method: &str) -> ToolRequest {
        ToolRequest {
            jsonrpc: RPC_VERSION.to_string(),
            method: method.to_string(),
            params: json!({}),
            id: Some(json!(1)),
        }
    }

    #[tokio::test]
    async fn test_run_query_through_server() {
        let transport = mediated().await;

        transport
            .execute("CREATE TABLE t (id INTEGER, label TEXT)", &[])
            .await
            .unwrap();
        transport
            .execute(
                "INSERT INTO t VALUES (?, ?)",
                &[json!(7), json!("mediated")],
            )
            .await
            .unwrap();

        let rows = transport.execute("SELECT * FROM t", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["label"], json!("mediated"));
    }

    #[tokio::test]
    async fn test_tools_list() {
        let direct = Arc::new(DirectTransport::in_memory().await.unwrap());
        let server = QueryToolServer::new(direct);

        let response = server.handle(request("tools/list")).await;

        let tools = response.result.unwrap();
        let names: Vec<&str> = tools["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["connect", "run_query"]);
    }

    #[tokio::test]
    async fn test_sql_error_propagates() {
        let transport = mediated().await;
        let err = transport
            .execute("SELECT * FROM missing_table", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ClickshopError::StoreFailure(_)));
    }

    #[tokio::test]
    async fn test_unknown_method_rejected() {
        let direct = Arc::new(DirectTransport::in_memory().await.unwrap());
        let server = QueryToolServer::new(direct);

        let response = server.handle(request("tools/destroy")).await;
        assert!(matches!(
            response.error,
            Some(RpcFault::NoSuchMethod(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_tool_rejected() {
        let direct = Arc::new(DirectTransport::in_memory().await.unwrap());
        let server = QueryToolServer::new(direct);

        let response = server
            .handle(ToolRequest::tool_call(1, "drop_everything", json!({})))
            .await;
        assert!(matches!(response.error, Some(RpcFault::BadRequest(_))));
    }

    #[test]
    fn test_fault_wire_shape_roundtrips() {
        let fault = RpcFault::QueryFailed("no such table".to_string());
        let wire = serde_json::to_value(&fault).unwrap();
        assert_eq!(wire["code"], json!(-32000));
        assert_eq!(wire["message"], json!("no such table"));

        let back: RpcFault = serde_json::from_value(wire).unwrap();
        assert_eq!(back, fault);
    }
}
