//! SQL transport abstraction for the catalog store
//!
//! The store is spoken to through exactly one operation:
//! `execute(sql, params) -> rows`. Rows come back as JSON objects keyed by
//! column name so the direct connection and the mediated tool server share
//! one shape.

use crate::error::{ClickshopError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// One result row, keyed by column name
pub type Row = serde_json::Map<String, Value>;

/// Connection abstraction over the catalog store
#[async_trait]
pub trait SqlTransport: Send + Sync {
    /// Execute one parameterized SQL statement and return its rows
    /// (empty for statements that produce none).
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;
}

/// Direct transport over a libsql connection
pub struct DirectTransport {
    // The database handle must outlive the connection.
    _db: Arc<libsql::Database>,
    conn: libsql::Connection,
}

impl DirectTransport {
    /// Open a local database file (created if missing)
    pub async fn open(path: &str) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ClickshopError::StoreFailure(e.to_string()))?;
        let conn = db
            .connect()
            .map_err(|e| ClickshopError::StoreFailure(e.to_string()))?;

        Ok(Self {
            _db: Arc::new(db),
            conn,
        })
    }

    /// Open an in-memory database (tests and fixtures)
    pub async fn in_memory() -> Result<Self> {
        Self::open(":memory:").await
    }

    fn to_libsql_value(value: &Value) -> libsql::Value {
        match value {
            Value::Null => libsql::Value::Null,
            Value::Bool(b) => libsql::Value::Integer(*b as i64),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    libsql::Value::Integer(i)
                } else {
                    libsql::Value::Real(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => libsql::Value::Text(s.clone()),
            // Arrays and objects travel as JSON text (e.g. size lists,
            // vector literals for vector32()).
            other => libsql::Value::Text(other.to_string()),
        }
    }

    fn to_json_value(value: libsql::Value) -> Value {
        match value {
            libsql::Value::Null => Value::Null,
            libsql::Value::Integer(i) => Value::from(i),
            libsql::Value::Real(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            libsql::Value::Text(s) => Value::String(s),
            // Blobs (embedding columns) are never projected back out.
            libsql::Value::Blob(_) => Value::Null,
        }
    }
}

#[async_trait]
impl SqlTransport for DirectTransport {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        debug!("Executing SQL ({} params)", params.len());

        let libsql_params: Vec<libsql::Value> =
            params.iter().map(Self::to_libsql_value).collect();

        let mut rows = self
            .conn
            .query(sql, libsql::params_from_iter(libsql_params))
            .await
            .map_err(|e| ClickshopError::StoreFailure(e.to_string()))?;

        let column_count = rows.column_count();
        let column_names: Vec<String> = (0..column_count)
            .map(|i| {
                rows.column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("column_{}", i))
            })
            .collect();

        let mut result = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ClickshopError::StoreFailure(e.to_string()))?
        {
            let mut object = Row::new();
            for (i, name) in column_names.iter().enumerate() {
                let value = row
                    .get_value(i as i32)
                    .map_err(|e| ClickshopError::StoreFailure(e.to_string()))?;
                object.insert(name.clone(), Self::to_json_value(value));
            }
            result.push(object);
        }

        Ok(result)
    }
}
