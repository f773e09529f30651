//! Product worker: details and inventory lookups
//!
//! Pure reads, idempotent. Both operations record the SQL they ran.

use super::{ToolSpec, PRODUCT_WORKER};
use crate::activity::{ActivityEvent, ActivityKind, ActivityRecorder};
use crate::catalog::CatalogStore;
use crate::error::{ClickshopError, Result};
use crate::types::{InventoryStatus, Product, ProductId};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Product worker
pub struct ProductWorker {
    store: Arc<CatalogStore>,
}

impl ProductWorker {
    pub fn new(store: Arc<CatalogStore>) -> Self {
        Self { store }
    }

    /// Full product record by id
    pub async fn get_details(
        &self,
        product_id: &ProductId,
        recorder: &ActivityRecorder,
    ) -> Result<Product> {
        let start = Instant::now();
        let product = self.store.get_product(product_id).await?;

        recorder.record(
            ActivityEvent::new(
                ActivityKind::Database,
                format!("Product details: {}", product_id),
            )
            .with_details(match &product {
                Some(p) => format!("Found: {}", p.name),
                None => "Not found".to_string(),
            })
            .with_sql("SELECT ... FROM products WHERE product_id = ?")
            .with_latency(start.elapsed().as_millis() as u64)
            .with_worker(PRODUCT_WORKER),
        );

        product.ok_or_else(|| ClickshopError::NotFound(format!("product {}", product_id)))
    }

    /// Inventory status, optionally narrowed to a size. When a size is
    /// given and the product carries a size list, being in stock also
    /// requires the size to be available.
    pub async fn check_inventory(
        &self,
        product_id: &ProductId,
        size: Option<&str>,
        recorder: &ActivityRecorder,
    ) -> Result<InventoryStatus> {
        let start = Instant::now();
        let mut status = self.store.inventory_of(product_id).await?;

        if let Some(size) = size {
            if !status.sizes_available.is_empty() {
                status.in_stock =
                    status.in_stock && status.sizes_available.iter().any(|s| s == size);
            }
        }

        recorder.record(
            ActivityEvent::new(
                ActivityKind::Inventory,
                match size {
                    Some(size) => format!("Inventory check: {} size {}", product_id, size),
                    None => format!("Inventory check: {}", product_id),
                },
            )
            .with_details(format!(
                "{} units, in stock: {}",
                status.units, status.in_stock
            ))
            .with_sql("SELECT ... FROM products WHERE product_id = ?")
            .with_latency(start.elapsed().as_millis() as u64)
            .with_worker(PRODUCT_WORKER),
        );

        Ok(status)
    }

    /// This worker's tool registry
    pub fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "get_details".to_string(),
                description: "Get the full product record by id.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "product_id": { "type": "string" }
                    },
                    "required": ["product_id"]
                }),
            },
            ToolSpec {
                name: "check_inventory".to_string(),
                description: "Check stock and available sizes for a product.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "product_id": { "type": "string" },
                        "size": { "type": "string" }
                    },
                    "required": ["product_id"]
                }),
            },
        ]
    }
}
