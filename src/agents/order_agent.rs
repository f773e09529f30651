//! Order worker: pricing and atomic order placement
//!
//! `quote` prices a basket against current stored prices without side
//! effects; `place` runs the all-or-nothing transaction that validates
//! inventory, decrements it, and persists the order.

use super::{ToolSpec, ORDER_WORKER};
use crate::activity::{ActivityEvent, ActivityKind, ActivityRecorder};
use crate::catalog::CatalogStore;
use crate::config::OrderConfig;
use crate::error::{ClickshopError, Result};
use crate::types::{round_money, Order, OrderDraftItem, OrderItem, OrderQuote};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Order worker
pub struct OrderWorker {
    store: Arc<CatalogStore>,
    config: OrderConfig,
}

impl OrderWorker {
    pub fn new(store: Arc<CatalogStore>, config: OrderConfig) -> Self {
        Self { store, config }
    }

    /// Price a basket against current stored prices. Read-only.
    pub async fn quote(
        &self,
        items: &[OrderDraftItem],
        recorder: &ActivityRecorder,
    ) -> Result<OrderQuote> {
        if items.is_empty() {
            return Err(ClickshopError::MissingField("items".to_string()));
        }

        let start = Instant::now();
        let mut priced = Vec::with_capacity(items.len());
        let mut subtotal = Decimal::ZERO;

        for item in items {
            if item.quantity < 1 {
                return Err(ClickshopError::InvalidQuantity(item.quantity));
            }

            let product = self
                .store
                .get_product(&item.product_id)
                .await?
                .ok_or_else(|| {
                    ClickshopError::NotFound(format!("product {}", item.product_id))
                })?;

            let line = OrderItem {
                product_id: product.product_id,
                name: product.name,
                size: item.size.clone(),
                quantity: item.quantity,
                unit_price: product.price,
            };
            subtotal += line.line_total();
            priced.push(line);
        }

        let subtotal = round_money(subtotal);
        let tax = round_money(subtotal * self.config.tax_rate);
        let free_shipping = subtotal >= self.config.free_shipping_threshold;
        let shipping = if free_shipping {
            Decimal::ZERO
        } else {
            self.config.flat_shipping
        };
        let total = round_money(subtotal + tax + shipping);

        recorder.record(
            ActivityEvent::new(
                ActivityKind::Order,
                format!("Calculate total for {} items", items.len()),
            )
            .with_details(format!("Subtotal: ${}, Total: ${}", subtotal, total))
            .with_latency(start.elapsed().as_millis() as u64)
            .with_worker(ORDER_WORKER),
        );

        Ok(OrderQuote {
            items: priced,
            subtotal,
            tax,
            shipping,
            total,
            free_shipping_applied: free_shipping,
        })
    }

    /// Place an order: one logical transaction that locks the product rows,
    /// validates quantities and inventory, prices against current prices,
    /// decrements stock, and inserts the confirmed order.
    pub async fn place(
        &self,
        customer_id: &str,
        items: &[OrderDraftItem],
        recorder: &ActivityRecorder,
    ) -> Result<Order> {
        let start = Instant::now();
        let result = self
            .store
            .place_order(customer_id, items, &self.config)
            .await;
        let latency = start.elapsed().as_millis() as u64;

        match &result {
            Ok(order) => {
                recorder.record(
                    ActivityEvent::new(
                        ActivityKind::Inventory,
                        format!("Inventory reserved for {} items", order.items.len()),
                    )
                    .with_sql("UPDATE products SET inventory = inventory - ? WHERE product_id = ?")
                    .with_worker(ORDER_WORKER),
                );
                recorder.record(
                    ActivityEvent::new(
                        ActivityKind::Order,
                        format!("Order processed: {}", order.order_id),
                    )
                    .with_details(format!(
                        "Customer: {}, Total: ${}",
                        customer_id, order.total
                    ))
                    .with_sql("INSERT INTO orders ...; INSERT INTO order_items ...")
                    .with_latency(latency)
                    .with_worker(ORDER_WORKER),
                );
            }
            Err(e) => {
                recorder.record(
                    ActivityEvent::new(ActivityKind::Error, "Order rejected")
                        .with_details(e.to_string())
                        .with_latency(latency)
                        .with_worker(ORDER_WORKER),
                );
            }
        }

        result
    }

    /// This worker's tool registry
    pub fn tools(&self) -> Vec<ToolSpec> {
        let item_schema = json!({
            "type": "object",
            "properties": {
                "product_id": { "type": "string" },
                "size": { "type": "string" },
                "quantity": { "type": "integer", "minimum": 1 }
            },
            "required": ["product_id", "quantity"]
        });

        vec![
            ToolSpec {
                name: "quote".to_string(),
                description: "Price a basket including tax and shipping, without ordering."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": { "items": { "type": "array", "items": item_schema } },
                    "required": ["items"]
                }),
            },
            ToolSpec {
                name: "place".to_string(),
                description: "Reserve inventory and persist a confirmed order.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "customer_id": { "type": "string" },
                        "items": { "type": "array", "items": item_schema }
                    },
                    "required": ["customer_id", "items"]
                }),
            },
        ]
    }
}
