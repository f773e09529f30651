//! Typed catalog operations over a SQL transport
//!
//! Owns the persisted schema: products (with an embedding vector column and
//! an FTS5 index over name/description), orders, order items, and the
//! inventory audit log. All access goes through the one-operation
//! `SqlTransport`, so the same code serves the direct connection and the
//! mediated tool server.

use super::transport::{Row, SqlTransport};
use crate::config::OrderConfig;
use crate::error::{ClickshopError, Result};
use crate::search::parser::{CategoryFilter, ParsedQuery};
use crate::types::{
    round_money, Category, InventoryStatus, Order, OrderDraftItem, OrderItem, OrderStatus,
    Product, ProductId,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Catalog store over a SQL transport
pub struct CatalogStore {
    transport: Arc<dyn SqlTransport>,
    embedding_dim: usize,
    // Serializes write transactions; the transport multiplexes a single
    // connection, so concurrent BEGINs would interleave without this.
    write_lock: Arc<Mutex<()>>,
}

impl CatalogStore {
    pub fn new(transport: Arc<dyn SqlTransport>, embedding_dim: usize) -> Self {
        Self {
            transport,
            embedding_dim,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// A store sharing another store's write lock. Used when two transports
    /// (direct and mediated) reach the same underlying database.
    pub fn with_shared_lock(
        transport: Arc<dyn SqlTransport>,
        embedding_dim: usize,
        other: &CatalogStore,
    ) -> Self {
        Self {
            transport,
            embedding_dim,
            write_lock: other.write_lock.clone(),
        }
    }

    pub fn transport(&self) -> Arc<dyn SqlTransport> {
        self.transport.clone()
    }

    /// Create tables, the FTS5 index with its sync triggers, and the vector
    /// index. Idempotent.
    pub async fn init_schema(&self) -> Result<()> {
        let statements = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS products (
                    product_id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    brand TEXT NOT NULL DEFAULT '',
                    description TEXT NOT NULL DEFAULT '',
                    category TEXT NOT NULL,
                    price TEXT NOT NULL,
                    available_sizes TEXT NOT NULL DEFAULT '[]',
                    inventory INTEGER NOT NULL DEFAULT 0,
                    image_uri TEXT NOT NULL DEFAULT '',
                    embedding F32_BLOB({})
                )
                "#,
                self.embedding_dim
            ),
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS products_fts USING fts5(
                name, description, content='products', content_rowid='rowid'
            )
            "#
            .to_string(),
            r#"
            CREATE TRIGGER IF NOT EXISTS products_fts_insert AFTER INSERT ON products BEGIN
                INSERT INTO products_fts(rowid, name, description)
                VALUES (new.rowid, new.name, new.description);
            END
            "#
            .to_string(),
            r#"
            CREATE TRIGGER IF NOT EXISTS products_fts_delete AFTER DELETE ON products BEGIN
                INSERT INTO products_fts(products_fts, rowid, name, description)
                VALUES ('delete', old.rowid, old.name, old.description);
            END
            "#
            .to_string(),
            r#"
            CREATE TRIGGER IF NOT EXISTS products_fts_update AFTER UPDATE ON products BEGIN
                INSERT INTO products_fts(products_fts, rowid, name, description)
                VALUES ('delete', old.rowid, old.name, old.description);
                INSERT INTO products_fts(rowid, name, description)
                VALUES (new.rowid, new.name, new.description);
            END
            "#
            .to_string(),
            r#"
            CREATE INDEX IF NOT EXISTS products_embedding_idx
            ON products (libsql_vector_idx(embedding))
            "#
            .to_string(),
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                order_id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL,
                subtotal TEXT NOT NULL,
                tax TEXT NOT NULL,
                shipping TEXT NOT NULL,
                total TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                estimated_delivery TEXT
            )
            "#
            .to_string(),
            r#"
            CREATE TABLE IF NOT EXISTS order_items (
                order_id TEXT NOT NULL REFERENCES orders(order_id),
                seq INTEGER NOT NULL,
                product_id TEXT NOT NULL REFERENCES products(product_id),
                name TEXT NOT NULL,
                size TEXT,
                quantity INTEGER NOT NULL,
                unit_price TEXT NOT NULL,
                PRIMARY KEY (order_id, seq)
            )
            "#
            .to_string(),
            r#"
            CREATE TABLE IF NOT EXISTS inventory_transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id TEXT NOT NULL,
                quantity_change INTEGER NOT NULL,
                quantity_after INTEGER NOT NULL,
                reason TEXT NOT NULL,
                order_id TEXT,
                created_at TEXT NOT NULL
            )
            "#
            .to_string(),
        ];

        for statement in &statements {
            self.transport.execute(statement, &[]).await?;
        }

        info!("Catalog schema initialized (dim: {})", self.embedding_dim);
        Ok(())
    }

    /// Insert or update a product, keeping the FTS index in sync via the
    /// update trigger.
    pub async fn upsert_product(&self, product: &Product) -> Result<()> {
        if let Some(ref embedding) = product.embedding {
            if embedding.len() != self.embedding_dim {
                return Err(ClickshopError::StoreFailure(format!(
                    "embedding dimension mismatch: expected {}, got {}",
                    self.embedding_dim,
                    embedding.len()
                )));
            }
        }

        let sizes = serde_json::to_string(&product.available_sizes)?;
        let embedding_json = product
            .embedding
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let sql = r#"
            INSERT INTO products
                (product_id, name, brand, description, category, price,
                 available_sizes, inventory, image_uri, embedding)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, vector32(?))
            ON CONFLICT(product_id) DO UPDATE SET
                name = excluded.name,
                brand = excluded.brand,
                description = excluded.description,
                category = excluded.category,
                price = excluded.price,
                available_sizes = excluded.available_sizes,
                inventory = excluded.inventory,
                image_uri = excluded.image_uri,
                embedding = excluded.embedding
        "#;
        let sql_no_embedding = sql.replace("vector32(?)", "NULL");

        let mut params = vec![
            json!(product.product_id.as_str()),
            json!(product.name),
            json!(product.brand),
            json!(product.description),
            json!(product.category.as_str()),
            json!(product.price.to_string()),
            json!(sizes),
            json!(product.inventory),
            json!(product.image_uri),
        ];

        match embedding_json {
            Some(vector) => {
                params.push(json!(vector));
                self.transport.execute(sql, &params).await?;
            }
            None => {
                self.transport.execute(&sql_no_embedding, &params).await?;
            }
        }

        Ok(())
    }

    /// Fetch one product by id
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let rows = self
            .transport
            .execute(
                &format!("SELECT {} FROM products WHERE product_id = ?", PRODUCT_COLUMNS),
                &[json!(product_id.as_str())],
            )
            .await?;

        rows.first().map(row_to_product).transpose()
    }

    /// ANN candidates: top-K products by cosine distance to the query vector.
    /// Only products with an embedding participate.
    pub async fn semantic_candidates(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<(ProductId, f64)>> {
        let vector_json = serde_json::to_string(query_vector)?;
        let rows = self
            .transport
            .execute(
                r#"
                SELECT product_id,
                       vector_distance_cos(embedding, vector32(?)) AS distance
                FROM products
                WHERE embedding IS NOT NULL
                ORDER BY distance ASC, product_id ASC
                LIMIT ?
                "#,
                &[json!(vector_json), json!(k as i64)],
            )
            .await?;

        rows.iter()
            .map(|row| {
                let id = require_str(row, "product_id")?;
                let distance = row
                    .get("distance")
                    .and_then(Value::as_f64)
                    .unwrap_or(f64::MAX);
                Ok((ProductId::new(id), distance))
            })
            .collect()
    }

    /// Full-text candidates: bm25 relevance of the cleaned text over
    /// name/description. Relevance is the negated FTS5 rank, so larger is
    /// better and 0 means no match.
    pub async fn lexical_candidates(
        &self,
        cleaned_text: &str,
        k: usize,
    ) -> Result<Vec<(ProductId, f64)>> {
        if cleaned_text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let fts_query = build_fts_query(cleaned_text);
        debug!("FTS query: {}", fts_query);

        let rows = self
            .transport
            .execute(
                r#"
                SELECT p.product_id AS product_id, -products_fts.rank AS relevance
                FROM products_fts
                JOIN products p ON p.rowid = products_fts.rowid
                WHERE products_fts MATCH ?
                ORDER BY products_fts.rank, p.product_id ASC
                LIMIT ?
                "#,
                &[json!(fts_query), json!(k as i64)],
            )
            .await?;

        rows.iter()
            .map(|row| {
                let id = require_str(row, "product_id")?;
                let relevance = row
                    .get("relevance")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0)
                    .max(0.0);
                Ok((ProductId::new(id), relevance))
            })
            .collect()
    }

    /// Lexical-only retrieval: parsed filters as hard constraints plus a
    /// case-insensitive substring match of the cleaned text against name
    /// and description. Ordering is left to the retriever.
    pub async fn filtered_products(
        &self,
        query: &ParsedQuery,
        limit: usize,
    ) -> Result<Vec<Product>> {
        let (mut clauses, mut params) = filter_clauses(query);

        if !query.cleaned_text.is_empty() {
            clauses.push("(name LIKE ? OR description LIKE ?)".to_string());
            let pattern = format!("%{}%", query.cleaned_text);
            params.push(json!(pattern));
            params.push(json!(pattern));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT {} FROM products {} ORDER BY product_id ASC LIMIT ?",
            PRODUCT_COLUMNS, where_sql
        );
        params.push(json!(limit as i64));

        let rows = self.transport.execute(&sql, &params).await?;
        rows.iter().map(row_to_product).collect()
    }

    /// Fetch products by id with the parsed filters applied as hard
    /// constraints. Used by the hybrid path after candidate selection.
    pub async fn products_by_ids_filtered(
        &self,
        ids: &[ProductId],
        query: &ParsedQuery,
    ) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let (clauses, filter_params) = filter_clauses(query);
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");

        let mut where_parts = vec![format!("product_id IN ({})", placeholders)];
        where_parts.extend(clauses);

        let sql = format!(
            "SELECT {} FROM products WHERE {}",
            PRODUCT_COLUMNS,
            where_parts.join(" AND ")
        );

        // Placeholder order: the id list binds first, then the filters
        let mut params: Vec<Value> = ids.iter().map(|id| json!(id.as_str())).collect();
        params.extend(filter_params);

        let rows = self.transport.execute(&sql, &params).await?;
        rows.iter().map(row_to_product).collect()
    }

    /// Inventory units and sizes for one product
    pub async fn inventory_of(&self, product_id: &ProductId) -> Result<InventoryStatus> {
        let product = self
            .get_product(product_id)
            .await?
            .ok_or_else(|| ClickshopError::NotFound(format!("product {}", product_id)))?;

        Ok(InventoryStatus {
            product_id: product.product_id,
            name: product.name,
            in_stock: product.inventory > 0,
            units: product.inventory,
            sizes_available: product.available_sizes,
        })
    }

    /// Place an order as one all-or-nothing transaction: validate every
    /// item, price against current stored prices, decrement inventory,
    /// write the audit rows, and insert the order with its items.
    pub async fn place_order(
        &self,
        customer_id: &str,
        items: &[OrderDraftItem],
        config: &OrderConfig,
    ) -> Result<Order> {
        if items.is_empty() {
            return Err(ClickshopError::MissingField("items".to_string()));
        }

        let _guard = self.write_lock.lock().await;
        self.transport.execute("BEGIN IMMEDIATE", &[]).await?;

        match self.place_order_inner(customer_id, items, config).await {
            Ok(order) => {
                self.transport.execute("COMMIT", &[]).await?;
                info!(
                    "Order {} confirmed for {} ({} items, total {})",
                    order.order_id,
                    customer_id,
                    order.items.len(),
                    order.total
                );
                Ok(order)
            }
            Err(e) => {
                let _ = self.transport.execute("ROLLBACK", &[]).await;
                Err(e)
            }
        }
    }

    async fn place_order_inner(
        &self,
        customer_id: &str,
        items: &[OrderDraftItem],
        config: &OrderConfig,
    ) -> Result<Order> {
        let mut priced_items = Vec::with_capacity(items.len());
        let mut subtotal = Decimal::ZERO;

        for item in items {
            let product = self
                .get_product(&item.product_id)
                .await?
                .ok_or_else(|| {
                    ClickshopError::NotFound(format!("product {}", item.product_id))
                })?;

            if item.quantity < 1 {
                return Err(ClickshopError::InvalidQuantity(item.quantity));
            }

            if product.inventory < item.quantity {
                return Err(ClickshopError::InsufficientInventory {
                    product_id: product.product_id.to_string(),
                    requested: item.quantity,
                    available: product.inventory,
                });
            }

            if let Some(ref size) = item.size {
                if !product.available_sizes.is_empty()
                    && !product.available_sizes.iter().any(|s| s == size)
                {
                    return Err(ClickshopError::NotFound(format!(
                        "size {} for product {}",
                        size, item.product_id
                    )));
                }
            }

            let line = OrderItem {
                product_id: product.product_id.clone(),
                name: product.name.clone(),
                size: item.size.clone(),
                quantity: item.quantity,
                unit_price: product.price,
            };
            subtotal += line.line_total();
            priced_items.push(line);
        }

        let subtotal = round_money(subtotal);
        let tax = round_money(subtotal * config.tax_rate);
        let shipping = if subtotal >= config.free_shipping_threshold {
            Decimal::ZERO
        } else {
            config.flat_shipping
        };
        let total = round_money(subtotal + tax + shipping);

        let order_id = format!("ORD-{}", &Uuid::new_v4().simple().to_string()[..8].to_uppercase());
        let created_at = Utc::now();
        let estimated_delivery = created_at + Duration::days(config.max_delivery_days);

        for (item, draft) in priced_items.iter().zip(items) {
            let updated = self
                .transport
                .execute(
                    r#"
                    UPDATE products
                    SET inventory = inventory - ?
                    WHERE product_id = ? AND inventory >= ?
                    RETURNING inventory
                    "#,
                    &[
                        json!(draft.quantity),
                        json!(item.product_id.as_str()),
                        json!(draft.quantity),
                    ],
                )
                .await?;

            let remaining = match updated.first().and_then(|r| r.get("inventory")) {
                Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
                // Inventory moved between the read and the decrement
                _ => {
                    let current = self
                        .get_product(&item.product_id)
                        .await?
                        .map(|p| p.inventory)
                        .unwrap_or(0);
                    return Err(ClickshopError::InsufficientInventory {
                        product_id: item.product_id.to_string(),
                        requested: draft.quantity,
                        available: current,
                    });
                }
            };

            self.transport
                .execute(
                    r#"
                    INSERT INTO inventory_transactions
                        (product_id, quantity_change, quantity_after, reason, order_id, created_at)
                    VALUES (?, ?, ?, 'sale', ?, ?)
                    "#,
                    &[
                        json!(item.product_id.as_str()),
                        json!(-draft.quantity),
                        json!(remaining),
                        json!(order_id),
                        json!(created_at.to_rfc3339()),
                    ],
                )
                .await?;
        }

        self.transport
            .execute(
                r#"
                INSERT INTO orders
                    (order_id, customer_id, subtotal, tax, shipping, total,
                     status, created_at, estimated_delivery)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                &[
                    json!(order_id),
                    json!(customer_id),
                    json!(subtotal.to_string()),
                    json!(tax.to_string()),
                    json!(shipping.to_string()),
                    json!(total.to_string()),
                    json!(OrderStatus::Confirmed.as_str()),
                    json!(created_at.to_rfc3339()),
                    json!(estimated_delivery.to_rfc3339()),
                ],
            )
            .await?;

        for (seq, item) in priced_items.iter().enumerate() {
            self.transport
                .execute(
                    r#"
                    INSERT INTO order_items
                        (order_id, seq, product_id, name, size, quantity, unit_price)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                    &[
                        json!(order_id),
                        json!(seq as i64),
                        json!(item.product_id.as_str()),
                        json!(item.name),
                        item.size.as_ref().map(|s| json!(s)).unwrap_or(Value::Null),
                        json!(item.quantity),
                        json!(item.unit_price.to_string()),
                    ],
                )
                .await?;
        }

        Ok(Order {
            order_id,
            customer_id: customer_id.to_string(),
            items: priced_items,
            subtotal,
            tax,
            shipping,
            total,
            status: OrderStatus::Confirmed,
            created_at,
            estimated_delivery: Some(estimated_delivery),
        })
    }

    /// Fetch a placed order with its items
    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        let rows = self
            .transport
            .execute(
                "SELECT * FROM orders WHERE order_id = ?",
                &[json!(order_id)],
            )
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| ClickshopError::NotFound(format!("order {}", order_id)))?;

        let item_rows = self
            .transport
            .execute(
                r#"
                SELECT product_id, name, size, quantity, unit_price
                FROM order_items
                WHERE order_id = ?
                ORDER BY seq ASC
                "#,
                &[json!(order_id)],
            )
            .await?;

        let items = item_rows
            .iter()
            .map(|r| {
                Ok(OrderItem {
                    product_id: ProductId::new(require_str(r, "product_id")?),
                    name: require_str(r, "name")?,
                    size: r.get("size").and_then(Value::as_str).map(String::from),
                    quantity: r.get("quantity").and_then(Value::as_i64).unwrap_or(0),
                    unit_price: parse_decimal(r, "unit_price")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Order {
            order_id: order_id.to_string(),
            customer_id: require_str(row, "customer_id")?,
            items,
            subtotal: parse_decimal(row, "subtotal")?,
            tax: parse_decimal(row, "tax")?,
            shipping: parse_decimal(row, "shipping")?,
            total: parse_decimal(row, "total")?,
            status: OrderStatus::parse(&require_str(row, "status")?)
                .unwrap_or(OrderStatus::Pending),
            created_at: parse_timestamp(row, "created_at")?,
            estimated_delivery: row
                .get("estimated_delivery")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }

    /// Total on-hand inventory across the catalog (used by conservation
    /// checks in tests and diagnostics).
    pub async fn total_inventory(&self) -> Result<i64> {
        let rows = self
            .transport
            .execute("SELECT COALESCE(SUM(inventory), 0) AS units FROM products", &[])
            .await?;
        Ok(rows
            .first()
            .and_then(|r| r.get("units"))
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }
}

const PRODUCT_COLUMNS: &str = "product_id, name, brand, description, category, price, \
                               available_sizes, inventory, image_uri";

/// Human-readable summary of the lexical search SQL for the activity trace
pub fn display_filter_sql(query: &ParsedQuery, limit: usize) -> String {
    let mut parts = Vec::new();
    if let Some(ref filter) = query.category {
        match filter {
            CategoryFilter::Single(c) => parts.push(format!("category = '{}'", c)),
            CategoryFilter::Shoes => parts.push(
                "category IN ('Running Shoes', 'Training Shoes')".to_string(),
            ),
        }
    }
    if let Some(ref brand) = query.brand {
        parts.push(format!("brand LIKE '{}'", brand));
    }
    if let Some(price) = query.price_max {
        parts.push(format!("price <= {}", price));
    }
    if !query.cleaned_text.is_empty() {
        parts.push(format!(
            "(name LIKE '%{}%' OR description LIKE '%{}%')",
            query.cleaned_text, query.cleaned_text
        ));
    }

    if parts.is_empty() {
        format!("SELECT ... FROM products LIMIT {}", limit)
    } else {
        format!(
            "SELECT ... FROM products WHERE {} LIMIT {}",
            parts.join(" AND "),
            limit
        )
    }
}

fn filter_clauses(query: &ParsedQuery) -> (Vec<String>, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    if let Some(ref filter) = query.category {
        match filter {
            CategoryFilter::Single(category) => {
                clauses.push("category = ?".to_string());
                params.push(json!(category.as_str()));
            }
            CategoryFilter::Shoes => {
                clauses.push("category IN (?, ?)".to_string());
                params.push(json!(Category::RunningShoes.as_str()));
                params.push(json!(Category::TrainingShoes.as_str()));
            }
        }
    }

    if let Some(ref brand) = query.brand {
        // SQLite LIKE is case-insensitive for ASCII, matching ILIKE semantics
        clauses.push("brand LIKE ?".to_string());
        params.push(json!(brand));
    }

    if let Some(price_max) = query.price_max {
        clauses.push("CAST(price AS REAL) <= ?".to_string());
        params.push(json!(price_max.to_string().parse::<f64>().unwrap_or(0.0)));
    }

    (clauses, params)
}

/// Escape one term for FTS5: wrap in double quotes so hyphens and other
/// operators are literal.
fn escape_fts5_term(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

/// Multi-word queries use OR logic so any matching term ranks the product
fn build_fts_query(text: &str) -> String {
    text.split_whitespace()
        .map(escape_fts5_term)
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn require_str(row: &Row, column: &str) -> Result<String> {
    row.get(column)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| ClickshopError::StoreFailure(format!("missing column: {}", column)))
}

fn parse_decimal(row: &Row, column: &str) -> Result<Decimal> {
    let raw = require_str(row, column)?;
    Decimal::from_str(&raw)
        .map_err(|e| ClickshopError::StoreFailure(format!("bad decimal in {}: {}", column, e)))
}

fn parse_timestamp(row: &Row, column: &str) -> Result<DateTime<Utc>> {
    let raw = require_str(row, column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ClickshopError::StoreFailure(format!("bad timestamp in {}: {}", column, e)))
}

fn row_to_product(row: &Row) -> Result<Product> {
    let category_name = require_str(row, "category")?;
    let category = Category::parse(&category_name).ok_or_else(|| {
        ClickshopError::StoreFailure(format!("unknown category: {}", category_name))
    })?;

    let sizes_json = require_str(row, "available_sizes")?;
    let available_sizes: Vec<String> = serde_json::from_str(&sizes_json).unwrap_or_default();

    Ok(Product {
        product_id: ProductId::new(require_str(row, "product_id")?),
        name: require_str(row, "name")?,
        brand: require_str(row, "brand")?,
        description: require_str(row, "description")?,
        category,
        price: parse_decimal(row, "price")?,
        available_sizes,
        inventory: row.get("inventory").and_then(Value::as_i64).unwrap_or(0),
        image_uri: require_str(row, "image_uri")?,
        embedding: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fts_query_escapes_terms() {
        assert_eq!(build_fts_query("running"), "\"running\"");
        assert_eq!(
            build_fts_query("trail running"),
            "\"trail\" OR \"running\""
        );
        assert_eq!(build_fts_query("x\"y"), "\"x\"\"y\"");
    }

    #[test]
    fn test_display_filter_sql() {
        let query = ParsedQuery {
            cleaned_text: String::new(),
            category: Some(CategoryFilter::Single(Category::RunningShoes)),
            brand: None,
            price_max: Some(Decimal::new(15000, 2)),
        };
        let sql = display_filter_sql(&query, 5);
        assert!(sql.contains("category = 'Running Shoes'"));
        assert!(sql.contains("price <= 150.00"));
        assert!(sql.contains("LIMIT 5"));
    }
}
