//! Core data types for the ClickShop core
//!
//! This module defines the fundamental data structures used throughout the
//! system: products and their closed category set, orders with exact money
//! arithmetic, and the per-turn request/result shapes exposed over RPC.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for products
///
/// Wraps a short opaque string to prevent mixing product ids with other
/// string-based identifiers in the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Closed catalog category set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Running Shoes")]
    RunningShoes,
    #[serde(rename = "Training Shoes")]
    TrainingShoes,
    #[serde(rename = "Fitness Equipment")]
    FitnessEquipment,
    #[serde(rename = "Apparel")]
    Apparel,
    #[serde(rename = "Accessories")]
    Accessories,
    #[serde(rename = "Recovery")]
    Recovery,
}

impl Category {
    /// All categories in declaration order
    pub const ALL: [Category; 6] = [
        Category::RunningShoes,
        Category::TrainingShoes,
        Category::FitnessEquipment,
        Category::Apparel,
        Category::Accessories,
        Category::Recovery,
    ];

    /// Display name as stored in the catalog
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::RunningShoes => "Running Shoes",
            Category::TrainingShoes => "Training Shoes",
            Category::FitnessEquipment => "Fitness Equipment",
            Category::Apparel => "Apparel",
            Category::Accessories => "Accessories",
            Category::Recovery => "Recovery",
        }
    }

    /// Parse a stored category name
    pub fn parse(s: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A catalog product
///
/// All products either carry an embedding of the system-wide dimension or
/// carry none and are excluded from semantic results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    pub brand: String,
    pub description: String,
    pub category: Category,
    pub price: Decimal,
    pub available_sizes: Vec<String>,
    pub inventory: i64,
    pub image_uri: String,

    /// Embedding vector (stored separately, never serialized to JSON)
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

/// A product as returned by retrieval, with its ranking scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredProduct {
    #[serde(flatten)]
    pub product: Product,

    /// Semantic similarity in [0, 1]; absent on lexical-only results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,

    /// Combined ranking score (internal)
    #[serde(skip)]
    pub score: f32,
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "failed" => Some(OrderStatus::Failed),
            _ => None,
        }
    }
}

/// One line of an order as requested by the customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraftItem {
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub quantity: i64,
}

/// One priced line of a placed order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl OrderItem {
    /// Line total rounded to two digits
    pub fn line_total(&self) -> Decimal {
        round_money(self.unit_price * Decimal::from(self.quantity))
    }
}

/// A placed order
///
/// Invariants: `subtotal = Σ unit_price·quantity`,
/// `total = subtotal + tax + shipping`, all rounded half-up to two digits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
}

/// Priced order breakdown without side effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderQuote {
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub free_shipping_applied: bool,
}

/// Inventory status for a product, optionally narrowed to one size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryStatus {
    pub product_id: ProductId,
    pub name: String,
    pub in_stock: bool,
    pub units: i64,
    pub sizes_available: Vec<String>,
}

/// Architecture phase of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Phase {
    /// Parser + lexical retrieval against the store, no agent loop
    Direct,
    /// Same retrieval semantics, database access through the tool server
    Mediated,
    /// Supervisor-driven agent loop with hybrid retrieval
    Agentic,
}

impl Phase {
    pub fn number(&self) -> u8 {
        match self {
            Phase::Direct => 1,
            Phase::Mediated => 2,
            Phase::Agentic => 3,
        }
    }
}

impl TryFrom<u8> for Phase {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Phase::Direct),
            2 => Ok(Phase::Mediated),
            3 => Ok(Phase::Agentic),
            other => Err(format!("Invalid phase: {}. Must be 1, 2, or 3.", other)),
        }
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> u8 {
        phase.number()
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Phase {}", self.number())
    }
}

/// A single conversational turn request
#[derive(Debug, Clone, Deserialize)]
pub struct TurnRequest {
    pub phase: Phase,
    #[serde(default)]
    pub message: Option<String>,
    /// Raw image bytes (the transport decodes base64 before handing off)
    #[serde(default, skip_deserializing)]
    pub image: Option<Vec<u8>>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl TurnRequest {
    pub fn text(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: Some(message.into()),
            image: None,
            customer_id: None,
            conversation_id: None,
        }
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }
}

/// The assembled result of one turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    pub turn_id: Uuid,
    pub reply_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<ScoredProduct>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    pub activity_trace: Vec<crate::activity::ActivityEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub follow_ups: Vec<String>,
}

/// Round a monetary amount half-up to two fractional digits
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
