//! Fixture catalog covering all six categories
//!
//! Embeddings are one-hot axis vectors per category in a small test
//! dimension, so semantic distances are exact: 0 for a matching axis,
//! 1 for an orthogonal one.
#![allow(dead_code)]

use clickshop::{Category, Product, ProductId};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Test embedding dimension (also used by the fixture oracles)
pub const TEST_DIM: usize = 8;

/// Axis assigned to each category in the test embedding space
pub fn category_axis(category: Category) -> usize {
    match category {
        Category::RunningShoes => 0,
        Category::TrainingShoes => 1,
        Category::FitnessEquipment => 2,
        Category::Apparel => 3,
        Category::Accessories => 4,
        Category::Recovery => 5,
    }
}

/// Unit vector along one axis
pub fn axis_vector(axis: usize) -> Vec<f32> {
    let mut vector = vec![0.0_f32; TEST_DIM];
    vector[axis % TEST_DIM] = 1.0;
    vector
}

pub struct TestData;

impl TestData {
    /// The full fixture catalog
    pub fn all() -> Vec<Product> {
        vec![
            product(
                "SKU-001",
                "Nike Air Zoom Pegasus 41",
                "Nike",
                "Responsive daily trainer built for marathon training and long runs",
                Category::RunningShoes,
                "139.99",
                &["8", "9", "10", "11"],
                12,
            ),
            product(
                "SKU-002",
                "New Balance Fresh Foam X 1080v13",
                "New Balance",
                "Plush cushioned road running shoe for high mileage",
                Category::RunningShoes,
                "164.99",
                &["8", "9", "10"],
                8,
            ),
            product(
                "SKU-003",
                "Nike Vomero 18",
                "Nike",
                "Max cushioning for recovery runs and easy miles",
                Category::RunningShoes,
                "149.99",
                &["9", "10", "11"],
                5,
            ),
            product(
                "SKU-004",
                "Nike Metcon 9",
                "Nike",
                "Stable cross-training shoe for lifting and gym workouts",
                Category::TrainingShoes,
                "149.99",
                &["8", "9", "10", "11", "12"],
                10,
            ),
            product(
                "SKU-005",
                "Reebok Nano X4",
                "Reebok",
                "Versatile training shoe for functional fitness",
                Category::TrainingShoes,
                "139.99",
                &["9", "10", "11"],
                7,
            ),
            product(
                "SKU-006",
                "Puma Fuse 3.0",
                "Puma",
                "Flat stable trainer for strength sessions",
                Category::TrainingShoes,
                "109.99",
                &["8", "9", "10"],
                4,
            ),
            product(
                "SKU-007",
                "Bowflex SelectTech 552 Dumbbells",
                "Bowflex",
                "Adjustable dumbbells replacing 15 sets of weights",
                Category::FitnessEquipment,
                "549.99",
                &[],
                3,
            ),
            product(
                "SKU-008",
                "TRX PRO4 Suspension Trainer",
                "TRX",
                "Full-body suspension training system with anchors",
                Category::FitnessEquipment,
                "249.99",
                &[],
                6,
            ),
            product(
                "SKU-009",
                "Lululemon Metal Vent Tech Shirt",
                "Lululemon",
                "Breathable training shirt with anti-stink tech",
                Category::Apparel,
                "78.00",
                &["S", "M", "L", "XL"],
                20,
            ),
            product(
                "SKU-010",
                "Garmin Forerunner 265",
                "Garmin",
                "GPS running watch with training metrics",
                Category::Accessories,
                "449.99",
                &[],
                9,
            ),
            product(
                "SKU-011",
                "Hyperice Hypervolt 2",
                "Hyperice",
                "Percussion massage gun for muscle recovery",
                Category::Recovery,
                "199.00",
                &[],
                11,
            ),
            product(
                "SKU-012",
                "TriggerPoint GRID Foam Roller",
                "TriggerPoint",
                "Multi-density foam roller for deep tissue recovery",
                Category::Recovery,
                "36.99",
                &[],
                15,
            ),
        ]
    }

    /// One product kept without an embedding; it must never appear in
    /// semantic results.
    pub fn unembedded() -> Product {
        let mut p = product(
            "SKU-099",
            "Chirp Wheel",
            "Chirp",
            "Back rolling wheel, not yet embedded",
            Category::Recovery,
            "45.00",
            &[],
            2,
        );
        p.embedding = None;
        p
    }
}

#[allow(clippy::too_many_arguments)]
fn product(
    id: &str,
    name: &str,
    brand: &str,
    description: &str,
    category: Category,
    price: &str,
    sizes: &[&str],
    inventory: i64,
) -> Product {
    Product {
        product_id: ProductId::from(id),
        name: name.to_string(),
        brand: brand.to_string(),
        description: description.to_string(),
        category,
        price: Decimal::from_str(price).expect("fixture price"),
        available_sizes: sizes.iter().map(|s| s.to_string()).collect(),
        inventory,
        image_uri: format!("https://img.example.com/{}.jpg", id),
        embedding: Some(axis_vector(category_axis(category))),
    }
}
