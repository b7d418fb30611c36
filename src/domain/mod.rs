use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A catalog product that satisfied every field rule of the product contract.
/// Serializes with the source API's field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: f64,
    #[serde(rename = "discountPercentage")]
    pub discount_percentage: f64,
    pub rating: f64,
    pub stock: i64,
    // Some source records carry a null brand; the contract still requires one.
    pub brand: String,
    pub category: String,
    pub thumbnail: String,
}

/// One broken field rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Field name, or `$` when the record itself is malformed
    pub field: String,
    /// Stable rule identifier, e.g. `greater_than`
    pub rule: String,
    /// Human-readable description
    pub message: String,
}

/// A record rejected by the contract, kept verbatim with every violation found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedProduct {
    pub data: Value,
    pub errors: Vec<Violation>,
}

/// Outcome of checking one untyped record against the contract
#[derive(Debug, Clone, PartialEq)]
pub enum ProductOutcome {
    Validated(Product),
    Failed(FailedProduct),
}

/// Body of the validated blob: `{"products": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductBatch {
    pub products: Vec<Product>,
}

/// Body of the failed blob: `{"failed_products": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedProductBatch {
    pub failed_products: Vec<FailedProduct>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceCategory {
    Budget,
    MidRange,
    Premium,
}

/// Classification returned by the completion backend for one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAnalysis {
    pub is_good_deal: bool,
    pub price_category: PriceCategory,
    pub confidence: f64,
}

/// Outcome of enriching one product
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Analyzed(ProductAnalysis),
    Failed { reason: String },
}
