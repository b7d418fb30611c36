use serde_json::{Map, Value};

use crate::domain::{FailedProduct, Product, ProductOutcome, Violation};

/// JSON type a field must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// JSON integer, or a float with no fractional part
    Integer,
    /// Any JSON number
    Number,
    /// JSON string; null is not a string
    Text,
}

impl FieldKind {
    fn type_rule(&self) -> &'static str {
        match self {
            FieldKind::Integer => "int_type",
            FieldKind::Number => "float_type",
            FieldKind::Text => "string_type",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            FieldKind::Integer => "a valid integer",
            FieldKind::Number => "a valid number",
            FieldKind::Text => "a valid string",
        }
    }
}

/// Numeric range constraint, checked only once the type check passed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    GreaterThan(f64),
    AtLeast(f64),
    AtMost(f64),
}

impl Bound {
    fn holds(&self, value: f64) -> bool {
        match *self {
            Bound::GreaterThan(limit) => value > limit,
            Bound::AtLeast(limit) => value >= limit,
            Bound::AtMost(limit) => value <= limit,
        }
    }

    fn rule(&self) -> &'static str {
        match self {
            Bound::GreaterThan(_) => "greater_than",
            Bound::AtLeast(_) => "greater_than_equal",
            Bound::AtMost(_) => "less_than_equal",
        }
    }

    fn describe(&self, field: &str) -> String {
        match self {
            Bound::GreaterThan(limit) => format!("{} must be greater than {}", field, limit),
            Bound::AtLeast(limit) => format!("{} must be greater than or equal to {}", field, limit),
            Bound::AtMost(limit) => format!("{} must be less than or equal to {}", field, limit),
        }
    }
}

/// One named entry of the contract: a required field, its kind and its bounds
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub field: &'static str,
    pub kind: FieldKind,
    pub bounds: Vec<Bound>,
}

impl FieldRule {
    pub fn required(field: &'static str, kind: FieldKind) -> Self {
        Self {
            field,
            kind,
            bounds: Vec::new(),
        }
    }

    pub fn with_bound(mut self, bound: Bound) -> Self {
        self.bounds.push(bound);
        self
    }

    /// Every violation of this rule by `record`, in bound order
    fn check(&self, record: &Map<String, Value>) -> Vec<Violation> {
        let Some(value) = record.get(self.field) else {
            return vec![Violation {
                field: self.field.to_string(),
                rule: "missing".to_string(),
                message: format!("{} is required", self.field),
            }];
        };

        let numeric = match self.kind {
            FieldKind::Integer => read_int(value).map(|v| Some(v as f64)),
            FieldKind::Number => value.as_f64().map(Some),
            FieldKind::Text => value.as_str().map(|_| None),
        };

        match numeric {
            None => vec![Violation {
                field: self.field.to_string(),
                rule: self.kind.type_rule().to_string(),
                message: format!("{} must be {}", self.field, self.kind.describe()),
            }],
            Some(None) => Vec::new(),
            Some(Some(number)) => self
                .bounds
                .iter()
                .filter(|bound| !bound.holds(number))
                .map(|bound| Violation {
                    field: self.field.to_string(),
                    rule: bound.rule().to_string(),
                    message: bound.describe(self.field),
                })
                .collect(),
        }
    }
}

/// Anything that can sort an untyped record into validated or failed
pub trait RecordValidator {
    fn check(&self, record: &Value) -> ProductOutcome;
}

/// The catalog product contract: an ordered rule table evaluated in full,
/// so a failed record reports every broken rule rather than the first.
#[derive(Debug, Clone)]
pub struct ProductContract {
    rules: Vec<FieldRule>,
}

impl Default for ProductContract {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductContract {
    pub fn new() -> Self {
        use FieldKind::*;
        Self {
            rules: vec![
                FieldRule::required("id", Integer),
                FieldRule::required("title", Text),
                FieldRule::required("description", Text),
                FieldRule::required("price", Number).with_bound(Bound::GreaterThan(0.0)),
                FieldRule::required("discountPercentage", Number)
                    .with_bound(Bound::AtLeast(0.0))
                    .with_bound(Bound::AtMost(100.0)),
                FieldRule::required("rating", Number)
                    .with_bound(Bound::AtLeast(0.0))
                    .with_bound(Bound::AtMost(5.0)),
                FieldRule::required("stock", Integer).with_bound(Bound::AtLeast(0.0)),
                FieldRule::required("brand", Text),
                FieldRule::required("category", Text),
                FieldRule::required("thumbnail", Text),
            ],
        }
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn violations(&self, record: &Value) -> Vec<Violation> {
        match record.as_object() {
            Some(fields) => self.rules.iter().flat_map(|rule| rule.check(fields)).collect(),
            None => vec![not_an_object()],
        }
    }
}

impl RecordValidator for ProductContract {
    fn check(&self, record: &Value) -> ProductOutcome {
        let errors = self.violations(record);
        if errors.is_empty() {
            if let Some(product) = record.as_object().and_then(build_product) {
                return ProductOutcome::Validated(product);
            }
        }
        let errors = if errors.is_empty() { vec![not_an_object()] } else { errors };
        ProductOutcome::Failed(FailedProduct {
            data: record.clone(),
            errors,
        })
    }
}

/// Percentage of failed records rounded to two decimals; 0 for an empty batch.
/// Ties round half to even on the exact binary value, so 1 of 32 (3.125) is 3.12.
pub fn failure_rate(failed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = failed as f64 / total as f64 * 100.0;
    format!("{:.2}", rate).parse().unwrap_or(rate)
}

fn not_an_object() -> Violation {
    Violation {
        field: "$".to_string(),
        rule: "object_type".to_string(),
        message: "product must be a JSON object with the contract fields".to_string(),
    }
}

fn read_int(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    let f = value.as_f64()?;
    if value.is_f64() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn build_product(record: &Map<String, Value>) -> Option<Product> {
    let int = |name: &str| record.get(name).and_then(read_int);
    let num = |name: &str| record.get(name).and_then(Value::as_f64);
    let text = |name: &str| record.get(name).and_then(Value::as_str).map(str::to_string);

    Some(Product {
        id: int("id")?,
        title: text("title")?,
        description: text("description")?,
        price: num("price")?,
        discount_percentage: num("discountPercentage")?,
        rating: num("rating")?,
        stock: int("stock")?,
        brand: text("brand")?,
        category: text("category")?,
        thumbnail: text("thumbnail")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_record() -> Value {
        json!({
            "id": 1,
            "title": "A",
            "description": "d",
            "price": 10.0,
            "discountPercentage": 5,
            "rating": 4.5,
            "stock": 3,
            "brand": "B",
            "category": "C",
            "thumbnail": "t"
        })
    }

    fn failed(outcome: ProductOutcome) -> FailedProduct {
        match outcome {
            ProductOutcome::Failed(failed) => failed,
            ProductOutcome::Validated(p) => panic!("expected failure, got {:?}", p),
        }
    }

    #[test]
    fn test_valid_record_is_reproduced() {
        let contract = ProductContract::new();
        match contract.check(&valid_record()) {
            ProductOutcome::Validated(product) => {
                assert_eq!(product.id, 1);
                assert_eq!(product.title, "A");
                assert_eq!(product.price, 10.0);
                assert_eq!(product.discount_percentage, 5.0);
                assert_eq!(product.rating, 4.5);
                assert_eq!(product.stock, 3);
                assert_eq!(product.thumbnail, "t");
            }
            other => panic!("expected validated, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_price_fails_on_price() {
        let mut record = valid_record();
        record["price"] = json!(0);
        let failed = failed(ProductContract::new().check(&record));
        assert_eq!(failed.errors.len(), 1);
        assert_eq!(failed.errors[0].field, "price");
        assert_eq!(failed.errors[0].rule, "greater_than");
        assert_eq!(failed.data, record);
    }

    #[test]
    fn test_all_violations_are_collected() {
        let record = json!({
            "id": "seven",
            "title": "A",
            "price": -5,
            "discountPercentage": 120,
            "rating": -1,
            "stock": 2.5,
            "brand": null,
            "category": "C",
            "thumbnail": "t"
        });
        let failed = failed(ProductContract::new().check(&record));
        let found: Vec<(&str, &str)> = failed
            .errors
            .iter()
            .map(|v| (v.field.as_str(), v.rule.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("id", "int_type"),
                ("description", "missing"),
                ("price", "greater_than"),
                ("discountPercentage", "less_than_equal"),
                ("rating", "greater_than_equal"),
                ("stock", "int_type"),
                ("brand", "string_type"),
            ]
        );
    }

    #[test]
    fn test_bounds_are_inclusive_where_specified() {
        let contract = ProductContract::new();
        let mut record = valid_record();
        record["discountPercentage"] = json!(100);
        record["rating"] = json!(0);
        record["stock"] = json!(0);
        assert!(matches!(contract.check(&record), ProductOutcome::Validated(_)));

        record["rating"] = json!(5.01);
        let failed = failed(contract.check(&record));
        assert_eq!(failed.errors[0].field, "rating");
        assert_eq!(failed.errors[0].rule, "less_than_equal");
    }

    #[test]
    fn test_integral_float_accepted_for_integer_fields() {
        let mut record = valid_record();
        record["id"] = json!(7.0);
        record["stock"] = json!(12.0);
        match ProductContract::new().check(&record) {
            ProductOutcome::Validated(product) => {
                assert_eq!(product.id, 7);
                assert_eq!(product.stock, 12);
            }
            other => panic!("expected validated, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_strings_are_rejected() {
        let mut record = valid_record();
        record["price"] = json!("10.0");
        let failed = failed(ProductContract::new().check(&record));
        assert_eq!(failed.errors[0].rule, "float_type");
    }

    #[test]
    fn test_non_object_record() {
        let failed = failed(ProductContract::new().check(&json!([1, 2, 3])));
        assert_eq!(failed.errors.len(), 1);
        assert_eq!(failed.errors[0].field, "$");
        assert_eq!(failed.errors[0].rule, "object_type");
    }

    #[test]
    fn test_extra_fields_do_not_fail_the_record() {
        let mut record = valid_record();
        record["tags"] = json!(["beauty"]);
        assert!(matches!(ProductContract::new().check(&record), ProductOutcome::Validated(_)));
    }

    #[test]
    fn test_rule_table_order() {
        let fields: Vec<&str> = ProductContract::new().rules().iter().map(|r| r.field).collect();
        assert_eq!(fields[0], "id");
        assert_eq!(fields.len(), 10);
    }

    #[test]
    fn test_failure_rate() {
        assert_eq!(failure_rate(0, 0), 0.0);
        assert_eq!(failure_rate(1, 3), 33.33);
        assert_eq!(failure_rate(2, 3), 66.67);
        assert_eq!(failure_rate(3, 3), 100.0);
    }

    #[test]
    fn test_failure_rate_ties_round_to_even() {
        assert_eq!(failure_rate(1, 32), 3.12);
        assert_eq!(failure_rate(5, 32), 15.62);
        assert_eq!(failure_rate(2, 64), 3.12);
        assert_eq!(failure_rate(3, 8), 37.5);
        assert_eq!(failure_rate(1, 8), 12.5);
    }
}
