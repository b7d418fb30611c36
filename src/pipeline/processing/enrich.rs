use serde_json::{Map, Value};

use crate::constants::ANALYSIS_FAILED;
use crate::domain::{AnalysisOutcome, ProductAnalysis};

/// Build the classification prompt for one product
pub fn build_prompt(product: &Value) -> String {
    format!(
        "Analyze this product and return ONLY a JSON object, no other text:\n\
         {}\n\n\
         Return exactly this format:\n\
         {{\"is_good_deal\": true or false, \"price_category\": \"budget\" or \"mid-range\" or \"premium\", \"confidence\": number 0-1}}",
        product
    )
}

/// Remove markdown code fences the model sometimes wraps its JSON in
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse the completion text into an analysis, rejecting out-of-range confidence
pub fn parse_analysis(text: &str) -> Result<ProductAnalysis, String> {
    let cleaned = strip_code_fences(text);
    let analysis: ProductAnalysis =
        serde_json::from_str(&cleaned).map_err(|e| format!("malformed analysis JSON: {}", e))?;
    if !(0.0..=1.0).contains(&analysis.confidence) {
        return Err(format!("confidence {} outside [0, 1]", analysis.confidence));
    }
    Ok(analysis)
}

/// Merge the outcome into a copy of the product's fields.
/// An analysis adds its three fields; a failure adds only the `error` marker.
pub fn merge_outcome(product: &Map<String, Value>, outcome: &AnalysisOutcome) -> Value {
    let mut merged = product.clone();
    match outcome {
        AnalysisOutcome::Analyzed(analysis) => {
            merged.remove("error");
            merged.insert("is_good_deal".to_string(), Value::Bool(analysis.is_good_deal));
            merged.insert(
                "price_category".to_string(),
                serde_json::to_value(analysis.price_category).unwrap_or(Value::Null),
            );
            merged.insert("confidence".to_string(), Value::from(analysis.confidence));
        }
        AnalysisOutcome::Failed { .. } => {
            for field in ["is_good_deal", "price_category", "confidence"] {
                merged.remove(field);
            }
            merged.insert("error".to_string(), Value::String(ANALYSIS_FAILED.to_string()));
        }
    }
    Value::Object(merged)
}
