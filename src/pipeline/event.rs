use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result};

/// Invocation payload for the validate and enrich stages.
/// Extra fields (e.g. a forwarded `timestamp`) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEvent {
    pub bucket: String,
    pub key: String,
}

impl StageEvent {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Resolve the source location from a raw event payload
    pub fn from_value(event: &Value) -> Result<Self> {
        let field = |name: &str| -> Result<String> {
            match event.get(name) {
                Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
                Some(Value::String(_)) => Err(PipelineError::InvalidEvent(format!("'{}' is empty", name))),
                Some(other) => Err(PipelineError::InvalidEvent(format!(
                    "'{}' must be a string, got {}",
                    name, other
                ))),
                None => Err(PipelineError::InvalidEvent(format!("missing '{}'", name))),
            }
        };
        let bucket = field("bucket")?;
        let key = field("key")?;
        // Output keys reuse the source filename, so the key must name one
        if key.ends_with('/') {
            return Err(PipelineError::InvalidEvent(format!("'key' names a folder, not a file: {}", key)));
        }
        Ok(Self { bucket, key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_with_extra_fields() {
        let event = StageEvent::from_value(&json!({
            "bucket": "products-data",
            "key": "products-data-raw/products-2026-01-24T223451.json",
            "timestamp": "2026-01-24T223451"
        }))
        .unwrap();
        assert_eq!(event, StageEvent::new("products-data", "products-data-raw/products-2026-01-24T223451.json"));
    }

    #[test]
    fn test_missing_and_mistyped_fields() {
        assert!(matches!(
            StageEvent::from_value(&json!({"bucket": "b"})),
            Err(PipelineError::InvalidEvent(_))
        ));
        assert!(matches!(
            StageEvent::from_value(&json!({"bucket": "b", "key": 7})),
            Err(PipelineError::InvalidEvent(_))
        ));
        assert!(matches!(
            StageEvent::from_value(&json!({"bucket": "", "key": "k"})),
            Err(PipelineError::InvalidEvent(_))
        ));
        assert!(matches!(StageEvent::from_value(&json!(null)), Err(PipelineError::InvalidEvent(_))));
    }

    #[test]
    fn test_folder_key_rejected() {
        let result = StageEvent::from_value(&json!({"bucket": "products-data", "key": "products-data-raw/"}));
        assert!(matches!(result, Err(PipelineError::InvalidEvent(_))));
    }
}
