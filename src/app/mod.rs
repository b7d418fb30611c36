pub mod ports;
pub mod fetch_use_case;
pub mod validate_use_case;
pub mod enrich_use_case;

use serde_json::Value;
use tracing::debug;

use crate::app::ports::BlobStorePort;
use crate::error::{PipelineError, Result};
use crate::observability::metrics;

/// Write a blob, counting the outcome
pub(crate) async fn write_blob(store: &dyn BlobStorePort, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
    let len = bytes.len();
    match store.put(bucket, key, bytes).await {
        Ok(()) => {
            metrics::storage::write_success(len);
            debug!("Wrote {} bytes to {}/{}", len, bucket, key);
            Ok(())
        }
        Err(e) => {
            metrics::storage::write_error();
            Err(e)
        }
    }
}

/// Read a blob and split out its `products` list.
/// The blob must be a JSON object; a missing `products` field is an empty batch.
pub(crate) async fn read_products(store: &dyn BlobStorePort, bucket: &str, key: &str) -> Result<Vec<Value>> {
    let bytes = store.get(bucket, key).await?;
    let data: Value = serde_json::from_slice(&bytes)?;
    let invalid = |message: &str| PipelineError::InvalidBlob {
        key: key.to_string(),
        message: message.to_string(),
    };
    let Value::Object(mut fields) = data else {
        return Err(invalid("top-level JSON value is not an object"));
    };
    match fields.remove("products") {
        None => Ok(Vec::new()),
        Some(Value::Array(products)) => Ok(products),
        Some(_) => Err(invalid("'products' is not an array")),
    }
}

/// Product id for log lines, `unknown` when absent
pub(crate) fn product_id(record: &Value) -> String {
    record
        .get("id")
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
