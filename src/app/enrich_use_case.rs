use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::app::ports::{BlobStorePort, CompletionPort, CompletionRequest};
use crate::app::{product_id, read_products, write_blob};
use crate::config::InferenceConfig;
use crate::constants;
use crate::domain::AnalysisOutcome;
use crate::error::{PipelineError, Result};
use crate::observability::metrics;
use crate::pipeline::event::StageEvent;
use crate::pipeline::keys::{timestamp_now, KeyLayout};
use crate::pipeline::processing::enrich::{build_prompt, merge_outcome, parse_analysis};

/// Model and sampling parameters for the classification call
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            model_id: constants::DEFAULT_MODEL_ID.to_string(),
            temperature: constants::DEFAULT_TEMPERATURE,
            max_tokens: constants::DEFAULT_MAX_TOKENS,
        }
    }
}

impl From<&InferenceConfig> for AnalysisSettings {
    fn from(config: &InferenceConfig) -> Self {
        Self {
            model_id: config.model_id.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Result of one enrich invocation. Per-record failures are only visible
/// in the written blob and the logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichOutcome {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
    pub bucket: String,
    pub key: String,
    pub timestamp: String,
}

/// Classifies each validated product through the completion backend and
/// writes the merged records, one per input product, in input order.
pub struct EnrichUseCase {
    store: Arc<dyn BlobStorePort>,
    completion: Arc<dyn CompletionPort>,
    keys: KeyLayout,
    settings: AnalysisSettings,
}

impl EnrichUseCase {
    pub fn new(
        store: Arc<dyn BlobStorePort>,
        completion: Arc<dyn CompletionPort>,
        keys: KeyLayout,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            store,
            completion,
            keys,
            settings,
        }
    }

    /// Entry point for a raw event payload
    pub async fn handle(&self, payload: &Value) -> Result<EnrichOutcome> {
        match StageEvent::from_value(payload) {
            Ok(event) => self.run(&event).await,
            Err(e) => {
                error!(status = "error", error = %e, timestamp = %timestamp_now(), "Enrichment aborted");
                metrics::invocation_fatal("enrich");
                Err(e)
            }
        }
    }

    pub async fn run(&self, event: &StageEvent) -> Result<EnrichOutcome> {
        let span = info_span!("enrich", invocation_id = %Uuid::new_v4(), key = %event.key);
        async {
            let result = self.enrich_blob(event).await;
            if let Err(e) = &result {
                error!(status = "error", error = %e, timestamp = %timestamp_now(), "Enrichment aborted");
                metrics::invocation_fatal("enrich");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn enrich_blob(&self, event: &StageEvent) -> Result<EnrichOutcome> {
        let products = load_objects(read_products(self.store.as_ref(), &event.bucket, &event.key).await?, &event.key)?;

        let mut output = Vec::with_capacity(products.len());
        for product in &products {
            let outcome = self.analyze(product).await;
            output.push(merge_outcome(product, &outcome));
        }
        metrics::enrich::batch_processed();

        // Timestamp taken after the batch, so the key reflects completion time
        let timestamp = timestamp_now();
        let key = self.keys.analyzed_key(&timestamp);
        let body = serde_json::to_vec(&json!({ "products": output }))?;
        write_blob(self.store.as_ref(), &event.bucket, &key, body).await?;

        info!(
            status = "success",
            products = output.len(),
            timestamp = %timestamp,
            "Analysis completed, written to {}/{}",
            event.bucket,
            key
        );

        Ok(EnrichOutcome {
            status_code: 200,
            message: "Analysis completed.".to_string(),
            bucket: event.bucket.clone(),
            key,
            timestamp,
        })
    }

    /// Classify one product. Never fails: any problem becomes `AnalysisOutcome::Failed`.
    pub async fn analyze(&self, product: &Map<String, Value>) -> AnalysisOutcome {
        let record = Value::Object(product.clone());
        let request = CompletionRequest::single_prompt(
            &self.settings.model_id,
            build_prompt(&record),
            self.settings.temperature,
            self.settings.max_tokens,
        );

        let started = Instant::now();
        let completion = self.completion.complete(&request).await;
        metrics::enrich::completion_duration(started.elapsed().as_secs_f64());

        let outcome = match completion {
            Ok(text) => match parse_analysis(&text) {
                Ok(analysis) => AnalysisOutcome::Analyzed(analysis),
                Err(reason) => AnalysisOutcome::Failed { reason },
            },
            Err(e) => AnalysisOutcome::Failed { reason: e.to_string() },
        };

        match &outcome {
            AnalysisOutcome::Analyzed(_) => {
                metrics::enrich::record_analyzed();
                info!(event = "product_analyzed", id = %product_id(&record), result = "success", "Product analyzed");
            }
            AnalysisOutcome::Failed { reason } => {
                metrics::enrich::record_failed();
                warn!(
                    event = "product_analysis_failed",
                    id = %product_id(&record),
                    result = "failed",
                    error = %reason,
                    "Product analysis failed"
                );
            }
        }

        outcome
    }
}

/// Every product must be a JSON object to be merged; anything else aborts the batch
fn load_objects(products: Vec<Value>, key: &str) -> Result<Vec<Map<String, Value>>> {
    products
        .into_iter()
        .enumerate()
        .map(|(index, product)| match product {
            Value::Object(fields) => Ok(fields),
            _ => Err(PipelineError::InvalidBlob {
                key: key.to_string(),
                message: format!("product at index {} is not an object", index),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::fake_completion::FakeCompletionClient;
    use crate::infra::in_memory_blob_store::InMemoryBlobStore;

    const VALIDATED_KEY: &str = "products-data-structured/processed/products-2026-01-25T022611.json";

    fn product(id: i64) -> Value {
        json!({
            "id": id, "title": format!("Item {}", id), "description": "d", "price": 10.0,
            "discountPercentage": 5.0, "rating": 4.5, "stock": 3,
            "brand": "B", "category": "C", "thumbnail": "t"
        })
    }

    async fn seeded(products: Vec<Value>, completion: FakeCompletionClient) -> (Arc<InMemoryBlobStore>, EnrichUseCase) {
        let store = Arc::new(InMemoryBlobStore::new());
        store
            .put("bucket", VALIDATED_KEY, serde_json::to_vec(&json!({ "products": products })).unwrap())
            .await
            .unwrap();
        let use_case = EnrichUseCase::new(
            store.clone(),
            Arc::new(completion),
            KeyLayout::default(),
            AnalysisSettings::default(),
        );
        (store, use_case)
    }

    async fn written_products(store: &InMemoryBlobStore, outcome: &EnrichOutcome) -> Vec<Value> {
        let bytes = store.get(&outcome.bucket, &outcome.key).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        body["products"].as_array().unwrap().clone()
    }

    #[tokio::test]
    async fn test_failing_completion_marks_record() {
        let (store, enrich) = seeded(vec![product(1)], FakeCompletionClient::failing()).await;

        let outcome = enrich.run(&StageEvent::new("bucket", VALIDATED_KEY)).await.unwrap();

        assert_eq!(outcome.message, "Analysis completed.");
        assert!(outcome.key.starts_with("products-data-analyzed/analyzed/product-"));
        let mut expected = product(1);
        expected["error"] = json!("analysis_failed");
        assert_eq!(written_products(&store, &outcome).await, vec![expected]);
    }

    #[tokio::test]
    async fn test_mixed_responses_keep_order_and_length() {
        let completion = FakeCompletionClient::new()
            .then_respond("```json\n{\"is_good_deal\": true, \"price_category\": \"budget\", \"confidence\": 0.8}\n```")
            .then_respond("I think this is a premium product.")
            .then_fail("throttled")
            .then_respond(r#"{"is_good_deal": false, "price_category": "premium", "confidence": 0.4}"#);
        let (store, enrich) = seeded((1..=4).map(product).collect(), completion).await;

        let outcome = enrich.run(&StageEvent::new("bucket", VALIDATED_KEY)).await.unwrap();
        let written = written_products(&store, &outcome).await;

        assert_eq!(written.len(), 4);
        let ids: Vec<i64> = written.iter().map(|p| p["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        for record in &written {
            let has_error = record.get("error").is_some();
            let analysis_fields = ["is_good_deal", "price_category", "confidence"]
                .iter()
                .filter(|f| record.get(**f).is_some())
                .count();
            assert!(has_error != (analysis_fields == 3));
            assert!(analysis_fields == 0 || analysis_fields == 3);
        }
        assert_eq!(written[0]["price_category"], "budget");
        assert_eq!(written[1]["error"], "analysis_failed");
        assert_eq!(written[2]["error"], "analysis_failed");
        assert_eq!(written[3]["is_good_deal"], false);
    }

    #[tokio::test]
    async fn test_request_carries_settings_and_product() {
        let completion = Arc::new(FakeCompletionClient::new().with_default_response(
            r#"{"is_good_deal": true, "price_category": "mid-range", "confidence": 1}"#,
        ));
        let store = Arc::new(InMemoryBlobStore::new());
        let enrich = EnrichUseCase::new(store, completion.clone(), KeyLayout::default(), AnalysisSettings::default());

        let outcome = enrich.analyze(product(9).as_object().unwrap()).await;

        assert!(matches!(outcome, AnalysisOutcome::Analyzed(_)));
        let requests = completion.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model_id, "amazon.nova-lite-v1:0");
        assert_eq!(requests[0].max_tokens, 100);
        assert!(requests[0].messages[0].text.contains("Item 9"));
    }

    #[tokio::test]
    async fn test_empty_batch_still_writes_output() {
        let (store, enrich) = seeded(Vec::new(), FakeCompletionClient::failing()).await;
        let outcome = enrich.run(&StageEvent::new("bucket", VALIDATED_KEY)).await.unwrap();
        assert!(written_products(&store, &outcome).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_input_is_fatal() {
        let (store, enrich) = seeded(vec![product(1)], FakeCompletionClient::failing()).await;

        let missing = enrich.run(&StageEvent::new("bucket", "nope.json")).await;
        assert!(matches!(missing, Err(PipelineError::BlobNotFound { .. })));

        store.put("bucket", "scalars.json", br#"{"products": [1, 2]}"#.to_vec()).await.unwrap();
        let scalars = enrich.run(&StageEvent::new("bucket", "scalars.json")).await;
        assert!(matches!(scalars, Err(PipelineError::InvalidBlob { .. })));

        let bad_event = enrich.handle(&json!({"key": VALIDATED_KEY})).await;
        assert!(matches!(bad_event, Err(PipelineError::InvalidEvent(_))));

        // only the seeded and hand-written blobs exist
        assert_eq!(store.keys("bucket").len(), 2);
    }
}
