use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::app::ports::{BlobStorePort, HttpClientPort};
use crate::app::write_blob;
use crate::error::{PipelineError, Result};
use crate::observability::metrics;
use crate::pipeline::event::StageEvent;
use crate::pipeline::keys::{timestamp_now, KeyLayout};

/// Result of one fetch invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOutcome {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
    pub products_count: usize,
    pub bucket: String,
    pub key: String,
    pub timestamp: String,
}

impl FetchOutcome {
    /// Event for the next stage
    pub fn next_event(&self) -> StageEvent {
        StageEvent::new(&self.bucket, &self.key)
    }
}

/// Pulls the catalog once and stores the response body verbatim
pub struct FetchUseCase {
    http: Arc<dyn HttpClientPort>,
    store: Arc<dyn BlobStorePort>,
    catalog_url: String,
    bucket: String,
    keys: KeyLayout,
}

impl FetchUseCase {
    pub fn new(
        http: Arc<dyn HttpClientPort>,
        store: Arc<dyn BlobStorePort>,
        catalog_url: impl Into<String>,
        bucket: impl Into<String>,
        keys: KeyLayout,
    ) -> Self {
        Self {
            http,
            store,
            catalog_url: catalog_url.into(),
            bucket: bucket.into(),
            keys,
        }
    }

    pub async fn run(&self) -> Result<FetchOutcome> {
        self.run_at(&timestamp_now()).await
    }

    /// Fetch and store under the raw key for `timestamp`
    pub async fn run_at(&self, timestamp: &str) -> Result<FetchOutcome> {
        let span = info_span!("fetch", invocation_id = %Uuid::new_v4());
        async {
            match self.fetch_and_store(timestamp).await {
                Ok(outcome) => {
                    info!(
                        status = "success",
                        products_count = outcome.products_count,
                        timestamp = %timestamp,
                        "Catalog stored at {}/{}",
                        outcome.bucket,
                        outcome.key
                    );
                    Ok(outcome)
                }
                Err(e) => {
                    error!(status = "error", error = %e, timestamp = %timestamp, "Catalog fetch failed");
                    metrics::invocation_fatal("fetch");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn fetch_and_store(&self, timestamp: &str) -> Result<FetchOutcome> {
        let response = match self.http.get(&self.catalog_url).await {
            Ok(response) => response,
            Err(e) => {
                metrics::fetch::request_error();
                return Err(e);
            }
        };

        if !response.is_success() {
            metrics::fetch::request_error();
            return Err(PipelineError::UpstreamStatus {
                status: response.status,
                url: self.catalog_url.clone(),
            });
        }
        metrics::fetch::request_success();
        metrics::fetch::payload_bytes(response.bytes.len());
        debug!(
            content_type = %response.content_type,
            bytes = response.bytes.len(),
            "Catalog response received from {}",
            self.catalog_url
        );

        // Parse only to check the shape; the stored body is the original bytes
        let data: Value = serde_json::from_slice(&response.bytes)?;
        let products_count = data
            .get("products")
            .and_then(Value::as_array)
            .map(Vec::len)
            .ok_or_else(|| PipelineError::InvalidBlob {
                key: self.catalog_url.clone(),
                message: "response has no 'products' array".to_string(),
            })?;

        let key = self.keys.raw_key(timestamp);
        write_blob(self.store.as_ref(), &self.bucket, &key, response.bytes).await?;
        metrics::fetch::products_fetched(products_count);

        Ok(FetchOutcome {
            status_code: 200,
            message: "success".to_string(),
            products_count,
            bucket: self.bucket.clone(),
            key,
            timestamp: timestamp.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::HttpGetResult;
    use crate::infra::in_memory_blob_store::InMemoryBlobStore;
    use async_trait::async_trait;

    struct StaticHttp {
        status: u16,
        body: &'static str,
    }

    #[async_trait]
    impl HttpClientPort for StaticHttp {
        async fn get(&self, _url: &str) -> Result<HttpGetResult> {
            Ok(HttpGetResult {
                status: self.status,
                bytes: self.body.as_bytes().to_vec(),
                content_type: "application/json".to_string(),
            })
        }
    }

    struct BrokenHttp;

    #[async_trait]
    impl HttpClientPort for BrokenHttp {
        async fn get(&self, url: &str) -> Result<HttpGetResult> {
            Err(PipelineError::Storage(format!("connection refused: {}", url)))
        }
    }

    fn use_case(http: Arc<dyn HttpClientPort>, store: Arc<InMemoryBlobStore>) -> FetchUseCase {
        FetchUseCase::new(http, store, "https://catalog.test/products", "bucket", KeyLayout::default())
    }

    #[tokio::test]
    async fn test_fetch_stores_body_verbatim() {
        let body = r#"{"products": [{"id": 1}, {"id": 2}], "total": 2, "skip": 0, "limit": 30}"#;
        let store = Arc::new(InMemoryBlobStore::new());
        let fetch = use_case(Arc::new(StaticHttp { status: 200, body }), store.clone());

        let outcome = fetch.run_at("2026-01-24T223451").await.unwrap();

        assert_eq!(outcome.status_code, 200);
        assert_eq!(outcome.products_count, 2);
        assert_eq!(outcome.key, "products-data-raw/products-2026-01-24T223451.json");
        assert_eq!(outcome.timestamp, "2026-01-24T223451");
        let stored = store.get("bucket", &outcome.key).await.unwrap();
        assert_eq!(stored, body.as_bytes());
    }

    #[tokio::test]
    async fn test_outcome_serializes_status_code_key() {
        let store = Arc::new(InMemoryBlobStore::new());
        let fetch = use_case(Arc::new(StaticHttp { status: 200, body: r#"{"products": []}"# }), store);
        let outcome = fetch.run_at("t").await.unwrap();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["products_count"], 0);
    }

    #[tokio::test]
    async fn test_failures_write_nothing() {
        let cases: Vec<Arc<dyn HttpClientPort>> = vec![
            Arc::new(BrokenHttp),
            Arc::new(StaticHttp { status: 503, body: "unavailable" }),
            Arc::new(StaticHttp { status: 200, body: "<html>not json</html>" }),
            Arc::new(StaticHttp { status: 200, body: r#"{"items": []}"# }),
        ];
        for http in cases {
            let store = Arc::new(InMemoryBlobStore::new());
            let fetch = use_case(http, store.clone());
            assert!(fetch.run_at("t").await.is_err());
            assert!(store.keys("bucket").is_empty());
        }
    }
}
