use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::app::ports::BlobStorePort;
use crate::error::{PipelineError, Result};

/// Object store reached over HTTP: `PUT`/`GET {endpoint}/{bucket}/{key}`,
/// authenticated with an optional bearer token.
pub struct HttpBlobStore {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpBlobStore {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, bucket, key.trim_start_matches('/'))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

#[async_trait]
impl BlobStorePort for HttpBlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let url = self.object_url(bucket, key);
        let len = bytes.len();
        let resp = self
            .authorized(self.client.put(&url))
            .header("Content-Type", "application/json")
            .body(bytes)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Storage(format!("PUT {} failed: {} {}", url, status, text)));
        }
        debug!(bytes = len, "Uploaded {}", url);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let url = self.object_url(bucket, key);
        let resp = self.authorized(self.client.get(&url)).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(resp.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(PipelineError::BlobNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            s => Err(PipelineError::Storage(format!("GET {} failed: {}", url, s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url() {
        let store = HttpBlobStore::new("http://localhost:9000/storage/", None);
        assert_eq!(
            store.object_url("products-data", "products-data-raw/products-t.json"),
            "http://localhost:9000/storage/products-data/products-data-raw/products-t.json"
        );
        assert_eq!(store.object_url("b", "/k"), "http://localhost:9000/storage/b/k");
    }
}
