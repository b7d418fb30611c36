//! Adapters behind the application ports, and their construction from config.

pub mod completion_client;
pub mod fake_completion;
pub mod fs_blob_store;
pub mod http_blob_store;
pub mod http_client;
pub mod in_memory_blob_store;

use std::sync::Arc;
use tracing::info;

use crate::app::ports::{BlobStorePort, CompletionPort, HttpClientPort};
use crate::config::{InferenceBackend, InferenceConfig, PipelineConfig, StorageBackend, StorageConfig};
use crate::error::{InferenceError, PipelineError, Result};

use completion_client::HttpCompletionClient;
use fake_completion::FakeCompletionClient;
use fs_blob_store::FsBlobStore;
use http_blob_store::HttpBlobStore;
use http_client::ReqwestHttp;

/// Ports shared by every stage, built once per process. The completion
/// client is built separately since only enrichment needs one.
#[derive(Clone)]
pub struct Adapters {
    pub store: Arc<dyn BlobStorePort>,
    pub http: Arc<dyn HttpClientPort>,
}

impl Adapters {
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            store: create_blob_store(&config.storage)?,
            http: Arc::new(ReqwestHttp::new()?),
        })
    }
}

pub fn create_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStorePort>> {
    match config.backend {
        StorageBackend::Fs => {
            info!("Using filesystem blob store at {}", config.root.display());
            Ok(Arc::new(FsBlobStore::new(config.root.clone())))
        }
        StorageBackend::Http => {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| PipelineError::Config("storage.endpoint is required for the http backend".to_string()))?;
            info!("Using HTTP blob store at {}", endpoint);
            Ok(Arc::new(HttpBlobStore::new(endpoint, config.token.clone())))
        }
    }
}

pub fn create_completion_client(config: &InferenceConfig) -> Result<Arc<dyn CompletionPort>> {
    let client: Arc<dyn CompletionPort> = match config.backend {
        InferenceBackend::Fake => Arc::new(FakeCompletionClient::failing()),
        InferenceBackend::Http => {
            let endpoint = config.endpoint.clone().ok_or_else(|| {
                InferenceError::NotConfigured("inference.endpoint is required for the http backend".to_string())
            })?;
            Arc::new(HttpCompletionClient::new(endpoint, config.api_key.clone()))
        }
    };
    info!(backend = client.backend_name(), model = %config.model_id, "Completion backend ready");
    Ok(client)
}
