use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::app::ports::BlobStorePort;
use crate::app::{product_id, read_products, write_blob};
use crate::domain::{FailedProduct, FailedProductBatch, Product, ProductBatch, ProductOutcome};
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::event::StageEvent;
use crate::pipeline::keys::{filename_of, timestamp_now, KeyLayout};
use crate::pipeline::processing::contract::{failure_rate, ProductContract, RecordValidator};

/// Counts for one validation batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub validated_count: usize,
    pub failed_count: usize,
    pub failure_rate: f64,
}

impl ValidationSummary {
    pub fn new(validated_count: usize, failed_count: usize) -> Self {
        let total = validated_count + failed_count;
        Self {
            total,
            validated_count,
            failed_count,
            failure_rate: failure_rate(failed_count, total),
        }
    }
}

/// Result of one validate invocation. `key` is where validated products go
/// and is reported even when the batch had none to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateOutcome {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
    pub bucket: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failed_key: Option<String>,
    #[serde(flatten)]
    pub summary: ValidationSummary,
    pub timestamp: String,
}

impl ValidateOutcome {
    pub fn next_event(&self) -> StageEvent {
        StageEvent::new(&self.bucket, &self.key)
    }
}

/// Records sorted into the two output sets, in input order
#[derive(Debug, Default)]
pub struct Partition {
    pub validated: Vec<Product>,
    pub failed: Vec<FailedProduct>,
}

/// Applies the product contract to a raw catalog blob and writes the
/// validated and failed sets to their structured keys.
pub struct ValidateUseCase {
    store: Arc<dyn BlobStorePort>,
    validator: Box<dyn RecordValidator + Send + Sync>,
    keys: KeyLayout,
}

impl ValidateUseCase {
    pub fn new(
        store: Arc<dyn BlobStorePort>,
        validator: Box<dyn RecordValidator + Send + Sync>,
        keys: KeyLayout,
    ) -> Self {
        Self { store, validator, keys }
    }

    /// Create a use case with the catalog product contract
    pub fn with_product_contract(store: Arc<dyn BlobStorePort>, keys: KeyLayout) -> Self {
        Self::new(store, Box::new(ProductContract::new()), keys)
    }

    /// Entry point for a raw event payload
    pub async fn handle(&self, payload: &Value) -> Result<ValidateOutcome> {
        match StageEvent::from_value(payload) {
            Ok(event) => self.run(&event).await,
            Err(e) => {
                error!(
                    status = "error",
                    error = %format!("Failed to parse event: {}", e),
                    timestamp = %timestamp_now(),
                    "Validation aborted"
                );
                metrics::invocation_fatal("validate");
                Err(e)
            }
        }
    }

    pub async fn run(&self, event: &StageEvent) -> Result<ValidateOutcome> {
        let span = info_span!("validate", invocation_id = %Uuid::new_v4(), key = %event.key);
        let timestamp = timestamp_now();
        async {
            let products = match read_products(self.store.as_ref(), &event.bucket, &event.key).await {
                Ok(products) => products,
                Err(e) => {
                    error!(
                        status = "error",
                        error = %format!("Failed to parse event: {}", e),
                        timestamp = %timestamp,
                        "Validation aborted"
                    );
                    metrics::invocation_fatal("validate");
                    return Err(e);
                }
            };

            let partition = self.partition(&products);
            match self.write_partition(event, partition, &timestamp).await {
                Ok(outcome) => Ok(outcome),
                Err(e) => {
                    error!(status = "error", error = %e, timestamp = %timestamp, "Validation output write failed");
                    metrics::invocation_fatal("validate");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Check every record; failures are collected, never raised
    pub fn partition(&self, products: &[Value]) -> Partition {
        let mut partition = Partition::default();

        for record in products {
            match self.validator.check(record) {
                ProductOutcome::Validated(product) => {
                    metrics::validate::record_validated();
                    partition.validated.push(product);
                }
                ProductOutcome::Failed(failed) => {
                    warn!(
                        status = "validation_failed",
                        product_id = %product_id(record),
                        reason = %serde_json::to_string(&failed.errors).unwrap_or_default(),
                        "Product failed validation"
                    );
                    metrics::validate::record_failed(&failed.errors);
                    partition.failed.push(failed);
                }
            }
        }

        partition
    }

    async fn write_partition(&self, event: &StageEvent, partition: Partition, timestamp: &str) -> Result<ValidateOutcome> {
        let filename = filename_of(&event.key);
        let processed_key = self.keys.processed_key(filename);
        let failed_key = self.keys.failed_key(filename);
        let summary = ValidationSummary::new(partition.validated.len(), partition.failed.len());

        if !partition.validated.is_empty() {
            let body = serde_json::to_vec(&ProductBatch {
                products: partition.validated,
            })?;
            write_blob(self.store.as_ref(), &event.bucket, &processed_key, body).await?;
        }

        let failed_written = if !partition.failed.is_empty() {
            let body = serde_json::to_vec(&FailedProductBatch {
                failed_products: partition.failed,
            })?;
            write_blob(self.store.as_ref(), &event.bucket, &failed_key, body).await?;
            Some(failed_key)
        } else {
            None
        };

        metrics::validate::batch_processed(summary.failure_rate);
        info!(
            status = "success",
            source_key = %processed_key,
            total = summary.total,
            validated = summary.validated_count,
            failed = summary.failed_count,
            failure_rate = summary.failure_rate,
            timestamp = %timestamp,
            "Validation finished"
        );

        Ok(ValidateOutcome {
            status_code: 200,
            message: "Data processed successfully".to_string(),
            bucket: event.bucket.clone(),
            key: processed_key,
            failed_key: failed_written,
            summary,
            timestamp: timestamp.to_string(),
        })
    }
}
