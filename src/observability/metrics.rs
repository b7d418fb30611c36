//! Metrics for the three pipeline stages.
//!
//! Recording goes through the `metrics` facade, so it is a no-op until
//! [`init`] installs the Prometheus recorder. A stage invocation is short
//! lived, so instead of serving a scrape endpoint the binary pushes the
//! rendered registry to a Pushgateway once the invocation ends.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// Enum representing all metric names used by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Fetch stage
    FetchRequestsSuccess,
    FetchRequestsError,
    FetchProductsCount,
    FetchPayloadBytes,

    // Validate stage
    ValidateRecordsValidated,
    ValidateRecordsFailed,
    ValidateViolations,
    ValidateFailureRate,
    ValidateBatchesProcessed,

    // Enrich stage
    EnrichRecordsAnalyzed,
    EnrichRecordsFailed,
    EnrichCompletionDuration,
    EnrichBatchesProcessed,

    // Blob store
    StorageWritesSuccess,
    StorageWritesError,
    StorageBytesWritten,

    // Any stage
    InvocationsFatal,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::FetchRequestsSuccess => "catalog_fetch_requests_success_total",
            MetricName::FetchRequestsError => "catalog_fetch_requests_error_total",
            MetricName::FetchProductsCount => "catalog_fetch_products_count",
            MetricName::FetchPayloadBytes => "catalog_fetch_payload_bytes",

            MetricName::ValidateRecordsValidated => "catalog_validate_records_validated_total",
            MetricName::ValidateRecordsFailed => "catalog_validate_records_failed_total",
            MetricName::ValidateViolations => "catalog_validate_violations_total",
            MetricName::ValidateFailureRate => "catalog_validate_failure_rate_percent",
            MetricName::ValidateBatchesProcessed => "catalog_validate_batches_processed_total",

            MetricName::EnrichRecordsAnalyzed => "catalog_enrich_records_analyzed_total",
            MetricName::EnrichRecordsFailed => "catalog_enrich_records_failed_total",
            MetricName::EnrichCompletionDuration => "catalog_enrich_completion_duration_seconds",
            MetricName::EnrichBatchesProcessed => "catalog_enrich_batches_processed_total",

            MetricName::StorageWritesSuccess => "catalog_storage_writes_success_total",
            MetricName::StorageWritesError => "catalog_storage_writes_error_total",
            MetricName::StorageBytesWritten => "catalog_storage_bytes_written",

            MetricName::InvocationsFatal => "catalog_invocations_fatal_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it twice is harmless.
pub fn init() -> Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| PipelineError::Config(format!("Failed to install Prometheus recorder: {}", e)))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Render the current registry in the Prometheus text format
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

/// Push the rendered registry to `PIPELINE_PUSHGATEWAY_URL`, if set.
/// Returns `Ok(false)` when there is no gateway or no recorder.
pub async fn push_to_gateway(job: &str, instance: &str) -> Result<bool> {
    let base = match std::env::var("PIPELINE_PUSHGATEWAY_URL") {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return Ok(false),
    };
    let Some(body) = render() else {
        return Ok(false);
    };

    let push_url = format!(
        "{}/metrics/job/{}/instance/{}",
        base.trim_end_matches('/'),
        job,
        instance
    );

    let response = reqwest::Client::new()
        .post(&push_url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(PipelineError::UpstreamStatus {
            status: response.status().as_u16(),
            url: push_url,
        });
    }

    debug!("Pushed metrics to Pushgateway job={} instance={}", job, instance);
    Ok(true)
}

pub fn invocation_fatal(stage: &'static str) {
    ::metrics::counter!(MetricName::InvocationsFatal.as_str(), "stage" => stage).increment(1);
}

pub mod fetch {
    use super::MetricName;

    pub fn request_success() {
        ::metrics::counter!(MetricName::FetchRequestsSuccess.as_str()).increment(1);
    }

    pub fn request_error() {
        ::metrics::counter!(MetricName::FetchRequestsError.as_str()).increment(1);
    }

    pub fn products_fetched(count: usize) {
        ::metrics::gauge!(MetricName::FetchProductsCount.as_str()).set(count as f64);
    }

    pub fn payload_bytes(bytes: usize) {
        ::metrics::histogram!(MetricName::FetchPayloadBytes.as_str()).record(bytes as f64);
    }
}

pub mod validate {
    use super::MetricName;
    use crate::domain::Violation;

    pub fn record_validated() {
        ::metrics::counter!(MetricName::ValidateRecordsValidated.as_str()).increment(1);
    }

    /// Counts the failed record and each violated rule, labelled by field and rule
    pub fn record_failed(violations: &[Violation]) {
        ::metrics::counter!(MetricName::ValidateRecordsFailed.as_str()).increment(1);
        for violation in violations {
            ::metrics::counter!(
                MetricName::ValidateViolations.as_str(),
                "field" => violation.field.clone(),
                "rule" => violation.rule.clone()
            )
            .increment(1);
        }
    }

    pub fn batch_processed(failure_rate: f64) {
        ::metrics::counter!(MetricName::ValidateBatchesProcessed.as_str()).increment(1);
        ::metrics::gauge!(MetricName::ValidateFailureRate.as_str()).set(failure_rate);
    }
}

pub mod enrich {
    use super::MetricName;

    pub fn record_analyzed() {
        ::metrics::counter!(MetricName::EnrichRecordsAnalyzed.as_str()).increment(1);
    }

    pub fn record_failed() {
        ::metrics::counter!(MetricName::EnrichRecordsFailed.as_str()).increment(1);
    }

    pub fn completion_duration(secs: f64) {
        ::metrics::histogram!(MetricName::EnrichCompletionDuration.as_str()).record(secs);
    }

    pub fn batch_processed() {
        ::metrics::counter!(MetricName::EnrichBatchesProcessed.as_str()).increment(1);
    }
}

pub mod storage {
    use super::MetricName;

    pub fn write_success(bytes: usize) {
        ::metrics::counter!(MetricName::StorageWritesSuccess.as_str()).increment(1);
        ::metrics::histogram!(MetricName::StorageBytesWritten.as_str()).record(bytes as f64);
    }

    pub fn write_error() {
        ::metrics::counter!(MetricName::StorageWritesError.as_str()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed_and_unique() {
        use MetricName::*;
        let all = [
            FetchRequestsSuccess,
            FetchRequestsError,
            FetchProductsCount,
            FetchPayloadBytes,
            ValidateRecordsValidated,
            ValidateRecordsFailed,
            ValidateViolations,
            ValidateFailureRate,
            ValidateBatchesProcessed,
            EnrichRecordsAnalyzed,
            EnrichRecordsFailed,
            EnrichCompletionDuration,
            EnrichBatchesProcessed,
            StorageWritesSuccess,
            StorageWritesError,
            StorageBytesWritten,
            InvocationsFatal,
        ];
        let mut names: Vec<&str> = all.iter().map(|m| m.as_str()).collect();
        assert!(names.iter().all(|n| n.starts_with("catalog_")));
        names.sort();
        names.dedup();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        validate::record_failed(&[crate::domain::Violation {
            field: "price".to_string(),
            rule: "greater_than".to_string(),
            message: "price must be greater than 0".to_string(),
        }]);
        enrich::record_failed();
        assert_eq!(MetricName::InvocationsFatal.to_string(), "catalog_invocations_fatal_total");
    }
}
