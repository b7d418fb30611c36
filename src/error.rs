use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Invalid blob {key}: {message}")]
    InvalidBlob { key: String, message: String },

    #[error("Upstream returned status {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Blob not found: {bucket}/{key}")]
    BlobNotFound { bucket: String, key: String },

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),
}

/// Errors raised by a completion backend. The enricher turns these into a
/// per-record `analysis_failed` marker rather than failing the batch.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Completion request failed: {0}")]
    RequestFailed(String),

    #[error("Completion endpoint returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse completion response: {0}")]
    ParseError(String),

    #[error("Completion backend not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
