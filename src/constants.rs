//! Defaults shared by configuration, key derivation and the enricher.
//! Everything here can be overridden from `pipeline.toml` or the environment.

pub const DEFAULT_CATALOG_URL: &str = "https://dummyjson.com/products";
pub const DEFAULT_BUCKET: &str = "products-data";

// Key prefixes, one per stage output
pub const DEFAULT_RAW_PREFIX: &str = "products-data-raw";
pub const DEFAULT_STRUCTURED_PREFIX: &str = "products-data-structured";
pub const DEFAULT_ANALYZED_PREFIX: &str = "products-data-analyzed";

// Sub-folders under the structured and analyzed prefixes
pub const PROCESSED_DIR: &str = "processed";
pub const FAILED_DIR: &str = "failed";
pub const ANALYZED_DIR: &str = "analyzed";

/// chrono format for the timestamp embedded in raw and analyzed keys
pub const KEY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H%M%S";

pub const DEFAULT_MODEL_ID: &str = "amazon.nova-lite-v1:0";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 100;

/// Marker merged into a product whose analysis could not be produced
pub const ANALYSIS_FAILED: &str = "analysis_failed";

pub const DEFAULT_CONFIG_PATH: &str = "pipeline.toml";
