use chrono::{DateTime, Local, TimeZone};

use crate::config::StorageConfig;
use crate::constants::{ANALYZED_DIR, FAILED_DIR, KEY_TIMESTAMP_FORMAT, PROCESSED_DIR};

/// Derives every stage's output key from the configured prefixes.
/// Keys are write-once: raw and analyzed keys embed a timestamp,
/// structured keys reuse the filename of the input key.
#[derive(Debug, Clone)]
pub struct KeyLayout {
    raw_prefix: String,
    structured_prefix: String,
    analyzed_prefix: String,
}

impl KeyLayout {
    pub fn new(raw_prefix: &str, structured_prefix: &str, analyzed_prefix: &str) -> Self {
        Self {
            raw_prefix: raw_prefix.trim_end_matches('/').to_string(),
            structured_prefix: structured_prefix.trim_end_matches('/').to_string(),
            analyzed_prefix: analyzed_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(&storage.raw_prefix, &storage.structured_prefix, &storage.analyzed_prefix)
    }

    pub fn raw_key(&self, timestamp: &str) -> String {
        format!("{}/products-{}.json", self.raw_prefix, timestamp)
    }

    pub fn processed_key(&self, filename: &str) -> String {
        format!("{}/{}/{}", self.structured_prefix, PROCESSED_DIR, filename)
    }

    pub fn failed_key(&self, filename: &str) -> String {
        format!("{}/{}/{}", self.structured_prefix, FAILED_DIR, filename)
    }

    pub fn analyzed_key(&self, timestamp: &str) -> String {
        format!("{}/{}/product-{}.json", self.analyzed_prefix, ANALYZED_DIR, timestamp)
    }
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self::from_config(&StorageConfig::default())
    }
}

/// Last `/`-separated component of a key
pub fn filename_of(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// `YYYY-MM-DDTHHMMSS` in local time
pub fn key_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(KEY_TIMESTAMP_FORMAT).to_string()
}

pub fn timestamp_now() -> String {
    key_timestamp(&Local::now())
}
