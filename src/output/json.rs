//! JSON output formatting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{Resolved, Source};

/// Wrapper for JSON output with metadata
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    /// The actual data
    pub data: T,

    /// Metadata about the response
    pub meta: Metadata,
}

/// Metadata included in JSON output
#[derive(Debug, Serialize)]
pub struct Metadata {
    /// Timestamp of the response
    pub timestamp: String,

    /// CLI version
    pub version: String,

    /// Freshness of `data` when it is a single cached reading
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheMeta>,
}

/// Freshness of one cached reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub stale: bool,
    pub fetched_at: DateTime<Utc>,
    pub age_secs: i64,
    pub source: String,

    /// Why a stale value was served
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,

    /// The value was fetched but not persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_error: Option<String>,
}

impl CacheMeta {
    pub fn new<T>(resolved: &Resolved<T>, now: DateTime<Utc>) -> Self {
        Self {
            stale: resolved.stale,
            fetched_at: resolved.fetched_at,
            age_secs: resolved.age(now).num_seconds().max(0),
            source: match resolved.source {
                Source::Cache => "cache",
                Source::Fetched => "fetched",
            }
            .to_string(),
            fetch_error: resolved.fetch_error.as_ref().map(|e| e.to_string()),
            write_error: resolved.write_error.clone(),
        }
    }
}

impl<T> JsonOutput<T> {
    /// Create a new JSON output with metadata
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: Metadata {
                timestamp: Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                cache: None,
            },
        }
    }

    pub fn with_cache(data: T, cache: CacheMeta) -> Self {
        let mut output = Self::new(data);
        output.meta.cache = Some(cache);
        output
    }
}

/// Format data as pretty-printed JSON
pub fn format_json<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonOutput::new(data))
}

/// Format one cached reading as pretty-printed JSON, freshness in `meta.cache`
pub fn format_json_cached<T: Serialize + ?Sized>(
    data: &T,
    cache: CacheMeta,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonOutput::with_cache(data, cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;
    use serde_json::{Value, json};

    fn resolved(stale: bool, source: Source) -> Resolved<Value> {
        Resolved {
            value: json!({"on": true}),
            stale,
            fetched_at: DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            source,
            fetch_error: None,
            write_error: None,
        }
    }

    #[test]
    fn test_json_output_new() {
        let output = JsonOutput::new(vec!["item1", "item2"]);

        assert_eq!(output.data, vec!["item1", "item2"]);
        assert_eq!(output.meta.version, env!("CARGO_PKG_VERSION"));
        assert!(!output.meta.timestamp.is_empty());
        assert!(output.meta.cache.is_none());
    }

    #[test]
    fn test_format_json_has_no_cache_block() {
        let result = format_json(&json!({"id": "1"})).unwrap();

        assert!(result.contains("\"data\""));
        assert!(result.contains("\"timestamp\""));
        assert!(!result.contains("\"cache\""));
    }

    #[test]
    fn test_cache_meta_from_resolved() {
        let mut r = resolved(true, Source::Cache);
        r.fetch_error = Some(DeviceError::Timeout);
        let now = r.fetched_at + chrono::Duration::seconds(42);

        let meta = CacheMeta::new(&r, now);

        assert!(meta.stale);
        assert_eq!(meta.age_secs, 42);
        assert_eq!(meta.source, "cache");
        assert_eq!(meta.fetch_error.as_deref(), Some("Device request timed out"));
    }

    #[test]
    fn test_format_json_cached() {
        let r = resolved(false, Source::Fetched);
        let meta = CacheMeta::new(&r, r.fetched_at);

        let out: Value =
            serde_json::from_str(&format_json_cached(&r.value, meta).unwrap()).unwrap();

        assert_eq!(out["data"], json!({"on": true}));
        assert_eq!(out["meta"]["cache"]["stale"], json!(false));
        assert_eq!(out["meta"]["cache"]["source"], json!("fetched"));
        assert_eq!(out["meta"]["cache"]["age_secs"], json!(0));
        assert!(out["meta"]["cache"].get("fetch_error").is_none());
    }
}
