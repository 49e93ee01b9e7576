//! Cache display models

use tabled::Tabled;

use crate::cache::admin::EntrySummary;
use crate::output::formatters::{describe_age, format_size, format_timestamp_local};

/// Per-kind entry count for `cache show`
#[derive(Debug, Clone, Tabled)]
pub struct KindCountDisplay {
    #[tabled(rename = "KIND")]
    pub kind: String,

    #[tabled(rename = "ENTRIES")]
    pub entries: usize,
}

/// One cached kind of one device for `cache show --device`
#[derive(Debug, Clone, Tabled)]
pub struct CacheEntryDisplay {
    #[tabled(rename = "KIND")]
    pub kind: String,

    #[tabled(rename = "FETCHED")]
    pub fetched: String,

    #[tabled(rename = "AGE")]
    pub age: String,

    #[tabled(rename = "TTL")]
    pub ttl: String,

    #[tabled(rename = "FRESH")]
    pub fresh: String,

    #[tabled(rename = "SIZE")]
    pub size: String,
}

impl From<&EntrySummary> for CacheEntryDisplay {
    fn from(entry: &EntrySummary) -> Self {
        Self {
            kind: entry.kind.to_string(),
            fetched: format_timestamp_local(entry.fetched_at),
            age: describe_age(entry.age_secs),
            ttl: format!("{}s", entry.ttl_secs),
            fresh: if entry.fresh { "yes" } else { "no" }.to_string(),
            size: format_size(entry.size_bytes as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Kind;
    use chrono::Utc;

    #[test]
    fn test_cache_entry_display() {
        let summary = EntrySummary {
            kind: Kind::NetworkStatus,
            fetched_at: Utc::now(),
            age_secs: 90,
            ttl_secs: 30,
            fresh: false,
            size_bytes: 2048,
        };

        let row = CacheEntryDisplay::from(&summary);
        assert_eq!(row.kind, "network_status");
        assert_eq!(row.age, "1m ago");
        assert_eq!(row.ttl, "30s");
        assert_eq!(row.fresh, "no");
        assert_eq!(row.size, "2.00 KB");
    }
}
