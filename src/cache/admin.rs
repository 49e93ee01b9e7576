//! Maintenance surface over the cache store
//!
//! Backs `cache show` and `cache clear`. Nothing here fetches from devices.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::clock::{Clock, SystemClock};
use super::key::{DeviceId, Kind};
use super::storage::{CacheStats, CacheStore};
use crate::error::CacheError;

type Result<T> = std::result::Result<T, CacheError>;

/// What `cache clear` should remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearScope {
    All,
    Device(DeviceId),
    Expired,
    DeviceExpired(DeviceId),
}

impl ClearScope {
    pub fn from_args(device: Option<DeviceId>, expired_only: bool) -> Self {
        match (device, expired_only) {
            (None, false) => ClearScope::All,
            (None, true) => ClearScope::Expired,
            (Some(d), false) => ClearScope::Device(d),
            (Some(d), true) => ClearScope::DeviceExpired(d),
        }
    }
}

/// Outcome of a clear operation
#[derive(Debug, Clone, Serialize)]
pub struct ClearReport {
    pub entries_removed: usize,
    /// Only known for a full wipe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices_removed: Option<usize>,
}

/// One cached kind of one device, as shown by `cache show --device`
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub kind: Kind,
    pub fetched_at: DateTime<Utc>,
    pub age_secs: i64,
    pub ttl_secs: u64,
    pub fresh: bool,
    pub size_bytes: usize,
}

pub struct CacheAdmin {
    store: Arc<CacheStore>,
    clock: Arc<dyn Clock>,
}

impl CacheAdmin {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn stats(&self) -> Result<CacheStats> {
        self.store.stats(self.clock.now())
    }

    pub fn devices(&self) -> Result<Vec<DeviceId>> {
        self.store.devices()
    }

    /// Per-kind listing for one device, ordered by kind name
    pub fn entries(&self, device: &DeviceId) -> Vec<EntrySummary> {
        let now = self.clock.now();
        let ttl = self.store.ttl();

        let mut summaries: Vec<EntrySummary> = self
            .store
            .entries(device)
            .into_iter()
            .map(|entry| {
                let kind_ttl = ttl.ttl(&entry.key.kind);
                EntrySummary {
                    fresh: entry.is_fresh(now, kind_ttl),
                    age_secs: entry.age(now).num_seconds(),
                    ttl_secs: kind_ttl.as_secs(),
                    size_bytes: serde_json::to_vec(&entry.value)
                        .map(|b| b.len())
                        .unwrap_or(0),
                    fetched_at: entry.fetched_at,
                    kind: entry.key.kind,
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.kind.as_str().cmp(b.kind.as_str()));
        summaries
    }

    pub fn clear(&self, scope: &ClearScope) -> Result<ClearReport> {
        let now = self.clock.now();
        let report = match scope {
            ClearScope::All => {
                let stats = self.store.delete_all()?;
                ClearReport {
                    entries_removed: stats.entries_removed,
                    devices_removed: Some(stats.devices_removed),
                }
            }
            ClearScope::Device(device) => ClearReport {
                entries_removed: self.store.delete_device(device)?,
                devices_removed: None,
            },
            ClearScope::Expired => ClearReport {
                entries_removed: self.store.delete_expired(now)?,
                devices_removed: None,
            },
            ClearScope::DeviceExpired(device) => ClearReport {
                entries_removed: self.store.delete_expired_for(device, now)?,
                devices_removed: None,
            },
        };

        log::info!("Cleared {} cache entries ({:?})", report.entries_removed, scope);
        Ok(report)
    }
}
