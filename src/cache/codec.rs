//! On-disk encoding of cache entries and device units
//!
//! Entries and units are JSON documents carrying a version tag. Decoding never
//! fails loudly: malformed, truncated, or unknown-version input decodes to
//! `None` and the caller treats the data as absent.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::key::{CacheKey, DeviceId, Kind};
use crate::error::CacheError;

/// Version of the per-entry record layout
pub const ENTRY_SCHEMA_VERSION: u32 = 1;

/// Version of the device unit (file) layout
pub const UNIT_FORMAT_VERSION: u32 = 1;

/// One cached fact about one device.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub value: Value,
    /// Time of the newest fetch that produced or contributed to `value`
    pub fetched_at: DateTime<Utc>,
    pub schema_version: u32,
}

impl CacheEntry {
    pub fn new(key: CacheKey, value: Value, fetched_at: DateTime<Utc>) -> Self {
        Self {
            key,
            value,
            fetched_at,
            schema_version: ENTRY_SCHEMA_VERSION,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.fetched_at
    }

    /// Freshness is always derived from the clock, never stored.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => self.age(now) <= ttl,
            Err(_) => true,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct EntryRecord {
    schema_version: u32,
    device: DeviceId,
    kind: Kind,
    fetched_at: DateTime<Utc>,
    value: Value,
}

#[derive(Deserialize)]
struct VersionHeader {
    schema_version: u32,
}

/// Encode one entry.
pub fn encode_entry(entry: &CacheEntry) -> Result<Vec<u8>, CacheError> {
    serde_json::to_vec(&entry_record(entry)).map_err(|e| CacheError::Encode(e.to_string()))
}

/// Decode one entry; `None` for anything that is not a well-formed entry of a
/// version this build understands.
pub fn decode_entry(bytes: &[u8]) -> Option<CacheEntry> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    decode_entry_value(value)
}

fn entry_record(entry: &CacheEntry) -> EntryRecord {
    EntryRecord {
        schema_version: entry.schema_version,
        device: entry.key.device.clone(),
        kind: entry.key.kind.clone(),
        fetched_at: entry.fetched_at,
        value: entry.value.clone(),
    }
}

fn decode_entry_value(value: Value) -> Option<CacheEntry> {
    let header = VersionHeader::deserialize(&value).ok()?;
    if header.schema_version != ENTRY_SCHEMA_VERSION {
        log::debug!(
            "Skipping cache entry with unknown schema version {}",
            header.schema_version
        );
        return None;
    }

    let record: EntryRecord = serde_json::from_value(value).ok()?;
    Some(CacheEntry {
        key: CacheKey::new(record.device, record.kind),
        value: record.value,
        fetched_at: record.fetched_at,
        schema_version: record.schema_version,
    })
}

/// All cached kinds for one device; the unit of storage on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceUnit {
    pub device: DeviceId,
    pub entries: BTreeMap<Kind, CacheEntry>,
}

impl DeviceUnit {
    pub fn empty(device: DeviceId) -> Self {
        Self {
            device,
            entries: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct UnitFile {
    format: u32,
    device: DeviceId,
    entries: Vec<Value>,
}

/// Encode a device unit.
pub fn encode_unit(unit: &DeviceUnit) -> Result<Vec<u8>, CacheError> {
    let entries = unit
        .entries
        .values()
        .map(|e| serde_json::to_value(entry_record(e)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CacheError::Encode(e.to_string()))?;

    let file = UnitFile {
        format: UNIT_FORMAT_VERSION,
        device: unit.device.clone(),
        entries,
    };
    serde_json::to_vec_pretty(&file).map_err(|e| CacheError::Encode(e.to_string()))
}

/// Decode a device unit; `None` if the unit as a whole is unreadable.
///
/// Individual entries that fail to decode are dropped; the rest survive.
pub fn decode_unit(bytes: &[u8]) -> Option<DeviceUnit> {
    let file: UnitFile = serde_json::from_slice(bytes).ok()?;
    if file.format != UNIT_FORMAT_VERSION {
        log::debug!("Skipping cache unit with unknown format {}", file.format);
        return None;
    }

    let mut unit = DeviceUnit::empty(file.device);
    for raw in file.entries {
        if let Some(mut entry) = decode_entry_value(raw) {
            entry.key.device = unit.device.clone();
            unit.entries.insert(entry.key.kind.clone(), entry);
        }
    }
    Some(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_entry() -> CacheEntry {
        CacheEntry::new(
            CacheKey::new("kitchen", Kind::Status),
            json!({"switch:0": {"output": true, "apower": 12.5}}),
            DateTime::parse_from_rfc3339("2025-06-01T12:00:00.123456789Z")
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    #[test]
    fn test_entry_encode_decode() {
        let entry = sample_entry();
        let bytes = encode_entry(&entry).unwrap();
        let decoded = decode_entry(&bytes).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_decode_garbage_is_absent() {
        assert!(decode_entry(b"").is_none());
        assert!(decode_entry(b"{not json").is_none());
        assert!(decode_entry(b"[1,2,3]").is_none());
        assert!(decode_entry(b"{\"schema_version\": 1}").is_none());
    }

    #[test]
    fn test_decode_truncated_is_absent() {
        let bytes = encode_entry(&sample_entry()).unwrap();
        for cut in [1, bytes.len() / 2, bytes.len() - 1] {
            assert!(decode_entry(&bytes[..cut]).is_none());
        }
    }

    #[test]
    fn test_unknown_entry_version_is_absent() {
        let mut entry = sample_entry();
        entry.schema_version = ENTRY_SCHEMA_VERSION + 1;
        let bytes = encode_entry(&entry).unwrap();
        assert!(decode_entry(&bytes).is_none());
    }

    #[test]
    fn test_unit_drops_only_bad_entries() {
        let good = sample_entry();
        let mut unit = DeviceUnit::empty(DeviceId::new("kitchen"));
        unit.entries.insert(Kind::Status, good.clone());

        let bytes = encode_unit(&unit).unwrap();
        let mut file: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        file["entries"]
            .as_array_mut()
            .unwrap()
            .push(json!({"schema_version": 99, "kind": "config"}));
        let patched = serde_json::to_vec(&file).unwrap();

        let decoded = decode_unit(&patched).unwrap();
        assert_eq!(decoded.entries.len(), 1);
        assert_eq!(decoded.entries[&Kind::Status], good);
    }

    #[test]
    fn test_unit_unknown_format_is_absent() {
        let bytes = br#"{"format": 7, "device": "kitchen", "entries": []}"#;
        assert!(decode_unit(bytes).is_none());
    }

    #[test]
    fn test_freshness_is_derived_from_clock() {
        let entry = sample_entry();
        let ttl = Duration::from_secs(5);

        let at = |secs: i64| entry.fetched_at + chrono::Duration::seconds(secs);
        assert!(entry.is_fresh(at(0), ttl));
        assert!(entry.is_fresh(at(5), ttl));
        assert!(!entry.is_fresh(at(6), ttl));
    }
}
