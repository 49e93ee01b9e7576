//! File-backed cache storage, one unit per device
//!
//! Every device gets a single JSON unit under `<root>/devices/` holding all
//! of its cached kinds. Units are replaced by writing a temp file in the same
//! directory and renaming it into place, so a reader in another process sees
//! either the old unit or the new one, never a partial write.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

use super::codec::{CacheEntry, DeviceUnit, decode_unit, encode_unit};
use super::key::{CacheKey, DeviceId};
use super::ttl::TtlTable;
use crate::error::CacheError;

type Result<T> = std::result::Result<T, CacheError>;

/// Subdirectory of the cache root holding device units
const UNITS_DIR: &str = "devices";

/// Durable per-device cache storage
pub struct CacheStore {
    root: PathBuf,
    units_dir: PathBuf,
    ttl: TtlTable,
    /// Serializes read-modify-write of units within this process
    write_lock: Mutex<()>,
}

impl CacheStore {
    /// Open or create storage at the default XDG cache location
    pub fn open(ttl: TtlTable) -> Result<Self> {
        let cache_dir = Self::cache_dir()?;
        Self::open_at(&cache_dir, ttl)
    }

    /// Get the cache directory path (~/.cache/devctl on Linux)
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_base = dirs::cache_dir().ok_or(CacheError::NoHome)?;
        Ok(cache_base.join("devctl"))
    }

    /// Open storage at a specific directory
    pub fn open_at(cache_dir: &Path, ttl: TtlTable) -> Result<Self> {
        let units_dir = cache_dir.join(UNITS_DIR);
        std::fs::create_dir_all(&units_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;

        Ok(Self {
            root: cache_dir.to_path_buf(),
            units_dir,
            ttl,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl(&self) -> &TtlTable {
        &self.ttl
    }

    /// Read one entry. Local only; unreadable data reads as absent.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.load_unit(&key.device)?.entries.remove(&key.kind)
    }

    /// All readable entries for a device
    pub fn entries(&self, device: &DeviceId) -> Vec<CacheEntry> {
        self.load_unit(device)
            .map(|unit| unit.entries.into_values().collect())
            .unwrap_or_default()
    }

    /// Store an entry, replacing any prior entry for its key
    pub fn put(&self, entry: &CacheEntry) -> Result<()> {
        let _guard = self.lock();
        let device = &entry.key.device;

        let mut unit = self
            .load_unit(device)
            .unwrap_or_else(|| DeviceUnit::empty(device.clone()));
        unit.entries.insert(entry.key.kind.clone(), entry.clone());
        self.write_unit(&unit)
    }

    /// Remove a single entry. Returns whether it existed.
    pub fn delete(&self, key: &CacheKey) -> Result<bool> {
        let _guard = self.lock();

        let Some(mut unit) = self.load_unit(&key.device) else {
            return Ok(false);
        };
        if unit.entries.remove(&key.kind).is_none() {
            return Ok(false);
        }
        self.write_unit(&unit)?;
        Ok(true)
    }

    /// Remove every entry for a device. Returns the number of entries removed.
    pub fn delete_device(&self, device: &DeviceId) -> Result<usize> {
        let _guard = self.lock();

        let count = self
            .load_unit(device)
            .map(|unit| unit.entries.len())
            .unwrap_or(0);
        remove_if_exists(&self.unit_path(device))?;
        Ok(count)
    }

    /// Remove every entry older than its kind's TTL. Returns the count removed.
    pub fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        self.evict_expired(now, None)
    }

    /// Remove one device's entries that are older than their kind's TTL.
    pub fn delete_expired_for(&self, device: &DeviceId, now: DateTime<Utc>) -> Result<usize> {
        self.evict_expired(now, Some(device))
    }

    fn evict_expired(&self, now: DateTime<Utc>, only: Option<&DeviceId>) -> Result<usize> {
        let _guard = self.lock();
        let mut removed = 0;

        for scanned in self.scan_units()? {
            let Some(mut unit) = scanned.unit else {
                continue;
            };
            if only.is_some_and(|device| device != &unit.device) {
                continue;
            }
            let before = unit.entries.len();
            unit.entries
                .retain(|kind, entry| entry.is_fresh(now, self.ttl.ttl(kind)));

            let dropped = before - unit.entries.len();
            if dropped > 0 {
                log::debug!("Evicting {} expired entries for {}", dropped, unit.device);
                self.write_unit(&unit)?;
                removed += dropped;
            }
        }

        Ok(removed)
    }

    /// Remove every device unit, readable or not
    pub fn delete_all(&self) -> Result<ClearStats> {
        let _guard = self.lock();
        let mut stats = ClearStats::default();

        for scanned in self.scan_units()? {
            if let Some(unit) = &scanned.unit {
                stats.entries_removed += unit.entries.len();
            }
            remove_if_exists(&scanned.path)?;
            stats.devices_removed += 1;
        }

        Ok(stats)
    }

    /// Devices with a readable unit
    pub fn devices(&self) -> Result<Vec<DeviceId>> {
        let mut devices: Vec<DeviceId> = self
            .scan_units()?
            .into_iter()
            .filter_map(|s| s.unit.map(|u| u.device))
            .collect();
        devices.sort();
        Ok(devices)
    }

    /// Aggregate statistics for display
    pub fn stats(&self, now: DateTime<Utc>) -> Result<CacheStats> {
        let mut stats = CacheStats::default();

        for scanned in self.scan_units()? {
            stats.total_size_bytes += scanned.size_bytes;
            let Some(unit) = scanned.unit else {
                stats.unreadable_units += 1;
                continue;
            };
            if unit.is_empty() {
                continue;
            }

            stats.device_count += 1;
            for (kind, entry) in &unit.entries {
                stats.total_entries += 1;
                *stats.by_kind.entry(kind.to_string()).or_insert(0) += 1;

                if !entry.is_fresh(now, self.ttl.ttl(kind)) {
                    stats.expired_entries += 1;
                }
                stats.oldest_entry = Some(match stats.oldest_entry {
                    Some(t) => t.min(entry.fetched_at),
                    None => entry.fetched_at,
                });
                stats.newest_entry = Some(match stats.newest_entry {
                    Some(t) => t.max(entry.fetched_at),
                    None => entry.fetched_at,
                });
            }
        }

        Ok(stats)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unit_path(&self, device: &DeviceId) -> PathBuf {
        self.units_dir.join(device.unit_file_name())
    }

    /// Load a device unit. Missing, unreadable and corrupted units all read
    /// as `None`; only the latter two are logged.
    fn load_unit(&self, device: &DeviceId) -> Option<DeviceUnit> {
        let path = self.unit_path(device);
        let unit = read_unit(&path)?;

        if &unit.device != device {
            log::warn!(
                "Cache unit {} belongs to '{}', not '{}'; ignoring",
                path.display(),
                unit.device,
                device
            );
            return None;
        }
        Some(unit)
    }

    /// Atomically replace a unit on disk; empty units are removed instead.
    fn write_unit(&self, unit: &DeviceUnit) -> Result<()> {
        let path = self.unit_path(&unit.device);
        if unit.is_empty() {
            return remove_if_exists(&path);
        }

        let bytes = encode_unit(unit)?;
        let mut tmp = NamedTempFile::new_in(&self.units_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create temp file: {}", e)))?;
        tmp.write_all(&bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| CacheError::Io(format!("Failed to write cache unit: {}", e)))?;
        tmp.persist(&path)
            .map_err(|e| CacheError::Io(format!("Failed to replace cache unit: {}", e.error)))?;

        log::debug!(
            "Wrote {} entries for {} ({} bytes)",
            unit.entries.len(),
            unit.device,
            bytes.len()
        );
        Ok(())
    }

    /// Every unit file in the store, decoded where possible
    fn scan_units(&self) -> Result<Vec<ScannedUnit>> {
        let dir = std::fs::read_dir(&self.units_dir)
            .map_err(|e| CacheError::Io(format!("Failed to list cache dir: {}", e)))?;

        let mut units = Vec::new();
        for dirent in dir.flatten() {
            let path = dirent.path();
            let is_unit = path.extension().is_some_and(|ext| ext == "json")
                && !dirent.file_name().to_string_lossy().starts_with('.');
            if !is_unit {
                continue;
            }

            let size_bytes = dirent.metadata().map(|m| m.len()).unwrap_or(0);
            let unit = read_unit(&path);
            units.push(ScannedUnit {
                path,
                size_bytes,
                unit,
            });
        }
        Ok(units)
    }
}

struct ScannedUnit {
    path: PathBuf,
    size_bytes: u64,
    unit: Option<DeviceUnit>,
}

fn read_unit(path: &Path) -> Option<DeviceUnit> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            log::warn!("Failed to read cache unit {}: {}", path.display(), e);
            return None;
        }
    };

    let unit = decode_unit(&bytes);
    if unit.is_none() {
        log::warn!("Corrupted cache unit {}, ignoring", path.display());
    }
    unit
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::Io(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Statistics about a clear operation
#[derive(Debug, Default)]
pub struct ClearStats {
    pub entries_removed: usize,
    pub devices_removed: usize,
}

/// Statistics about cache state
#[derive(Debug, Default)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub by_kind: BTreeMap<String, usize>,
    pub device_count: usize,
    pub expired_entries: usize,
    pub unreadable_units: usize,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}
