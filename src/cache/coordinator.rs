//! Fetch-or-serve coordination over the cache store
//!
//! The coordinator decides, per read mode and freshness, whether a request is
//! answered from the store or by calling the supplied fetch function. Fetches
//! for the same key within one process are collapsed into a single spawned
//! task whose result every concurrent caller shares.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::clock::{Clock, SystemClock};
use super::codec::CacheEntry;
use super::key::CacheKey;
use super::merge::merge;
use super::storage::CacheStore;
use crate::error::{CacheError, DeviceError, DeviceResult, Error, Result};

/// How a read may use the cache and the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Serve fresh cache hits, fetch otherwise
    #[default]
    Normal,
    /// Serve whatever is cached; never fetch
    OfflineOnly,
    /// Always fetch
    ForceRefresh,
}

impl ReadMode {
    /// Map the `--offline` / `--refresh` flags to a mode.
    pub fn from_flags(offline: bool, refresh: bool) -> Self {
        if offline {
            ReadMode::OfflineOnly
        } else if refresh {
            ReadMode::ForceRefresh
        } else {
            ReadMode::Normal
        }
    }
}

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Fetched,
}

/// A value together with everything a consumer needs to present its age.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    /// Older than its TTL, or served as a fallback after a failed fetch
    pub stale: bool,
    pub fetched_at: DateTime<Utc>,
    pub source: Source,
    /// Fetch failure behind a stale fallback
    pub fetch_error: Option<DeviceError>,
    /// The value was fetched but could not be persisted
    pub write_error: Option<String>,
}

impl Resolved<Value> {
    fn from_entry(entry: CacheEntry, stale: bool) -> Self {
        Self {
            value: entry.value,
            stale,
            fetched_at: entry.fetched_at,
            source: Source::Cache,
            fetch_error: None,
            write_error: None,
        }
    }
}

impl<T> Resolved<T> {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.fetched_at
    }

    pub fn try_map<U, E>(
        self,
        f: impl FnOnce(T) -> std::result::Result<U, E>,
    ) -> std::result::Result<Resolved<U>, E> {
        Ok(Resolved {
            value: f(self.value)?,
            stale: self.stale,
            fetched_at: self.fetched_at,
            source: self.source,
            fetch_error: self.fetch_error,
            write_error: self.write_error,
        })
    }
}

/// Result of a completed fetch, after merge and persist
#[derive(Debug, Clone)]
struct Landed {
    value: Value,
    fetched_at: DateTime<Utc>,
    write_error: Option<String>,
}

type FetchOutcome = std::result::Result<Landed, DeviceError>;
type InFlight = Shared<BoxFuture<'static, FetchOutcome>>;
type Registry = Arc<Mutex<HashMap<CacheKey, InFlight>>>;

/// What a caller attached to when it went to fetch
enum Joined {
    /// Another caller's fetch landed a fresh entry in the meantime
    Fresh(CacheEntry),
    InFlight(InFlight),
}

/// Entry point for every cached read.
pub struct FetchCoordinator {
    store: Arc<CacheStore>,
    clock: Arc<dyn Clock>,
    in_flight: Registry,
}

impl FetchCoordinator {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Resolve a typed value for `key`.
    pub async fn resolve<T, F, Fut>(&self, key: &CacheKey, mode: ReadMode, fetch: F) -> Result<Resolved<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = DeviceResult<T>> + Send + 'static,
    {
        self.resolve_with_cancel(key, mode, fetch, std::future::pending())
            .await
    }

    /// Resolve a typed value, giving up with [`Error::Cancelled`] as soon as
    /// `cancelled` completes. A fetch already started keeps running and still
    /// lands in the cache.
    pub async fn resolve_with_cancel<T, F, Fut, C>(
        &self,
        key: &CacheKey,
        mode: ReadMode,
        fetch: F,
        cancelled: C,
    ) -> Result<Resolved<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = DeviceResult<T>> + Send + 'static,
        C: Future<Output = ()>,
    {
        let fetch_value = move || {
            let fut = fetch();
            async move {
                let value = fut.await?;
                serde_json::to_value(value).map_err(|e| DeviceError::InvalidResponse(e.to_string()))
            }
        };

        let resolved = self
            .resolve_value_with_cancel(key, mode, fetch_value, cancelled)
            .await?;
        resolved
            .try_map(serde_json::from_value)
            .map_err(|e| CacheError::Decode(format!("{}: {}", key, e)).into())
    }

    /// Resolve the raw JSON value for `key`.
    pub async fn resolve_value<F, Fut>(&self, key: &CacheKey, mode: ReadMode, fetch: F) -> Result<Resolved<Value>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = DeviceResult<Value>> + Send + 'static,
    {
        self.resolve_value_with_cancel(key, mode, fetch, std::future::pending())
            .await
    }

    pub async fn resolve_value_with_cancel<F, Fut, C>(
        &self,
        key: &CacheKey,
        mode: ReadMode,
        fetch: F,
        cancelled: C,
    ) -> Result<Resolved<Value>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = DeviceResult<Value>> + Send + 'static,
        C: Future<Output = ()>,
    {
        let existing = self.store.get(key);
        let now = self.clock.now();
        let ttl = self.store.ttl().ttl(&key.kind);

        match mode {
            ReadMode::OfflineOnly => {
                return match existing {
                    Some(entry) => {
                        let stale = !entry.is_fresh(now, ttl);
                        log::debug!("Offline read: {} (stale: {})", key, stale);
                        Ok(Resolved::from_entry(entry, stale))
                    }
                    None => Err(CacheError::OfflineMiss {
                        device: key.device.to_string(),
                        kind: key.kind.to_string(),
                    }
                    .into()),
                };
            }
            ReadMode::Normal => {
                if let Some(entry) = &existing
                    && entry.is_fresh(now, ttl)
                {
                    log::debug!("Cache hit: {}", key);
                    return Ok(Resolved::from_entry(entry.clone(), false));
                }
                log::debug!(
                    "Cache {}: {}",
                    if existing.is_some() { "stale" } else { "miss" },
                    key
                );
            }
            ReadMode::ForceRefresh => {
                log::debug!("Forced refresh: {}", key);
            }
        }

        let in_flight = match self.join_or_start(key, mode, fetch) {
            Joined::Fresh(entry) => {
                log::debug!("Cache hit after concurrent fetch: {}", key);
                return Ok(Resolved::from_entry(entry, false));
            }
            Joined::InFlight(in_flight) => in_flight,
        };
        let outcome = tokio::select! {
            outcome = in_flight => outcome,
            _ = cancelled => {
                log::debug!("Caller cancelled while waiting on {}", key);
                return Err(Error::Cancelled);
            }
        };

        match outcome {
            Ok(landed) => Ok(Resolved {
                value: landed.value,
                stale: false,
                fetched_at: landed.fetched_at,
                source: Source::Fetched,
                fetch_error: None,
                write_error: landed.write_error,
            }),
            Err(err) => match self.store.get(key).or(existing) {
                Some(entry) => {
                    log::warn!("Fetch failed for {}, serving cached value: {}", key, err);
                    let mut resolved = Resolved::from_entry(entry, true);
                    resolved.fetch_error = Some(err);
                    Ok(resolved)
                }
                None => Err(err.into()),
            },
        }
    }

    /// Attach to the in-flight fetch for `key`, or start one.
    ///
    /// A fetch lands in the store before it leaves the registry, so in
    /// `Normal` mode a second look at the store under the registry lock
    /// catches a fetch that finished after this caller's first read.
    fn join_or_start<F, Fut>(&self, key: &CacheKey, mode: ReadMode, fetch: F) -> Joined
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = DeviceResult<Value>> + Send + 'static,
    {
        let mut in_flight = lock(&self.in_flight);
        if let Some(running) = in_flight.get(key) {
            log::debug!("Joining in-flight fetch: {}", key);
            return Joined::InFlight(running.clone());
        }

        if mode == ReadMode::Normal
            && let Some(entry) = self.store.get(key)
            && entry.is_fresh(self.clock.now(), self.store.ttl().ttl(&key.kind))
        {
            return Joined::Fresh(entry);
        }

        log::debug!("Fetching: {}", key);
        let guard = InFlightGuard {
            registry: self.in_flight.clone(),
            key: key.clone(),
        };
        let task = tokio::spawn(land_fetch(
            self.store.clone(),
            self.clock.clone(),
            guard,
            fetch,
        ));
        let shared = async move {
            task.await
                .unwrap_or_else(|e| Err(DeviceError::Aborted(e.to_string())))
        }
        .boxed()
        .shared();

        in_flight.insert(key.clone(), shared.clone());
        Joined::InFlight(shared)
    }
}

/// Removes a key from the in-flight registry when its fetch task ends,
/// including by panic.
struct InFlightGuard {
    registry: Registry,
    key: CacheKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.registry).remove(&self.key);
    }
}

async fn land_fetch<F, Fut>(
    store: Arc<CacheStore>,
    clock: Arc<dyn Clock>,
    guard: InFlightGuard,
    fetch: F,
) -> FetchOutcome
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = DeviceResult<Value>>,
{
    let fetched = fetch().await;
    let outcome = match fetched {
        Ok(value) => Ok(land(&store, clock.as_ref(), &guard.key, value)),
        Err(e) => {
            log::debug!("Fetch failed: {}: {}", guard.key, e);
            Err(e)
        }
    };
    drop(guard);
    outcome
}

/// Merge a fetched value into the stored one and persist it.
///
/// A failed write is reported alongside the value rather than replacing it.
fn land(store: &CacheStore, clock: &dyn Clock, key: &CacheKey, fetched: Value) -> Landed {
    let previous = store.get(key);

    let mut fetched_at = clock.now();
    if let Some(prev) = &previous {
        fetched_at = fetched_at.max(prev.fetched_at);
    }

    let value = merge(
        previous.map(|e| e.value),
        fetched,
        key.kind.merge_strategy(),
    );
    let entry = CacheEntry::new(key.clone(), value, fetched_at);

    let write_error = match store.put(&entry) {
        Ok(()) => None,
        Err(e) => {
            log::warn!("Failed to cache {}: {}", key, e);
            Some(e.to_string())
        }
    };

    Landed {
        value: entry.value,
        fetched_at,
        write_error,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
