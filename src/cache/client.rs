//! Cached wrapper for a device client
//!
//! Every read goes through the [`FetchCoordinator`], so freshness, offline
//! and refresh modes, deduplication and stale fallback apply uniformly.

use std::future::Future;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};

use super::coordinator::{FetchCoordinator, ReadMode, Resolved};
use super::key::{CacheKey, Kind};
use crate::client::{
    AutomationSettings, DeviceApi, DeviceConfig, DeviceInfo, DeviceStatus, DeviceTarget,
    FirmwareState, NetworkSection, NetworkStatus, ProtocolConfig,
};
use crate::error::{DeviceResult, Result};

/// Cached wrapper for any [`DeviceApi`] implementation.
pub struct CachedDeviceClient<C: DeviceApi> {
    inner: Arc<C>,
    coordinator: Arc<FetchCoordinator>,
    mode: ReadMode,
}

impl<C: DeviceApi> Clone for CachedDeviceClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            coordinator: self.coordinator.clone(),
            mode: self.mode,
        }
    }
}

impl<C: DeviceApi + 'static> CachedDeviceClient<C> {
    pub fn new(inner: Arc<C>, coordinator: Arc<FetchCoordinator>, mode: ReadMode) -> Self {
        Self {
            inner,
            coordinator,
            mode,
        }
    }

    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    pub fn coordinator(&self) -> &FetchCoordinator {
        &self.coordinator
    }

    pub async fn device_info(&self, target: &DeviceTarget) -> Result<Resolved<DeviceInfo>> {
        self.resolve(target, Kind::DeviceInfo, self.mode, |api, address| async move {
            api.device_info(&address).await
        })
        .await
    }

    pub async fn status(&self, target: &DeviceTarget) -> Result<Resolved<DeviceStatus>> {
        self.resolve(target, Kind::Status, self.mode, |api, address| async move {
            api.status(&address).await
        })
        .await
    }

    pub async fn config(&self, target: &DeviceTarget) -> Result<Resolved<DeviceConfig>> {
        self.resolve(target, Kind::Config, self.mode, |api, address| async move {
            api.config(&address).await
        })
        .await
    }

    pub async fn firmware_state(&self, target: &DeviceTarget) -> Result<Resolved<FirmwareState>> {
        self.resolve(target, Kind::FirmwareState, self.mode, |api, address| async move {
            api.firmware_state(&address).await
        })
        .await
    }

    pub async fn automation_settings(
        &self,
        target: &DeviceTarget,
    ) -> Result<Resolved<AutomationSettings>> {
        self.resolve(
            target,
            Kind::AutomationSettings,
            self.mode,
            |api, address| async move { api.automation_settings(&address).await },
        )
        .await
    }

    pub async fn protocol_config(&self, target: &DeviceTarget) -> Result<Resolved<ProtocolConfig>> {
        self.resolve(target, Kind::ProtocolConfig, self.mode, |api, address| async move {
            api.protocol_config(&address).await
        })
        .await
    }

    /// Network detail for the requested sections, merged into what is cached.
    ///
    /// A cached value that is fresh but lacks a requested section does not
    /// count as a hit; the missing sections are fetched. A section the device
    /// reported as absent is cached as `null` and counts as present.
    pub async fn network_status(
        &self,
        target: &DeviceTarget,
        sections: &[NetworkSection],
    ) -> Result<Resolved<NetworkStatus>> {
        let sections = if sections.is_empty() {
            NetworkSection::ALL.to_vec()
        } else {
            sections.to_vec()
        };

        let mut mode = self.mode;
        if mode == ReadMode::Normal {
            let key = CacheKey::new(target.id.clone(), Kind::NetworkStatus);
            if let Some(entry) = self.coordinator.store().get(&key) {
                let missing: Vec<NetworkSection> = sections
                    .iter()
                    .copied()
                    .filter(|s| !entry.value.as_object().is_some_and(|o| o.contains_key(s.field())))
                    .collect();
                if !missing.is_empty() {
                    log::debug!("Cached network status for {} lacks {:?}", target.id, missing);
                    mode = ReadMode::ForceRefresh;
                }
            }
        }

        let resolved = self.fetch_network(target, mode, sections.clone()).await?;

        // Joining a fetch started for other sections leaves ours out
        let missing = missing_sections(&resolved.value, &sections);
        if missing.is_empty() || mode == ReadMode::OfflineOnly || resolved.fetch_error.is_some() {
            if !missing.is_empty() {
                log::debug!("Network status for {} lacks {:?}", target.id, missing);
            }
            return Ok(resolved);
        }

        log::debug!("Joined fetch for {} lacked {:?}; fetching them", target.id, missing);
        let resolved = self
            .fetch_network(target, ReadMode::ForceRefresh, missing)
            .await?;
        let still_missing = missing_sections(&resolved.value, &sections);
        if !still_missing.is_empty() {
            log::warn!(
                "Network status for {} is missing {:?}",
                target.id,
                still_missing
            );
        }
        Ok(resolved)
    }

    async fn fetch_network(
        &self,
        target: &DeviceTarget,
        mode: ReadMode,
        sections: Vec<NetworkSection>,
    ) -> Result<Resolved<NetworkStatus>> {
        self.resolve(target, Kind::NetworkStatus, mode, move |api, address| async move {
            api.network_status(&address, &sections).await
        })
        .await
    }

    async fn resolve<T, F, Fut>(
        &self,
        target: &DeviceTarget,
        kind: Kind,
        mode: ReadMode,
        call: F,
    ) -> Result<Resolved<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(Arc<C>, String) -> Fut + Send + 'static,
        Fut: Future<Output = DeviceResult<T>> + Send + 'static,
    {
        let key = CacheKey::new(target.id.clone(), kind);
        let inner = self.inner.clone();
        let address = target.address.clone();

        self.coordinator
            .resolve(&key, mode, move || call(inner, address))
            .await
    }
}

fn missing_sections(status: &NetworkStatus, wanted: &[NetworkSection]) -> Vec<NetworkSection> {
    wanted.iter().copied().filter(|s| !status.has(*s)).collect()
}
