//! Device transport boundary

use async_trait::async_trait;

use crate::cache::DeviceId;
use crate::error::DeviceResult;

pub mod http;
#[cfg(test)]
pub mod mock;
pub mod models;
pub mod rate_limit;

pub use http::HttpDeviceClient;
#[cfg(test)]
pub use mock::MockDeviceClient;
pub use models::{
    AutomationSettings, DeviceConfig, DeviceInfo, DeviceStatus, FirmwareState, NetworkSection,
    NetworkStatus, ProtocolConfig, ScheduleJob, Script,
};

/// A device as the rest of the program addresses it: the cache identity plus
/// where to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    pub id: DeviceId,
    pub address: String,
}

impl DeviceTarget {
    pub fn new(id: impl Into<DeviceId>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }
}

/// Device RPC client trait, one method per cached data kind
#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn device_info(&self, address: &str) -> DeviceResult<DeviceInfo>;

    async fn status(&self, address: &str) -> DeviceResult<DeviceStatus>;

    /// Fetch only the listed sections; the rest are left unset.
    async fn network_status(
        &self,
        address: &str,
        sections: &[NetworkSection],
    ) -> DeviceResult<NetworkStatus>;

    async fn config(&self, address: &str) -> DeviceResult<DeviceConfig>;

    async fn firmware_state(&self, address: &str) -> DeviceResult<FirmwareState>;

    async fn automation_settings(&self, address: &str) -> DeviceResult<AutomationSettings>;

    async fn protocol_config(&self, address: &str) -> DeviceResult<ProtocolConfig>;
}
