//! Mock device client for testing
//!
//! Serves canned responses, counts calls per method, and can be told to fail
//! or to answer slowly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use super::models::{CloudStatus, WifiStatus};
use super::{
    AutomationSettings, DeviceApi, DeviceConfig, DeviceInfo, DeviceStatus, FirmwareState,
    NetworkSection, NetworkStatus, ProtocolConfig,
};
use crate::error::{DeviceError, DeviceResult};

/// Mock device for testing.
///
/// # Example
/// ```ignore
/// let mock = MockDeviceClient::new().with_status(status).await;
/// let status = mock.status("10.0.0.5").await?;
/// assert_eq!(mock.call_counts().await.status, 1);
/// ```
pub struct MockDeviceClient {
    info: Arc<Mutex<DeviceInfo>>,
    status: Arc<Mutex<DeviceStatus>>,
    network: Arc<Mutex<NetworkStatus>>,
    config: Arc<Mutex<DeviceConfig>>,
    firmware: Arc<Mutex<FirmwareState>>,
    automation: Arc<Mutex<AutomationSettings>>,
    protocol: Arc<Mutex<ProtocolConfig>>,
    /// Error to return on the next call - consumed on first use
    error: Arc<Mutex<Option<DeviceError>>>,
    /// Error to return on every call
    failing: Arc<Mutex<Option<DeviceError>>>,
    /// Delay before every response
    delay: Arc<Mutex<Option<Duration>>>,
    call_count: Arc<Mutex<CallCounts>>,
    /// Sections requested from each `network_status` call
    network_requests: Arc<Mutex<Vec<Vec<NetworkSection>>>>,
}

impl Default for MockDeviceClient {
    fn default() -> Self {
        Self {
            info: Arc::new(Mutex::new(sample_info())),
            status: Arc::new(Mutex::new(sample_status(true))),
            network: Arc::new(Mutex::new(sample_network())),
            config: Arc::new(Mutex::new(DeviceConfig::default())),
            firmware: Arc::new(Mutex::new(FirmwareState::default())),
            automation: Arc::new(Mutex::new(AutomationSettings::default())),
            protocol: Arc::new(Mutex::new(ProtocolConfig::default())),
            error: Arc::new(Mutex::new(None)),
            failing: Arc::new(Mutex::new(None)),
            delay: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(CallCounts::default())),
            network_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Tracks device calls for test verification
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub device_info: usize,
    pub status: usize,
    pub network_status: usize,
    pub config: usize,
    pub firmware_state: usize,
    pub automation_settings: usize,
    pub protocol_config: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.device_info
            + self.status
            + self.network_status
            + self.config
            + self.firmware_state
            + self.automation_settings
            + self.protocol_config
    }
}

pub fn sample_info() -> DeviceInfo {
    DeviceInfo {
        id: "shellyplus1pm-a8032ab12345".to_string(),
        name: Some("Kitchen".to_string()),
        mac: Some("A8032AB12345".to_string()),
        model: Some("SNSW-001P16EU".to_string()),
        generation: Some(2),
        fw_id: Some("20231107-164738/1.0.8-g".to_string()),
        version: Some("1.0.8".to_string()),
        app: Some("Plus1PM".to_string()),
        auth_en: false,
    }
}

pub fn sample_status(output: bool) -> DeviceStatus {
    let value = json!({
        "switch:0": {"id": 0, "output": output, "apower": 12.5},
        "sys": {"uptime": 1200}
    });
    serde_json::from_value(value).unwrap()
}

/// A Wi-Fi-only device: it has no Ethernet interface to report on
pub fn sample_network() -> NetworkStatus {
    NetworkStatus {
        wifi: Some(Some(WifiStatus {
            sta_ip: Some("192.168.1.20".to_string()),
            status: "got ip".to_string(),
            ssid: Some("home".to_string()),
            rssi: Some(-61),
        })),
        eth: Some(None),
        cloud: Some(Some(CloudStatus { connected: true })),
    }
}

impl MockDeviceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_status(self, status: DeviceStatus) -> Self {
        *self.status.lock().await = status;
        self
    }

    pub async fn with_network(self, network: NetworkStatus) -> Self {
        *self.network.lock().await = network;
        self
    }

    pub async fn with_firmware(self, firmware: FirmwareState) -> Self {
        *self.firmware.lock().await = firmware;
        self
    }

    /// Configure an error to return on the next call.
    /// The error is consumed after one use.
    pub async fn with_error(self, error: DeviceError) -> Self {
        *self.error.lock().await = Some(error);
        self
    }

    /// Make every call fail with `error`.
    pub async fn failing(self, error: DeviceError) -> Self {
        self.set_failing(Some(error)).await;
        self
    }

    pub async fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().await = Some(delay);
        self
    }

    /// Change the live status returned from now on
    pub async fn set_status(&self, status: DeviceStatus) {
        *self.status.lock().await = status;
    }

    pub async fn set_failing(&self, error: Option<DeviceError>) {
        *self.failing.lock().await = error;
    }

    pub async fn call_counts(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }

    pub async fn network_requests(&self) -> Vec<Vec<NetworkSection>> {
        self.network_requests.lock().await.clone()
    }

    /// Apply delay and configured failures, then count the call.
    async fn begin(&self, count: impl FnOnce(&mut CallCounts)) -> DeviceResult<()> {
        count(&mut *self.call_count.lock().await);

        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(e) = self.error.lock().await.take() {
            return Err(e);
        }
        if let Some(e) = self.failing.lock().await.clone() {
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceApi for MockDeviceClient {
    async fn device_info(&self, _address: &str) -> DeviceResult<DeviceInfo> {
        self.begin(|c| c.device_info += 1).await?;
        Ok(self.info.lock().await.clone())
    }

    async fn status(&self, _address: &str) -> DeviceResult<DeviceStatus> {
        self.begin(|c| c.status += 1).await?;
        Ok(self.status.lock().await.clone())
    }

    async fn network_status(
        &self,
        _address: &str,
        sections: &[NetworkSection],
    ) -> DeviceResult<NetworkStatus> {
        self.network_requests.lock().await.push(sections.to_vec());
        self.begin(|c| c.network_status += 1).await?;

        let full = self.network.lock().await.clone();
        let mut partial = NetworkStatus::default();
        for section in sections {
            match section {
                NetworkSection::Wifi => partial.wifi = full.wifi.clone(),
                NetworkSection::Eth => partial.eth = full.eth.clone(),
                NetworkSection::Cloud => partial.cloud = full.cloud.clone(),
            }
        }
        Ok(partial)
    }

    async fn config(&self, _address: &str) -> DeviceResult<DeviceConfig> {
        self.begin(|c| c.config += 1).await?;
        Ok(self.config.lock().await.clone())
    }

    async fn firmware_state(&self, _address: &str) -> DeviceResult<FirmwareState> {
        self.begin(|c| c.firmware_state += 1).await?;
        Ok(self.firmware.lock().await.clone())
    }

    async fn automation_settings(&self, _address: &str) -> DeviceResult<AutomationSettings> {
        self.begin(|c| c.automation_settings += 1).await?;
        Ok(self.automation.lock().await.clone())
    }

    async fn protocol_config(&self, _address: &str) -> DeviceResult<ProtocolConfig> {
        self.begin(|c| c.protocol_config += 1).await?;
        Ok(self.protocol.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client_call_counts() {
        let mock = MockDeviceClient::new();

        mock.status("a").await.unwrap();
        mock.status("a").await.unwrap();
        mock.device_info("a").await.unwrap();

        let counts = mock.call_counts().await;
        assert_eq!(counts.status, 2);
        assert_eq!(counts.device_info, 1);
        assert_eq!(counts.total(), 3);
    }

    #[tokio::test]
    async fn test_mock_client_with_error() {
        let mock = MockDeviceClient::new()
            .with_error(DeviceError::Timeout)
            .await;

        assert_eq!(mock.status("a").await.unwrap_err(), DeviceError::Timeout);

        // Error is consumed, next call succeeds
        assert!(mock.status("a").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_client_failing() {
        let mock = MockDeviceClient::new()
            .failing(DeviceError::AuthRequired)
            .await;

        assert!(mock.status("a").await.is_err());
        assert!(mock.config("a").await.is_err());

        mock.set_failing(None).await;
        assert!(mock.config("a").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_network_returns_requested_sections() {
        let mock = MockDeviceClient::new();

        let partial = mock
            .network_status("a", &[NetworkSection::Cloud])
            .await
            .unwrap();

        assert_eq!(partial.cloud, Some(Some(CloudStatus { connected: true })));
        assert!(partial.wifi.is_none());

        let eth = mock
            .network_status("a", &[NetworkSection::Eth])
            .await
            .unwrap();
        assert_eq!(eth.eth, Some(None));
        assert_eq!(
            mock.network_requests().await,
            vec![vec![NetworkSection::Cloud], vec![NetworkSection::Eth]]
        );
    }
}
