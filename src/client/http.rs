//! HTTP RPC device client
//!
//! Devices expose every RPC method as `GET <address>/rpc/<Method>` returning
//! a JSON body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::rate_limit::RateLimiterSet;
use super::{
    AutomationSettings, DeviceApi, DeviceConfig, DeviceInfo, DeviceStatus, FirmwareState,
    NetworkSection, NetworkStatus, ProtocolConfig, Script, ScheduleJob,
};
use crate::error::{DeviceError, DeviceResult};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Wait suggested by a 429 without a usable `retry-after` header
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Device client speaking HTTP RPC
pub struct HttpDeviceClient {
    http: HttpClient,
    rate_limiters: RateLimiterSet,
}

impl HttpDeviceClient {
    pub fn new(timeout: Duration) -> DeviceResult<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("devctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeviceError::Unreachable(e.to_string()))?;

        Ok(Self {
            http,
            rate_limiters: RateLimiterSet::new(),
        })
    }

    /// Call one RPC method and decode its result
    async fn call<T: DeserializeOwned>(&self, address: &str, method: &str) -> DeviceResult<T> {
        self.rate_limiters.wait_for(address).await;

        let url = rpc_url(address, method);
        log::debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        match status {
            StatusCode::OK => response.json::<T>().await.map_err(|e| {
                DeviceError::InvalidResponse(format!("{} returned an unexpected body: {}", method, e))
            }),
            StatusCode::UNAUTHORIZED => Err(DeviceError::AuthRequired),
            StatusCode::TOO_MANY_REQUESTS => {
                self.rate_limiters.activate(address).await;
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                Err(DeviceError::RateLimited(Duration::from_secs(retry_after)))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(DeviceError::Rpc {
                    code: status.as_u16(),
                    message: rpc_error_message(&body).unwrap_or_else(|| {
                        format!("{} failed with status {}", method, status)
                    }),
                })
            }
        }
    }

    /// Fetch one network section; `None` when the device has no such interface
    async fn section<T: DeserializeOwned>(
        &self,
        address: &str,
        section: NetworkSection,
    ) -> DeviceResult<Option<T>> {
        match self.call(address, section.rpc_method()).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if is_missing_handler(&e) => {
                log::debug!("{} has no {} interface: {}", address, section.field(), e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Devices answer methods for components they lack with 404 "No handler"
fn is_missing_handler(err: &DeviceError) -> bool {
    match err {
        DeviceError::Rpc { code, message } => *code == 404 || message.starts_with("No handler"),
        _ => false,
    }
}

/// Build the URL of an RPC method; bare host addresses default to http.
fn rpc_url(address: &str, method: &str) -> String {
    let base = address.trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{}/rpc/{}", base, method)
    } else {
        format!("http://{}/rpc/{}", base, method)
    }
}

/// Devices report RPC failures as `{"code": .., "message": ".."}`
fn rpc_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct RpcError {
        message: String,
    }

    serde_json::from_str::<RpcError>(body)
        .map(|e| e.message)
        .ok()
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
}

#[async_trait]
impl DeviceApi for HttpDeviceClient {
    async fn device_info(&self, address: &str) -> DeviceResult<DeviceInfo> {
        self.call(address, "Shelly.GetDeviceInfo").await
    }

    async fn status(&self, address: &str) -> DeviceResult<DeviceStatus> {
        self.call(address, "Shelly.GetStatus").await
    }

    async fn network_status(
        &self,
        address: &str,
        sections: &[NetworkSection],
    ) -> DeviceResult<NetworkStatus> {
        let mut status = NetworkStatus::default();
        for &section in sections {
            match section {
                NetworkSection::Wifi => status.wifi = Some(self.section(address, section).await?),
                NetworkSection::Eth => status.eth = Some(self.section(address, section).await?),
                NetworkSection::Cloud => status.cloud = Some(self.section(address, section).await?),
            }
        }
        Ok(status)
    }

    async fn config(&self, address: &str) -> DeviceResult<DeviceConfig> {
        self.call(address, "Shelly.GetConfig").await
    }

    async fn firmware_state(&self, address: &str) -> DeviceResult<FirmwareState> {
        self.call(address, "Shelly.CheckForUpdate").await
    }

    async fn automation_settings(&self, address: &str) -> DeviceResult<AutomationSettings> {
        #[derive(Deserialize)]
        struct ScriptList {
            #[serde(default)]
            scripts: Vec<Script>,
        }

        #[derive(Deserialize)]
        struct ScheduleList {
            #[serde(default)]
            jobs: Vec<ScheduleJob>,
        }

        let scripts: ScriptList = self.call(address, "Script.List").await?;
        let schedules: ScheduleList = self.call(address, "Schedule.List").await?;

        Ok(AutomationSettings {
            scripts: scripts.scripts,
            schedules: schedules.jobs,
        })
    }

    async fn protocol_config(&self, address: &str) -> DeviceResult<ProtocolConfig> {
        Ok(ProtocolConfig {
            mqtt: Some(self.call(address, "Mqtt.GetConfig").await?),
            ws: Some(self.call(address, "Ws.GetConfig").await?),
        })
    }
}
