//! Data models returned by device RPC calls

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identity and firmware summary (`Shelly.GetDeviceInfo`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device ID, e.g. `shellyplus1pm-a8032ab12345`
    pub id: String,

    /// User-assigned device name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    /// Hardware model code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Device generation
    #[serde(rename = "gen", default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fw_id: Option<String>,

    /// Firmware version
    #[serde(rename = "ver", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Application name (product family)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,

    /// Whether authentication is enabled
    #[serde(default)]
    pub auth_en: bool,
}

/// Live status of every component (`Shelly.GetStatus`).
///
/// Keyed by component id (`switch:0`, `sys`, `wifi`, ...). The component set
/// differs per model, so values stay untyped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    #[serde(flatten)]
    pub components: BTreeMap<String, Value>,
}

impl DeviceStatus {
    /// Output state of every `switch:N` component
    pub fn switches(&self) -> Vec<(&str, Option<bool>)> {
        self.components
            .iter()
            .filter(|(id, _)| id.starts_with("switch:"))
            .map(|(id, v)| (id.as_str(), v.get("output").and_then(Value::as_bool)))
            .collect()
    }
}

/// Full component configuration (`Shelly.GetConfig`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(flatten)]
    pub components: BTreeMap<String, Value>,
}

/// Published firmware available for update (`Shelly.CheckForUpdate`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirmwareState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable: Option<FirmwareRelease>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<FirmwareRelease>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmwareRelease {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
}

/// Scripts and scheduled jobs on the device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomationSettings {
    #[serde(default)]
    pub scripts: Vec<Script>,

    #[serde(default)]
    pub schedules: Vec<ScheduleJob>,
}

/// Entry of `Script.List`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub id: u32,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub enable: bool,

    #[serde(default)]
    pub running: bool,
}

/// Entry of `Schedule.List`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleJob {
    pub id: u32,

    #[serde(default)]
    pub enable: bool,

    /// Cron-like schedule expression
    pub timespec: String,

    /// RPC calls made when the job fires
    #[serde(default)]
    pub calls: Vec<Value>,
}

/// MQTT and outbound websocket settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt: Option<MqttConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws: Option<WsConfig>,
}

/// `Mqtt.GetConfig`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MqttConfig {
    #[serde(default)]
    pub enable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_prefix: Option<String>,
}

/// `Ws.GetConfig`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WsConfig {
    #[serde(default)]
    pub enable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
}

/// Network detail. Each section is fetched on its own, so any of them may be
/// missing from a single response; unfetched sections are not serialized.
///
/// A section is `None` until fetched and `Some(None)` once the device has
/// answered that it has no such interface, which serializes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatus {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "known")]
    pub wifi: Option<Option<WifiStatus>>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "known")]
    pub eth: Option<Option<EthStatus>>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "known")]
    pub cloud: Option<Option<CloudStatus>>,
}

/// A field that is present is known, even when it is `null`
fn known<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl NetworkStatus {
    /// Whether the section has been fetched, including a confirmed absence
    pub fn has(&self, section: NetworkSection) -> bool {
        match section {
            NetworkSection::Wifi => self.wifi.is_some(),
            NetworkSection::Eth => self.eth.is_some(),
            NetworkSection::Cloud => self.cloud.is_some(),
        }
    }

    pub fn wifi(&self) -> Option<&WifiStatus> {
        self.wifi.as_ref().and_then(Option::as_ref)
    }

    pub fn eth(&self) -> Option<&EthStatus> {
        self.eth.as_ref().and_then(Option::as_ref)
    }

    pub fn cloud(&self) -> Option<&CloudStatus> {
        self.cloud.as_ref().and_then(Option::as_ref)
    }
}

/// `Wifi.GetStatus`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WifiStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sta_ip: Option<String>,

    /// `got ip`, `connecting`, `disconnected`, ...
    #[serde(default)]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,

    /// Signal strength in dBm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
}

/// `Eth.GetStatus`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EthStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// `Cloud.GetStatus`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudStatus {
    #[serde(default)]
    pub connected: bool,
}

/// Independently fetchable part of [`NetworkStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum NetworkSection {
    Wifi,
    Eth,
    Cloud,
}

impl NetworkSection {
    pub const ALL: [NetworkSection; 3] = [
        NetworkSection::Wifi,
        NetworkSection::Eth,
        NetworkSection::Cloud,
    ];

    /// Field name inside [`NetworkStatus`]
    pub fn field(&self) -> &'static str {
        match self {
            NetworkSection::Wifi => "wifi",
            NetworkSection::Eth => "eth",
            NetworkSection::Cloud => "cloud",
        }
    }

    pub fn rpc_method(&self) -> &'static str {
        match self {
            NetworkSection::Wifi => "Wifi.GetStatus",
            NetworkSection::Eth => "Eth.GetStatus",
            NetworkSection::Cloud => "Cloud.GetStatus",
        }
    }
}
