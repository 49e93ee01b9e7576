//! Device display models

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use super::common::truncate_string;
use crate::cache::{DeviceId, Kind, Resolved};
use crate::client::{
    AutomationSettings, DeviceConfig, DeviceInfo, DeviceStatus, FirmwareState, NetworkStatus,
    ProtocolConfig,
};
use crate::config::DeviceEntry;
use crate::output::CacheMeta;
use crate::output::formatters::freshness_cell;

/// One-line description of a device reading, for tables and watch output
pub trait Summarize {
    fn summary(&self) -> String;
}

impl Summarize for DeviceInfo {
    fn summary(&self) -> String {
        format!(
            "{} {} ({})",
            self.app.as_deref().unwrap_or("unknown"),
            self.version.as_deref().unwrap_or("?"),
            self.id
        )
    }
}

impl Summarize for DeviceStatus {
    fn summary(&self) -> String {
        let switches = self.switches();
        if switches.is_empty() {
            return format!("{} components", self.components.len());
        }
        switches
            .iter()
            .map(|(id, output)| {
                let state = match output {
                    Some(true) => "on",
                    Some(false) => "off",
                    None => "?",
                };
                format!("{} {}", id, state)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Summarize for DeviceConfig {
    fn summary(&self) -> String {
        format!("{} components", self.components.len())
    }
}

impl Summarize for FirmwareState {
    fn summary(&self) -> String {
        match (&self.stable, &self.beta) {
            (Some(stable), _) => format!("update {} available", stable.version),
            (None, Some(beta)) => format!("up to date (beta {} available)", beta.version),
            (None, None) => "up to date".to_string(),
        }
    }
}

impl Summarize for AutomationSettings {
    fn summary(&self) -> String {
        let running = self.scripts.iter().filter(|s| s.running).count();
        format!(
            "{} scripts ({} running), {} schedules",
            self.scripts.len(),
            running,
            self.schedules.len()
        )
    }
}

impl Summarize for ProtocolConfig {
    fn summary(&self) -> String {
        let mqtt = match &self.mqtt {
            Some(m) if m.enable => format!("mqtt on ({})", m.server.as_deref().unwrap_or("-")),
            Some(_) => "mqtt off".to_string(),
            None => "mqtt ?".to_string(),
        };
        let ws = match &self.ws {
            Some(w) if w.enable => "ws on",
            Some(_) => "ws off",
            None => "ws ?",
        };
        format!("{}, {}", mqtt, ws)
    }
}

impl Summarize for NetworkStatus {
    fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(wifi) = self.wifi() {
            let mut part = format!("wifi {}", wifi.ssid.as_deref().unwrap_or(&wifi.status));
            if let Some(rssi) = wifi.rssi {
                part.push_str(&format!(" {}dBm", rssi));
            }
            parts.push(part);
        }
        if let Some(eth) = self.eth() {
            parts.push(format!("eth {}", eth.ip.as_deref().unwrap_or("down")));
        }
        if let Some(cloud) = self.cloud() {
            let state = if cloud.connected { "connected" } else { "offline" };
            parts.push(format!("cloud {}", state));
        }
        if parts.is_empty() {
            "no sections".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// A resolved reading of one kind for one device, ready for any output format
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReading {
    pub device: DeviceId,
    pub kind: Kind,
    #[serde(skip)]
    pub summary: String,
    pub value: Value,
    pub cache: CacheMeta,
}

impl DeviceReading {
    pub fn new<T: Serialize + Summarize>(
        device: &DeviceId,
        kind: Kind,
        resolved: &Resolved<T>,
        now: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            device: device.clone(),
            kind,
            summary: resolved.value.summary(),
            value: serde_json::to_value(&resolved.value)?,
            cache: CacheMeta::new(resolved, now),
        })
    }
}

/// Reading display model for table output.
#[derive(Debug, Clone, Tabled)]
pub struct ReadingRow {
    #[tabled(rename = "DEVICE")]
    pub device: String,

    #[tabled(rename = "KIND")]
    pub kind: String,

    #[tabled(rename = "SUMMARY")]
    pub summary: String,

    #[tabled(rename = "UPDATED")]
    pub updated: String,

    #[tabled(rename = "SOURCE")]
    pub source: String,
}

impl From<&DeviceReading> for ReadingRow {
    fn from(reading: &DeviceReading) -> Self {
        Self {
            device: reading.device.to_string(),
            kind: reading.kind.to_string(),
            summary: truncate_string(&reading.summary, 60),
            updated: freshness_cell(&reading.cache),
            source: reading.cache.source.clone(),
        }
    }
}

/// Configured device display model for table/JSON output.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct DeviceDisplay {
    #[tabled(rename = "NAME")]
    pub name: String,

    #[tabled(rename = "ADDRESS")]
    pub address: String,

    #[tabled(rename = "LABEL")]
    pub label: String,
}

impl From<(&String, &DeviceEntry)> for DeviceDisplay {
    fn from((name, device): (&String, &DeviceEntry)) -> Self {
        Self {
            name: name.clone(),
            address: device.address.clone(),
            label: device.name.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Source;
    use crate::client::mock::{sample_info, sample_network, sample_status};
    use crate::client::models::{EthStatus, FirmwareRelease, MqttConfig, Script, WsConfig};

    #[test]
    fn test_status_summary() {
        assert_eq!(sample_status(true).summary(), "switch:0 on");
        assert_eq!(DeviceStatus::default().summary(), "0 components");
    }

    #[test]
    fn test_info_summary() {
        assert_eq!(
            sample_info().summary(),
            "Plus1PM 1.0.8 (shellyplus1pm-a8032ab12345)"
        );
    }

    #[test]
    fn test_network_summary() {
        assert_eq!(
            sample_network().summary(),
            "wifi home -61dBm, cloud connected"
        );

        let wired = NetworkStatus {
            eth: Some(Some(EthStatus { ip: None })),
            ..Default::default()
        };
        assert_eq!(wired.summary(), "eth down");
        assert_eq!(NetworkStatus::default().summary(), "no sections");
    }

    #[test]
    fn test_firmware_summary() {
        let state = FirmwareState {
            stable: Some(FirmwareRelease {
                version: "1.1.0".to_string(),
                build_id: None,
            }),
            beta: None,
        };
        assert_eq!(state.summary(), "update 1.1.0 available");
        assert_eq!(FirmwareState::default().summary(), "up to date");
    }

    #[test]
    fn test_automation_and_protocol_summary() {
        let automation = AutomationSettings {
            scripts: vec![Script {
                id: 1,
                name: "night".to_string(),
                enable: true,
                running: true,
            }],
            schedules: vec![],
        };
        assert_eq!(automation.summary(), "1 scripts (1 running), 0 schedules");

        let protocol = ProtocolConfig {
            mqtt: Some(MqttConfig {
                enable: true,
                server: Some("broker:1883".to_string()),
                ..Default::default()
            }),
            ws: Some(WsConfig::default()),
        };
        assert_eq!(protocol.summary(), "mqtt on (broker:1883), ws off");
    }

    #[test]
    fn test_reading_row() {
        let fetched_at = Utc::now();
        let resolved = Resolved {
            value: sample_status(false),
            stale: true,
            fetched_at,
            source: Source::Cache,
            fetch_error: None,
            write_error: None,
        };
        let reading = DeviceReading::new(
            &DeviceId::new("kitchen"),
            Kind::Status,
            &resolved,
            fetched_at + chrono::Duration::seconds(7),
        )
        .unwrap();

        let row = ReadingRow::from(&reading);
        assert_eq!(row.device, "kitchen");
        assert_eq!(row.kind, "status");
        assert_eq!(row.summary, "switch:0 off");
        assert_eq!(row.updated, "7s ago (stale)");
        assert_eq!(row.source, "cache");
    }
}
