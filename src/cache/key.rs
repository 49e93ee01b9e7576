//! Cache keys: device identity plus data kind

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable identifier of a device (configured name or raw address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the storage unit holding every kind for this device.
    ///
    /// A readable slug of the id followed by a SHA-256 prefix, so distinct ids
    /// that slug identically still land in distinct files.
    pub fn unit_file_name(&self) -> String {
        let slug: String = self
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .take(32)
            .collect();

        let digest = format!("{:x}", Sha256::digest(self.0.as_bytes()));
        format!("{}-{}.json", slug, &digest[..12])
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// How a fresh fetch combines with the value already cached for its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// The fetch is always complete: new replaces old.
    Replace,
    /// The fetch may be partial: field-level union, new fields win.
    Union,
}

/// Category of device data. Each kind has its own TTL and merge class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Kind {
    DeviceInfo,
    Status,
    /// WiFi/Ethernet/cloud detail, fetched per section on demand
    NetworkStatus,
    Config,
    FirmwareState,
    AutomationSettings,
    ProtocolConfig,
    /// A kind this build does not know about
    Other(String),
}

impl Kind {
    /// All kinds known to this build.
    pub const KNOWN: [Kind; 7] = [
        Kind::DeviceInfo,
        Kind::Status,
        Kind::NetworkStatus,
        Kind::Config,
        Kind::FirmwareState,
        Kind::AutomationSettings,
        Kind::ProtocolConfig,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Kind::DeviceInfo => "device_info",
            Kind::Status => "status",
            Kind::NetworkStatus => "network_status",
            Kind::Config => "config",
            Kind::FirmwareState => "firmware",
            Kind::AutomationSettings => "automation",
            Kind::ProtocolConfig => "protocol",
            Kind::Other(name) => name,
        }
    }

    /// Static merge class of this kind.
    pub fn merge_strategy(&self) -> MergeStrategy {
        match self {
            Kind::NetworkStatus => MergeStrategy::Union,
            _ => MergeStrategy::Replace,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "device_info" => Kind::DeviceInfo,
            "status" => Kind::Status,
            "network_status" => Kind::NetworkStatus,
            "config" => Kind::Config,
            "firmware" => Kind::FirmwareState,
            "automation" => Kind::AutomationSettings,
            "protocol" => Kind::ProtocolConfig,
            other => Kind::Other(other.to_string()),
        })
    }
}

impl From<String> for Kind {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<Kind> for String {
    fn from(kind: Kind) -> Self {
        kind.as_str().to_string()
    }
}

/// One cacheable fact about one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub device: DeviceId,
    pub kind: Kind,
}

impl CacheKey {
    pub fn new(device: impl Into<DeviceId>, kind: Kind) -> Self {
        Self {
            device: device.into(),
            kind,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device, self.kind)
    }
}
