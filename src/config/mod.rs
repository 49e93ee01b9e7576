//! Configuration management for devctl

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheStore, DeviceId, TtlTable};
use crate::client::DeviceTarget;
use crate::client::http::DEFAULT_TIMEOUT;
use crate::error::{ConfigError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Named devices
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceEntry>,

    /// Cache location and TTL overrides
    #[serde(default)]
    pub cache: CacheSettings,

    /// User preferences
    #[serde(default)]
    pub preferences: Preferences,
}

/// A configured device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Host, host:port or URL
    pub address: String,

    /// Display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Cache root override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Per-kind TTL overrides in seconds, keyed by kind name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ttl: BTreeMap<String, u64>,
}

/// User preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// Default output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Device request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            format: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".devctl").join("config.yaml"))
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration, treating a missing file as an empty config
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load_from(path) {
            Err(crate::error::Error::Config(ConfigError::NotFound)) => {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        // Set file permissions to 600 on Unix systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, device) in &self.devices {
            if device.address.trim().is_empty() {
                return Err(
                    ConfigError::Invalid(format!("device '{}' has no address", name)).into(),
                );
            }
        }
        Ok(())
    }

    /// Register a named device. Names are unique.
    pub fn add_device(&mut self, name: &str, address: &str, label: Option<String>) -> Result<()> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!("invalid device name '{}'", name)).into());
        }
        if looks_like_address(name) {
            return Err(ConfigError::Invalid(format!(
                "device name '{}' looks like an address",
                name
            ))
            .into());
        }
        if address.trim().is_empty() {
            return Err(ConfigError::Invalid("device address is empty".to_string()).into());
        }
        if self.devices.contains_key(name) {
            return Err(ConfigError::Invalid(format!("device '{}' already exists", name)).into());
        }

        self.devices.insert(
            name.to_string(),
            DeviceEntry {
                address: address.trim().to_string(),
                name: label,
            },
        );
        Ok(())
    }

    pub fn remove_device(&mut self, name: &str) -> Result<DeviceEntry> {
        self.devices
            .remove(name)
            .ok_or_else(|| ConfigError::UnknownDevice(name.to_string()).into())
    }

    /// Resolve a device name or raw address to a target.
    ///
    /// A configured name, or an address belonging to a configured device, is
    /// identified by the device's name so both spellings share cache entries.
    /// Unconfigured addresses are identified by the address itself.
    pub fn resolve_device(&self, name_or_address: &str) -> Result<DeviceTarget> {
        if let Some(device) = self.devices.get(name_or_address) {
            return Ok(DeviceTarget::new(name_or_address, device.address.clone()));
        }

        if let Some((name, device)) = self
            .devices
            .iter()
            .find(|(_, d)| d.address == name_or_address)
        {
            return Ok(DeviceTarget::new(name.as_str(), device.address.clone()));
        }

        if looks_like_address(name_or_address) {
            return Ok(DeviceTarget::new(
                DeviceId::new(name_or_address),
                name_or_address,
            ));
        }

        Err(ConfigError::UnknownDevice(name_or_address.to_string()).into())
    }

    pub fn ttl_table(&self) -> TtlTable {
        TtlTable::with_overrides(self.cache.ttl.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Cache root: explicit override, then config, then the XDG default
    pub fn cache_dir(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = cli_override {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = &self.cache.dir {
            return Ok(dir.clone());
        }
        Ok(CacheStore::cache_dir()?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.preferences.timeout_secs.max(1))
    }
}

/// IPv4/IPv6 literals, host:port, URLs and dotted host names
fn looks_like_address(s: &str) -> bool {
    s.contains("://") || s.contains('.') || s.contains(':')
}
