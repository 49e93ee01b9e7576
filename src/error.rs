//! Error types for the devctl CLI

use std::time::Duration;
use thiserror::Error;

/// Result type alias for devctl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for device transport calls
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation failed: {0}")]
    Other(String),
}

/// Device transport errors.
///
/// `Clone` because a single in-flight fetch result is handed to every caller
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Device unreachable: {0}")]
    Unreachable(String),

    #[error("Device request timed out")]
    Timeout,

    #[error("Device requires authentication")]
    AuthRequired,

    #[error("Device rate limit exceeded. Retry after {0:?}")]
    RateLimited(Duration),

    #[error("Device RPC failed ({code}): {message}")]
    Rpc { code: u16, message: String },

    #[error("Invalid device response: {0}")]
    InvalidResponse(String),

    #[error("Device fetch aborted: {0}")]
    Aborted(String),
}

impl From<reqwest::Error> for DeviceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DeviceError::Timeout
        } else if err.is_connect() {
            DeviceError::Unreachable("Failed to connect to device".to_string())
        } else if err.is_decode() {
            DeviceError::InvalidResponse(err.to_string())
        } else {
            DeviceError::Unreachable(err.to_string())
        }
    }
}

/// Cache-related errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Could not determine cache directory")]
    NoHome,

    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Failed to encode cache entry: {0}")]
    Encode(String),

    #[error("Cached value could not be decoded: {0}")]
    Decode(String),

    #[error("No cached {kind} for '{device}', and offline mode forbids fetching")]
    OfflineMiss { device: String, kind: String },
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Run `devctl device add` to create one.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("Unknown device '{0}'. Run `devctl device list` to see configured devices.")]
    UnknownDevice(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_rate_limit() {
        let err = DeviceError::RateLimited(Duration::from_secs(30));
        let msg = err.to_string();
        assert!(msg.contains("rate limit"));
        assert!(msg.contains("30"));
    }

    #[test]
    fn test_device_error_rpc() {
        let err = DeviceError::Rpc {
            code: 404,
            message: "No handler for Foo.Bar".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("Foo.Bar"));
    }

    #[test]
    fn test_device_error_is_clone() {
        let err = DeviceError::Unreachable("10.0.0.9".to_string());
        assert_eq!(err.clone(), err);
    }

    #[test]
    fn test_cache_error_offline_miss_message() {
        let err = CacheError::OfflineMiss {
            device: "kitchen".to_string(),
            kind: "status".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("kitchen"));
        assert!(msg.contains("status"));
        assert!(msg.contains("offline"));
    }

    #[test]
    fn test_config_error_unknown_device() {
        let err = ConfigError::UnknownDevice("garage".to_string());
        assert!(err.to_string().contains("garage"));
        assert!(err.to_string().contains("devctl device list"));
    }

    #[test]
    fn test_error_from_device_error() {
        let err: Error = DeviceError::Timeout.into();

        match err {
            Error::Device(DeviceError::Timeout) => (),
            _ => panic!("Expected Error::Device(DeviceError::Timeout)"),
        }
    }

    #[test]
    fn test_error_from_cache_error() {
        let err: Error = CacheError::NoHome.into();

        match err {
            Error::Cache(CacheError::NoHome) => (),
            _ => panic!("Expected Error::Cache(CacheError::NoHome)"),
        }
    }

    #[test]
    fn test_config_error_from_yaml_error() {
        let yaml_str = "invalid: [yaml: content";
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let config_err: ConfigError = yaml_err.into();

        match config_err {
            ConfigError::ParseError(_) => (),
            _ => panic!("Expected ConfigError::ParseError"),
        }
    }
}
