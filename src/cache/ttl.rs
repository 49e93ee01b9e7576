//! Maximum age per data kind

use std::collections::HashMap;
use std::time::Duration;

use super::key::Kind;

/// Default cache TTL per data kind
pub struct CacheTtl;

impl CacheTtl {
    // Live readings - power, switch output, temperatures
    pub const STATUS: Duration = Duration::from_secs(5); // 5 sec

    // Network detail is only fetched when someone looks at it
    pub const NETWORK_STATUS: Duration = Duration::from_secs(30); // 30 sec

    // Changed by users, not by the device itself
    pub const CONFIG: Duration = Duration::from_secs(5 * 60); // 5 min
    pub const AUTOMATION: Duration = Duration::from_secs(5 * 60); // 5 min
    pub const PROTOCOL: Duration = Duration::from_secs(5 * 60); // 5 min

    // Rarely changing data
    pub const FIRMWARE: Duration = Duration::from_secs(60 * 60); // 1 hr
    pub const DEVICE_INFO: Duration = Duration::from_secs(24 * 60 * 60); // 24 hr

    fn default_for(kind: &Kind) -> Option<Duration> {
        match kind {
            Kind::DeviceInfo => Some(Self::DEVICE_INFO),
            Kind::Status => Some(Self::STATUS),
            Kind::NetworkStatus => Some(Self::NETWORK_STATUS),
            Kind::Config => Some(Self::CONFIG),
            Kind::FirmwareState => Some(Self::FIRMWARE),
            Kind::AutomationSettings => Some(Self::AUTOMATION),
            Kind::ProtocolConfig => Some(Self::PROTOCOL),
            Kind::Other(_) => None,
        }
    }
}

/// Effective TTL lookup: built-in defaults plus configured overrides.
///
/// Kinds with no entry (unknown kinds read back from disk) get the shortest
/// TTL in the table, never an unbounded one.
#[derive(Debug, Clone, Default)]
pub struct TtlTable {
    overrides: HashMap<Kind, Duration>,
}

impl TtlTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from per-kind overrides in seconds, as read from config.
    pub fn with_overrides<'a>(overrides: impl IntoIterator<Item = (&'a str, u64)>) -> Self {
        let mut table = Self::new();
        for (name, secs) in overrides {
            let kind: Kind = name.to_string().into();
            log::debug!("TTL override: {} = {}s", kind, secs);
            table.overrides.insert(kind, Duration::from_secs(secs));
        }
        table
    }

    pub fn set(&mut self, kind: Kind, ttl: Duration) {
        self.overrides.insert(kind, ttl);
    }

    /// Maximum age for `kind`.
    pub fn ttl(&self, kind: &Kind) -> Duration {
        self.overrides
            .get(kind)
            .copied()
            .or_else(|| CacheTtl::default_for(kind))
            .unwrap_or_else(|| self.shortest())
    }

    /// Shortest TTL among every listed kind, overrides included.
    pub fn shortest(&self) -> Duration {
        Kind::KNOWN
            .iter()
            .filter_map(|k| {
                self.overrides
                    .get(k)
                    .copied()
                    .or_else(|| CacheTtl::default_for(k))
            })
            .chain(self.overrides.values().copied())
            .min()
            .unwrap_or(CacheTtl::STATUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let table = TtlTable::new();
        assert_eq!(table.ttl(&Kind::Status), CacheTtl::STATUS);
        assert_eq!(table.ttl(&Kind::DeviceInfo), CacheTtl::DEVICE_INFO);
        assert_eq!(table.ttl(&Kind::FirmwareState), CacheTtl::FIRMWARE);
    }

    #[test]
    fn test_unlisted_kind_gets_shortest() {
        let table = TtlTable::new();
        let ttl = table.ttl(&Kind::Other("energy_meter".to_string()));
        assert_eq!(ttl, CacheTtl::STATUS);
    }

    #[test]
    fn test_override_applies() {
        let table = TtlTable::with_overrides([("config", 42)]);
        assert_eq!(table.ttl(&Kind::Config), Duration::from_secs(42));
        assert_eq!(table.ttl(&Kind::Status), CacheTtl::STATUS);
    }

    #[test]
    fn test_shorter_override_lowers_unlisted_default() {
        let table = TtlTable::with_overrides([("firmware", 2)]);
        let ttl = table.ttl(&Kind::Other("mystery".to_string()));
        assert_eq!(ttl, Duration::from_secs(2));
    }

    #[test]
    fn test_longer_status_override_raises_shortest() {
        let table = TtlTable::with_overrides([("status", 60)]);
        // network_status (30s) is now the shortest listed TTL
        assert_eq!(table.shortest(), CacheTtl::NETWORK_STATUS);
    }

    #[test]
    fn test_override_for_unknown_kind_is_honoured() {
        let table = TtlTable::with_overrides([("energy_meter", 120)]);
        assert_eq!(
            table.ttl(&Kind::Other("energy_meter".to_string())),
            Duration::from_secs(120)
        );
    }
}
