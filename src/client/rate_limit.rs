//! Per-device rate limiting
//!
//! Reactive: a device's limiter only starts pacing requests after that device
//! answers with a 429. Devices that never complain are never slowed down.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;
use tokio::sync::RwLock;

/// Requests per second allowed to a device once it has rate limited us
pub const LIMITED_RATE_PER_SECOND: u32 = 2;

/// Rate limiter state for a single device.
pub struct DeviceRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    active: AtomicBool,
    address: String,
}

impl DeviceRateLimiter {
    pub fn new(address: &str) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(LIMITED_RATE_PER_SECOND).unwrap_or(NonZeroU32::MIN),
        );

        Self {
            limiter: RateLimiter::direct(quota),
            active: AtomicBool::new(false),
            address: address.to_string(),
        }
    }

    /// Activate rate limiting for this device.
    pub fn activate(&self) {
        let was_active = self.active.swap(true, Ordering::SeqCst);
        if !was_active {
            debug!("Rate limiting activated for {}", self.address);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait for permission if rate limiting is active.
    pub async fn wait_if_active(&self) {
        if self.is_active() {
            debug!("Waiting for rate limiter {}", self.address);
            self.limiter.until_ready().await;
        }
    }
}

/// Rate limiters for every device this process has talked to.
#[derive(Default)]
pub struct RateLimiterSet {
    limiters: RwLock<HashMap<String, Arc<DeviceRateLimiter>>>,
}

impl RateLimiterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for rate limit permission for a device (if active).
    pub async fn wait_for(&self, address: &str) {
        let limiter = self.limiters.read().await.get(address).cloned();
        if let Some(limiter) = limiter {
            limiter.wait_if_active().await;
        }
    }

    /// Activate rate limiting for a device (called on 429).
    pub async fn activate(&self, address: &str) {
        let mut limiters = self.limiters.write().await;
        limiters
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(DeviceRateLimiter::new(address)))
            .activate();
    }

    pub async fn is_active(&self, address: &str) -> bool {
        self.limiters
            .read()
            .await
            .get(address)
            .is_some_and(|l| l.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_rate_limiter_activation() {
        let limiter = DeviceRateLimiter::new("10.0.0.5");
        assert!(!limiter.is_active());

        limiter.activate();
        assert!(limiter.is_active());

        // Second activation should be idempotent
        limiter.activate();
        assert!(limiter.is_active());
    }

    #[tokio::test]
    async fn test_limiters_are_per_device() {
        let set = RateLimiterSet::new();
        assert!(!set.is_active("10.0.0.5").await);

        set.activate("10.0.0.5").await;
        assert!(set.is_active("10.0.0.5").await);
        assert!(!set.is_active("10.0.0.6").await);
    }

    #[tokio::test]
    async fn test_wait_for_unknown_device_returns_immediately() {
        let set = RateLimiterSet::new();
        tokio::time::timeout(std::time::Duration::from_millis(100), set.wait_for("10.0.0.7"))
            .await
            .unwrap();
    }
}
