//! Local cache for device data
//!
//! A persistent, TTL-governed store keyed by (device, kind), with
//! fetch-or-serve coordination on top. Every CLI invocation is a new process,
//! so the store lives on disk; concurrent callers inside one process share
//! in-flight fetches.

pub mod admin;
pub mod client;
pub mod clock;
pub mod codec;
pub mod coordinator;
pub mod key;
pub mod merge;
pub mod storage;
pub mod ttl;

// Re-export main types
pub use admin::{CacheAdmin, ClearScope};
pub use client::CachedDeviceClient;
pub use coordinator::{FetchCoordinator, ReadMode, Resolved, Source};
pub use key::{DeviceId, Kind};
pub use storage::CacheStore;
pub use ttl::TtlTable;
