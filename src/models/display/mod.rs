//! Display model implementations for table and JSON output
//!
//! Display models transform device readings and cache state into
//! CLI-friendly formats with appropriate column names and serialization.

mod cache;
mod common;
mod device;

pub use cache::{CacheEntryDisplay, KindCountDisplay};
pub use common::value_fields;
pub use device::{DeviceDisplay, DeviceReading, ReadingRow};
