//! Display models for CLI output

pub mod display;

pub use display::{
    CacheEntryDisplay, DeviceDisplay, DeviceReading, KindCountDisplay, ReadingRow, value_fields,
};
