//! Output formatting for CLI results

pub mod formatters;
pub mod json;
pub mod table;

pub use json::CacheMeta;
