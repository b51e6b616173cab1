//! Latency and availability monitor for the schematic manifest API.
//!
//! Each scenario fires a batch of identical concurrent calls, times the
//! batch as a whole, buckets the response statuses, and appends one row per
//! batch to a results store (SQLite or CSV). The primary user-facing
//! interface is the `apimon` command-line application.
pub mod args;
pub mod batch;
pub mod config;
mod entry;
pub mod error;
pub mod http;
pub mod scenarios;
pub mod store;
pub mod system;

pub use entry::run;
