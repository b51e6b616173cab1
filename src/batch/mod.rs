//! Concurrent batch execution and outcome aggregation.
mod histogram;
mod result;
mod runner;

#[cfg(test)]
mod tests;

pub use histogram::{StatusBucket, StatusHistogram};
pub use result::{BatchResult, Latency};
pub use runner::BatchRunner;
