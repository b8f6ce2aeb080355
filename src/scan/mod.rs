//! Repository Scanning
//!
//! Runs the Lava compliance check against every discovered repository with a
//! bounded worker pool and turns each report into summaries.

pub mod aggregator;
pub mod api;
pub mod error;
pub mod invocation;
pub mod orchestrator;
pub mod persist;
pub mod runner;
pub mod types;

pub use error::{PersistError, ScanError, ScanResult};
pub use orchestrator::ScanOrchestrator;
pub use types::{Finding, ScanConfig, Summary};

#[cfg(test)]
mod tests;
