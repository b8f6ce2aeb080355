//! Repository Discovery
//!
//! Lists the repositories of every targeted organization in parallel and keeps
//! the ones the filter policy admits.

pub mod filter;
pub mod orchestrator;

pub use filter::{evaluate, include, ExclusionReason, FilterDecision, FilterPolicy};
pub use orchestrator::{DiscoveryOrchestrator, OrganizationListing};

/// Default number of simultaneous organization listings
pub const DEFAULT_GHE_CONCURRENCY: i64 = 15;

#[cfg(test)]
mod tests;
