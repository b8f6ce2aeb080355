//! Enterprise Directory Client
//!
//! Talks to the GitHub Enterprise REST API to verify the credential, list
//! organizations, and page through each organization's repositories. Rate
//! limited responses block until the limit window resets.

pub mod api;
pub mod client;
pub mod error;
pub mod pagination;
pub mod types;

pub use client::{DirectorySettings, GheClient, RepositoryDirectory};
pub use error::{DirectoryError, DirectoryResult};
pub use types::{RepositoryAddress, RepositoryMetadata};

/// API path appended to the enterprise base URL
pub const GHE_API_PATH: &str = "/api/v3/";

/// Page size requested from list endpoints
pub const PAGE_SIZE: u32 = 100;
