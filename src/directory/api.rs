//! Directory API
//!
//! Public surface of the directory client used by discovery and the app driver.

pub use crate::directory::client::{DirectorySettings, GheClient, RepositoryDirectory};
pub use crate::directory::error::{DirectoryError, DirectoryResult};
pub use crate::directory::types::{RepositoryAddress, RepositoryMetadata};
