//! Directory data types
//!
//! Only the fields the filter and the logs need are decoded; everything else
//! in the API payloads is ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Clone URL of a repository, as handed from discovery to scanning
pub type RepositoryAddress = String;

/// Listing entry for one repository
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RepositoryMetadata {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub clone_url: RepositoryAddress,
    /// Size in KB as reported by the API; absent when the payload omits it
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Organization {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct User {
    pub login: String,
}
