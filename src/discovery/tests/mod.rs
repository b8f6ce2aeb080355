//! Test modules for repository discovery

pub mod helpers;
