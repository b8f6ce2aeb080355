//! Application driver: configuration, startup and the end-to-end run

pub mod cli;
pub mod error;
pub mod startup;
