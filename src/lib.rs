pub mod app;
pub mod core;
pub mod directory;
pub mod discovery;
pub mod metrics;
pub mod output;
pub mod scan;
