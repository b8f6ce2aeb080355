//! Test modules for the scan stage

pub mod helpers;
