//! Typed argument structs for every external command the pipeline runs.

pub mod certificate;
pub mod packages;
pub mod server;
