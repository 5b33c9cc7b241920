//! CLI command implementations.

pub mod config;
pub mod describe;
pub mod descriptors;
pub mod predict;
pub mod serve;
