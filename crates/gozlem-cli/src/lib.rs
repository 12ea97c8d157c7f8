//! gozlem-cli library root.
//!
//! Config handling and AWS wiring live here so integration tests can reach
//! them without going through the binary.

pub mod aws;
pub mod commands;
pub mod config;
