//! gozlem-storage
//!
//! Collaborator contracts for durable observation, assessment and media
//! storage, an S3-backed implementation, in-memory fakes, and the
//! device-local offline queue.

pub mod documents;
pub mod error;
pub mod memory;
pub mod objects;
pub mod queue;
pub mod s3;
pub mod store;
