//! gozlem-core
//!
//! Pure domain types, draft validation, and storage key conventions.
//! No storage or network dependency. This is the shared vocabulary of the
//! observation system.

pub mod error;
pub mod models;
pub mod storage_keys;
