use gozlem_core::models::domain::Locale;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub locale: Locale,
    /// Failed drain attempts before a queue entry is parked.
    pub max_sync_attempts: u32,
    /// Newest stored observations examined by a recompute.
    pub recompute_limit: usize,
    /// Change feed buffer per subscriber.
    pub event_capacity: usize,
    pub signed_url_ttl_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            locale: Locale::Tr,
            max_sync_attempts: 3,
            recompute_limit: 60,
            event_capacity: 64,
            signed_url_ttl_secs: 3600,
        }
    }
}
