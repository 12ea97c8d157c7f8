use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use gozlem_core::models::assessment::Assessment;
use gozlem_core::models::media::{MediaEvent, MediaMetadata};
use gozlem_core::models::observation::{Observation, ObservationPatch};
use uuid::Uuid;

use crate::error::StoreError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Query criteria for [`ObservationStore::query_by_filter`].
///
/// Empty `child_ids` matches every child. Results are newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationFilter {
    pub author_id: Option<Uuid>,
    pub child_ids: Vec<Uuid>,
    pub since: Option<jiff::Timestamp>,
    pub limit: Option<usize>,
}

impl ObservationFilter {
    pub fn matches(&self, observation: &Observation) -> bool {
        self.author_id.is_none_or(|a| a == observation.author_id)
            && (self.child_ids.is_empty() || self.child_ids.contains(&observation.child_id))
            && self.since.is_none_or(|s| observation.created_at >= s)
    }

    /// Filter, order newest first, and truncate to `limit`.
    pub fn apply(&self, mut observations: Vec<Observation>) -> Vec<Observation> {
        observations.retain(|o| self.matches(o));
        sort_newest_first(&mut observations);
        if let Some(limit) = self.limit {
            observations.truncate(limit);
        }
        observations
    }
}

pub fn sort_newest_first(observations: &mut [Observation]) {
    observations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Durable observation records. Every call is all-or-nothing.
pub trait ObservationStore: Send + Sync {
    /// Persist a new observation. The store issues the durable id and the
    /// returned record has `pending_sync = false`.
    fn insert(&self, observation: Observation) -> BoxFuture<'_, Result<Observation, StoreError>>;

    fn update(
        &self,
        id: Uuid,
        patch: ObservationPatch,
        now: jiff::Timestamp,
    ) -> BoxFuture<'_, Result<Observation, StoreError>>;

    fn delete(&self, id: Uuid) -> BoxFuture<'_, Result<(), StoreError>>;

    fn get(&self, id: Uuid) -> BoxFuture<'_, Result<Option<Observation>, StoreError>>;

    /// All observations of one child, newest first.
    fn query_by_child(&self, child_id: Uuid) -> BoxFuture<'_, Result<Vec<Observation>, StoreError>>;

    fn query_by_filter(
        &self,
        filter: ObservationFilter,
    ) -> BoxFuture<'_, Result<Vec<Observation>, StoreError>>;
}

/// Derived assessments, at most one per observation.
pub trait AssessmentStore: Send + Sync {
    /// Insert or replace the assessment keyed by `observation_id`.
    fn upsert(&self, assessment: Assessment) -> BoxFuture<'_, Result<Assessment, StoreError>>;

    fn delete_by_observation(&self, observation_id: Uuid) -> BoxFuture<'_, Result<(), StoreError>>;

    fn get_by_observation(
        &self,
        observation_id: Uuid,
    ) -> BoxFuture<'_, Result<Option<Assessment>, StoreError>>;

    /// Assessments for the given observations. Missing ones are skipped.
    fn query_by_observations(
        &self,
        observation_ids: Vec<Uuid>,
    ) -> BoxFuture<'_, Result<Vec<Assessment>, StoreError>>;
}

/// Photo and attachment blobs.
pub trait MediaStore: Send + Sync {
    /// Store a blob for a child and return its storage path.
    fn upload(
        &self,
        child_id: Uuid,
        bytes: Vec<u8>,
        metadata: MediaMetadata,
    ) -> BoxFuture<'_, Result<String, StoreError>>;

    fn signed_url(&self, path: String, ttl: Duration) -> BoxFuture<'_, Result<String, StoreError>>;

    /// Upload events for activity reporting. Empty `child_ids` matches every child.
    fn media_events(
        &self,
        child_ids: Vec<Uuid>,
        since: jiff::Timestamp,
    ) -> BoxFuture<'_, Result<Vec<MediaEvent>, StoreError>>;
}
