//! In-memory stores with failure injection, for tests and offline demos.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use gozlem_core::models::assessment::Assessment;
use gozlem_core::models::media::{MediaEvent, MediaMetadata};
use gozlem_core::models::observation::{Observation, ObservationPatch};
use gozlem_core::storage_keys;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{
    AssessmentStore, BoxFuture, MediaStore, ObservationFilter, ObservationStore, sort_newest_first,
};

/// Store operation, used to target injected faults and read call counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Insert,
    Update,
    Delete,
    Get,
    QueryByChild,
    QueryByFilter,
    UpsertAssessment,
    DeleteAssessment,
    GetAssessment,
    QueryAssessments,
    Upload,
    SignedUrl,
    MediaEvents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Transient,
    Rejected,
}

impl Fault {
    fn to_error(self, op: Op) -> StoreError {
        match self {
            Fault::Transient => StoreError::Transient(format!("injected transient failure on {op:?}")),
            Fault::Rejected => StoreError::Rejected(format!("injected rejection on {op:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Injected {
    fault: Fault,
    /// `None` = until cleared.
    remaining: Option<usize>,
}

#[derive(Debug, Clone)]
struct StoredMedia {
    child_id: Uuid,
    created_at: jiff::Timestamp,
}

#[derive(Default)]
struct State {
    observations: BTreeMap<Uuid, Observation>,
    assessments: BTreeMap<Uuid, Assessment>,
    media: BTreeMap<String, StoredMedia>,
    extra_media_events: Vec<MediaEvent>,
}

#[derive(Default)]
struct Control {
    faults: HashMap<Op, Injected>,
    delays: HashMap<Op, Duration>,
    calls: HashMap<Op, usize>,
}

/// Implements every store trait over process memory.
///
/// Each call is counted before fault injection, so failed attempts show up
/// in [`MemoryStore::calls`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    control: Mutex<Control>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call to `op` until [`clear_faults`](Self::clear_faults).
    pub fn fail(&self, op: Op, fault: Fault) {
        self.with_control(|c| {
            c.faults.insert(
                op,
                Injected {
                    fault,
                    remaining: None,
                },
            );
        });
    }

    /// Fail the next `times` calls to `op`.
    pub fn fail_times(&self, op: Op, fault: Fault, times: usize) {
        self.with_control(|c| {
            c.faults.insert(
                op,
                Injected {
                    fault,
                    remaining: Some(times),
                },
            );
        });
    }

    pub fn clear_faults(&self) {
        self.with_control(|c| c.faults.clear());
    }

    /// Delay every call to `op`, to widen race windows in tests.
    pub fn delay(&self, op: Op, by: Duration) {
        self.with_control(|c| {
            c.delays.insert(op, by);
        });
    }

    pub fn calls(&self, op: Op) -> usize {
        self.with_control(|c| c.calls.get(&op).copied().unwrap_or(0))
    }

    pub fn total_calls(&self) -> usize {
        self.with_control(|c| c.calls.values().sum())
    }

    /// Insert a record as-is, bypassing id issuance and fault injection.
    pub fn seed_observation(&self, observation: Observation) {
        self.with_state(|s| {
            s.observations.insert(observation.id, observation);
        });
    }

    pub fn seed_assessment(&self, assessment: Assessment) {
        self.with_state(|s| {
            s.assessments.insert(assessment.observation_id, assessment);
        });
    }

    pub fn seed_media_event(&self, event: MediaEvent) {
        self.with_state(|s| s.extra_media_events.push(event));
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.with_state(|s| s.observations.values().cloned().collect())
    }

    pub fn assessment(&self, observation_id: Uuid) -> Option<Assessment> {
        self.with_state(|s| s.assessments.get(&observation_id).cloned())
    }

    pub fn media_paths(&self) -> Vec<String> {
        self.with_state(|s| s.media.keys().cloned().collect())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }

    fn with_control<R>(&self, f: impl FnOnce(&mut Control) -> R) -> R {
        let mut guard = self.control.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }

    /// Count the call, apply any delay, then any injected fault.
    async fn enter(&self, op: Op) -> Result<(), StoreError> {
        let (delay, fault) = self.with_control(|c| {
            *c.calls.entry(op).or_default() += 1;
            let delay = c.delays.get(&op).copied();
            let fault = match c.faults.get_mut(&op) {
                Some(Injected {
                    fault,
                    remaining: None,
                }) => Some(*fault),
                Some(Injected {
                    fault,
                    remaining: Some(n),
                }) if *n > 0 => {
                    *n -= 1;
                    Some(*fault)
                }
                _ => None,
            };
            (delay, fault)
        });

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match fault {
            Some(fault) => Err(fault.to_error(op)),
            None => Ok(()),
        }
    }
}

impl ObservationStore for MemoryStore {
    fn insert(&self, mut observation: Observation) -> BoxFuture<'_, Result<Observation, StoreError>> {
        Box::pin(async move {
            self.enter(Op::Insert).await?;
            observation.id = Uuid::new_v4();
            observation.pending_sync = false;
            self.with_state(|s| s.observations.insert(observation.id, observation.clone()));
            Ok(observation)
        })
    }

    fn update(
        &self,
        id: Uuid,
        patch: ObservationPatch,
        now: jiff::Timestamp,
    ) -> BoxFuture<'_, Result<Observation, StoreError>> {
        Box::pin(async move {
            self.enter(Op::Update).await?;
            self.with_state(|s| {
                let observation = s
                    .observations
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::not_found(storage_keys::observation(id)))?;
                patch.apply(observation, now);
                Ok(observation.clone())
            })
        })
    }

    fn delete(&self, id: Uuid) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.enter(Op::Delete).await?;
            self.with_state(|s| s.observations.remove(&id));
            Ok(())
        })
    }

    fn get(&self, id: Uuid) -> BoxFuture<'_, Result<Option<Observation>, StoreError>> {
        Box::pin(async move {
            self.enter(Op::Get).await?;
            Ok(self.with_state(|s| s.observations.get(&id).cloned()))
        })
    }

    fn query_by_child(&self, child_id: Uuid) -> BoxFuture<'_, Result<Vec<Observation>, StoreError>> {
        Box::pin(async move {
            self.enter(Op::QueryByChild).await?;
            let mut found: Vec<Observation> = self.with_state(|s| {
                s.observations
                    .values()
                    .filter(|o| o.child_id == child_id)
                    .cloned()
                    .collect()
            });
            sort_newest_first(&mut found);
            Ok(found)
        })
    }

    fn query_by_filter(
        &self,
        filter: ObservationFilter,
    ) -> BoxFuture<'_, Result<Vec<Observation>, StoreError>> {
        Box::pin(async move {
            self.enter(Op::QueryByFilter).await?;
            let all: Vec<Observation> =
                self.with_state(|s| s.observations.values().cloned().collect());
            Ok(filter.apply(all))
        })
    }
}

impl AssessmentStore for MemoryStore {
    fn upsert(&self, assessment: Assessment) -> BoxFuture<'_, Result<Assessment, StoreError>> {
        Box::pin(async move {
            self.enter(Op::UpsertAssessment).await?;
            self.with_state(|s| {
                s.assessments
                    .insert(assessment.observation_id, assessment.clone())
            });
            Ok(assessment)
        })
    }

    fn delete_by_observation(&self, observation_id: Uuid) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.enter(Op::DeleteAssessment).await?;
            self.with_state(|s| s.assessments.remove(&observation_id));
            Ok(())
        })
    }

    fn get_by_observation(
        &self,
        observation_id: Uuid,
    ) -> BoxFuture<'_, Result<Option<Assessment>, StoreError>> {
        Box::pin(async move {
            self.enter(Op::GetAssessment).await?;
            Ok(self.with_state(|s| s.assessments.get(&observation_id).cloned()))
        })
    }

    fn query_by_observations(
        &self,
        observation_ids: Vec<Uuid>,
    ) -> BoxFuture<'_, Result<Vec<Assessment>, StoreError>> {
        Box::pin(async move {
            self.enter(Op::QueryAssessments).await?;
            Ok(self.with_state(|s| {
                observation_ids
                    .iter()
                    .filter_map(|id| s.assessments.get(id).cloned())
                    .collect()
            }))
        })
    }
}

impl MediaStore for MemoryStore {
    fn upload(
        &self,
        child_id: Uuid,
        _bytes: Vec<u8>,
        metadata: MediaMetadata,
    ) -> BoxFuture<'_, Result<String, StoreError>> {
        Box::pin(async move {
            self.enter(Op::Upload).await?;
            let path = storage_keys::media(child_id, Uuid::new_v4(), &metadata.file_name);
            self.with_state(|s| {
                s.media.insert(
                    path.clone(),
                    StoredMedia {
                        child_id,
                        created_at: jiff::Timestamp::now(),
                    },
                )
            });
            Ok(path)
        })
    }

    fn signed_url(&self, path: String, ttl: Duration) -> BoxFuture<'_, Result<String, StoreError>> {
        Box::pin(async move {
            self.enter(Op::SignedUrl).await?;
            if !self.with_state(|s| s.media.contains_key(&path)) {
                return Err(StoreError::not_found(path));
            }
            Ok(format!("memory://{path}?expires_in={}", ttl.as_secs()))
        })
    }

    fn media_events(
        &self,
        child_ids: Vec<Uuid>,
        since: jiff::Timestamp,
    ) -> BoxFuture<'_, Result<Vec<MediaEvent>, StoreError>> {
        Box::pin(async move {
            self.enter(Op::MediaEvents).await?;
            Ok(self.with_state(|s| {
                s.media
                    .values()
                    .map(|m| MediaEvent {
                        child_id: m.child_id,
                        created_at: m.created_at,
                    })
                    .chain(s.extra_media_events.iter().cloned())
                    .filter(|e| child_ids.is_empty() || child_ids.contains(&e.child_id))
                    .filter(|e| e.created_at >= since)
                    .collect()
            }))
        })
    }
}
