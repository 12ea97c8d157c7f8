use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gozlem_aggregate::{
    ChildOverview, ClassDigest, DayActivity, DigestFilter, activity_by_day, child_overview,
    class_digest, weekly_trend,
};
use gozlem_core::error::ValidationError;
use gozlem_core::models::assessment::Assessment;
use gozlem_core::models::domain::Domain;
use gozlem_core::models::media::{MediaEvent, PendingMedia};
use gozlem_core::models::observation::{Observation, ObservationDraft, ObservationPatch};
use gozlem_core::models::record::ObservationRecord;
use gozlem_heuristic::{RiskExplanation, RiskHeuristic};
use gozlem_storage::error::StoreError;
use gozlem_storage::queue::{OfflineQueue, OfflineQueueEntry};
use gozlem_storage::store::{
    AssessmentStore, MediaStore, ObservationFilter, ObservationStore, sort_newest_first,
};
use serde::Serialize;
use uuid::Uuid;

use crate::assess::AssessmentJob;
use crate::clock::Clock;
use crate::config::ServiceConfig;
use crate::connectivity::ConnectivitySignal;
use crate::error::ServiceError;
use crate::events::{ChangeEvent, ChangeFeed};
use crate::media::upload_pending;

/// Days covered by the activity strip of child and class reports.
pub const ACTIVITY_WINDOW_DAYS: usize = 7;
/// Weeks covered by the child trend.
pub const TREND_WEEKS: usize = 8;

/// External collaborators injected into the service.
#[derive(Clone)]
pub struct Collaborators {
    pub observations: Arc<dyn ObservationStore>,
    pub assessments: Arc<dyn AssessmentStore>,
    pub media: Arc<dyn MediaStore>,
    pub queue: Arc<dyn OfflineQueue>,
    pub connectivity: Arc<ConnectivitySignal>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecomputeReport {
    pub examined: usize,
    pub recomputed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildReport {
    pub child_id: Uuid,
    pub overview: ChildOverview,
    pub activity: Vec<DayActivity>,
    pub weekly_trend: std::collections::BTreeMap<Domain, Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassReport {
    pub digest: ClassDigest,
    pub activity: Vec<DayActivity>,
}

pub struct ObservationService {
    pub(crate) deps: Collaborators,
    pub(crate) heuristic: RiskHeuristic,
    pub(crate) feed: ChangeFeed,
    pub(crate) config: ServiceConfig,
    tombstones: Mutex<HashSet<Uuid>>,
}

impl ObservationService {
    pub fn new(deps: Collaborators, config: ServiceConfig) -> Self {
        Self {
            heuristic: RiskHeuristic::new(config.locale),
            feed: ChangeFeed::new(config.event_capacity),
            deps,
            config,
            tombstones: Mutex::new(HashSet::new()),
        }
    }

    pub fn heuristic(&self) -> &RiskHeuristic {
        &self.heuristic
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn is_online(&self) -> bool {
        self.deps.connectivity.is_online()
    }

    /// Accept a new observation.
    ///
    /// Online, the record goes straight to the store and an assessment is
    /// computed in the background. Offline, or when the upload or insert
    /// fails for any reason, it is queued and returned with
    /// `pending_sync = true`; entries that keep failing are parked by the
    /// drain. Only validation and local queue failures reach the caller.
    pub async fn submit(&self, draft: ObservationDraft) -> Result<Observation, ServiceError> {
        let draft = draft.validate()?;
        let (mut local, mut pending) =
            Observation::from_draft(Uuid::new_v4(), draft, self.deps.clock.timestamp());

        if !self.is_online() {
            return self.enqueue(local, pending, "offline");
        }

        match self.persist(&mut local, &mut pending).await {
            Ok(stored) => {
                tracing::info!(
                    observation_id = %stored.id,
                    child_id = %stored.child_id,
                    "observation stored"
                );
                self.feed.publish(ChangeEvent::ObservationSaved {
                    observation_id: stored.id,
                    child_id: stored.child_id,
                    pending_sync: false,
                    replaces: None,
                });
                self.assessment_job().spawn(stored.clone());
                Ok(stored)
            }
            Err(e) => {
                tracing::warn!(
                    child_id = %local.child_id,
                    error = %e,
                    transient = e.is_transient(),
                    "store write failed, queueing observation"
                );
                self.enqueue(local, pending, "store write failed")
            }
        }
    }

    /// Upload pending media then insert. `observation` and `pending` reflect
    /// upload progress even on failure.
    pub(crate) async fn persist(
        &self,
        observation: &mut Observation,
        pending: &mut Vec<PendingMedia>,
    ) -> Result<Observation, StoreError> {
        upload_pending(self.deps.media.as_ref(), observation, pending).await?;
        self.deps.observations.insert(observation.clone()).await
    }

    fn enqueue(
        &self,
        mut observation: Observation,
        pending: Vec<PendingMedia>,
        reason: &str,
    ) -> Result<Observation, ServiceError> {
        observation.pending_sync = true;
        let entry = OfflineQueueEntry::new(
            observation.clone(),
            pending,
            self.deps.clock.timestamp(),
        );
        self.deps.queue.enqueue(entry)?;
        tracing::info!(
            observation_id = %observation.id,
            child_id = %observation.child_id,
            reason,
            "observation saved locally, will sync"
        );
        self.feed.publish(ChangeEvent::ObservationSaved {
            observation_id: observation.id,
            child_id: observation.child_id,
            pending_sync: true,
            replaces: None,
        });
        Ok(observation)
    }

    pub(crate) fn assessment_job(&self) -> AssessmentJob {
        AssessmentJob {
            store: Arc::clone(&self.deps.assessments),
            heuristic: self.heuristic,
            feed: self.feed.clone(),
            now: self.deps.clock.timestamp(),
        }
    }

    fn ensure_live(&self, id: Uuid) -> Result<(), ValidationError> {
        let tombstones = self.tombstones.lock().unwrap_or_else(|p| p.into_inner());
        if tombstones.contains(&id) {
            return Err(ValidationError::Deleted(id));
        }
        Ok(())
    }

    fn tombstone(&self, id: Uuid) {
        self.tombstones
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(id);
    }

    /// Edit a stored observation. Queued observations cannot be edited.
    /// The assessment is recomputed in the background only when the note or
    /// domains changed. Store failures are returned, never queued.
    pub async fn update(&self, id: Uuid, patch: ObservationPatch) -> Result<Observation, ServiceError> {
        let patch = patch.validate()?;
        self.ensure_live(id)?;
        if self.deps.queue.get(id)?.is_some() {
            return Err(ValidationError::PendingSync(id).into());
        }
        if !self.is_online() {
            return Err(ServiceError::Offline);
        }

        let current = self
            .deps
            .observations
            .get(id)
            .await?
            .ok_or(ValidationError::NotFound(id))?;
        let rerun = patch.changes_assessment_inputs(&current);

        let updated = self
            .deps
            .observations
            .update(id, patch, self.deps.clock.timestamp())
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => ServiceError::from(ValidationError::NotFound(id)),
                e => e.into(),
            })?;

        tracing::info!(observation_id = %id, reassess = rerun, "observation updated");
        self.feed.publish(ChangeEvent::ObservationUpdated {
            observation_id: id,
            child_id: updated.child_id,
        });
        if rerun {
            self.assessment_job().spawn(updated.clone());
        }
        Ok(updated)
    }

    /// Delete an observation and its assessment.
    ///
    /// A still-queued id is discarded from the queue, along with any copy an
    /// interrupted drain already stored. Otherwise the assessment is deleted first and a failure there
    /// aborts before the observation is touched.
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.ensure_live(id)?;

        let queued = self.deps.queue.get(id)?;
        if self.deps.queue.remove_by_id(id)? {
            tracing::info!(observation_id = %id, "queued observation discarded");
            if let Some(stored_id) = queued.and_then(|e| e.synced_as) {
                self.discard_stored(stored_id).await;
            }
            self.tombstone(id);
            self.feed
                .publish(ChangeEvent::ObservationDeleted { observation_id: id });
            return Ok(());
        }
        if !self.is_online() {
            return Err(ServiceError::Offline);
        }

        if self.deps.observations.get(id).await?.is_none() {
            return Err(ValidationError::NotFound(id).into());
        }

        self.deps
            .assessments
            .delete_by_observation(id)
            .await
            .inspect_err(|e| {
                tracing::warn!(observation_id = %id, error = %e, "assessment delete failed, observation kept");
            })?;
        self.deps.observations.delete(id).await?;

        tracing::info!(observation_id = %id, "observation deleted");
        self.tombstone(id);
        self.feed
            .publish(ChangeEvent::ObservationDeleted { observation_id: id });
        Ok(())
    }

    /// Remove a store copy of an observation the user already deleted
    /// from the queue. Failures are logged; the queue entry is gone either way.
    pub(crate) async fn discard_stored(&self, stored_id: Uuid) {
        if let Err(e) = self.deps.assessments.delete_by_observation(stored_id).await {
            tracing::warn!(observation_id = %stored_id, error = %e, "assessment of discarded observation not deleted");
        }
        match self.deps.observations.delete(stored_id).await {
            Ok(()) => {
                tracing::info!(observation_id = %stored_id, "stored copy of discarded observation removed");
                self.tombstone(stored_id);
            }
            Err(e) => tracing::error!(
                observation_id = %stored_id,
                error = %e,
                "stored copy of discarded observation could not be removed"
            ),
        }
    }

    /// Queued observations for the child first (enqueue order), then stored
    /// ones newest first, each joined with its assessment.
    ///
    /// Offline, or when the store query fails transiently, only the queued
    /// observations are returned.
    pub async fn list_for_child(&self, child_id: Uuid) -> Result<Vec<ObservationRecord>, ServiceError> {
        let mut records = self.queued_records(|c| c == child_id)?;

        if !self.is_online() {
            tracing::debug!(child_id = %child_id, "offline, listing queued observations only");
            return Ok(records);
        }

        let remote = match self.deps.observations.query_by_child(child_id).await {
            Ok(remote) => remote,
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    child_id = %child_id,
                    error = %e,
                    "store query failed, listing queued observations only"
                );
                return Ok(records);
            }
            Err(e) => return Err(e.into()),
        };

        records.extend(self.join_assessments(remote).await);
        Ok(records)
    }

    fn queued_records(&self, child: impl Fn(Uuid) -> bool) -> Result<Vec<ObservationRecord>, ServiceError> {
        Ok(self
            .deps
            .queue
            .list_all()?
            .into_iter()
            .filter(|e| child(e.observation.child_id))
            .map(|e| ObservationRecord::pending(e.observation))
            .collect())
    }

    /// Attach assessments to stored observations, newest first. A failed
    /// lookup degrades to "no assessment".
    async fn join_assessments(&self, mut observations: Vec<Observation>) -> Vec<ObservationRecord> {
        sort_newest_first(&mut observations);
        let mut by_id = self.fetch_assessments(observations.iter().map(|o| o.id).collect()).await;
        observations
            .into_iter()
            .map(|observation| ObservationRecord {
                assessment: by_id.remove(&observation.id),
                observation,
            })
            .collect()
    }

    async fn fetch_assessments(&self, ids: Vec<Uuid>) -> HashMap<Uuid, Assessment> {
        if ids.is_empty() {
            return HashMap::new();
        }
        match self.deps.assessments.query_by_observations(ids).await {
            Ok(found) => found.into_iter().map(|a| (a.observation_id, a)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "assessment lookup failed, showing observations without assessments");
                HashMap::new()
            }
        }
    }

    /// Recompute assessments for an author's newest stored observations.
    ///
    /// Without `force` only observations lacking an assessment are
    /// recomputed. Existing domain scores feed the heuristic's average-score
    /// fallback.
    pub async fn recompute_assessments(
        &self,
        author_id: Uuid,
        force: bool,
    ) -> Result<RecomputeReport, ServiceError> {
        let observations = self
            .deps
            .observations
            .query_by_filter(ObservationFilter {
                author_id: Some(author_id),
                limit: Some(self.config.recompute_limit),
                ..Default::default()
            })
            .await?;
        let existing = self
            .fetch_assessments(observations.iter().map(|o| o.id).collect())
            .await;
        let now = self.deps.clock.timestamp();

        let mut report = RecomputeReport {
            examined: observations.len(),
            ..Default::default()
        };
        for observation in observations {
            let prior = existing.get(&observation.id);
            if prior.is_some() && !force {
                continue;
            }
            let eval = self.heuristic.evaluate_with_prior(
                &observation.note,
                &observation.domains,
                prior.map(|a| &a.domain_scores),
            );
            let risk = eval.risk;
            match self
                .deps
                .assessments
                .upsert(eval.into_assessment(observation.id, now))
                .await
            {
                Ok(_) => {
                    report.recomputed += 1;
                    self.feed.publish(ChangeEvent::AssessmentUpdated {
                        observation_id: observation.id,
                        risk,
                    });
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        observation_id = %observation.id,
                        error = %e,
                        "assessment recompute failed"
                    );
                }
            }
        }

        tracing::info!(
            author_id = %author_id,
            examined = report.examined,
            recomputed = report.recomputed,
            failed = report.failed,
            "recompute finished"
        );
        Ok(report)
    }

    /// Why a stored observation carries its risk label. `None` when it has
    /// no assessment yet.
    pub async fn explain(&self, id: Uuid) -> Result<Option<RiskExplanation>, ServiceError> {
        self.ensure_live(id)?;
        let observation = self
            .deps
            .observations
            .get(id)
            .await?
            .ok_or(ValidationError::NotFound(id))?;
        let assessment = self.deps.assessments.get_by_observation(id).await?;
        Ok(assessment.map(|a| self.heuristic.explain(&observation.note, &a)))
    }

    pub async fn child_overview(&self, child_id: Uuid) -> Result<ChildReport, ServiceError> {
        let records = self.list_for_child(child_id).await?;
        let now = self.deps.clock.now();
        let media = self.media_events(vec![child_id], &now).await;

        Ok(ChildReport {
            child_id,
            overview: child_overview(&records, &self.heuristic),
            activity: activity_by_day(&records, &media, ACTIVITY_WINDOW_DAYS, &now),
            weekly_trend: weekly_trend(&records, TREND_WEEKS, now.timestamp()),
        })
    }

    /// Digest over the given children (all children when empty).
    pub async fn class_digest(
        &self,
        child_ids: Vec<Uuid>,
        filter: DigestFilter,
    ) -> Result<ClassReport, ServiceError> {
        let now = self.deps.clock.now();
        let filter = DigestFilter { child_ids, ..filter };

        let mut records =
            self.queued_records(|c| filter.child_ids.is_empty() || filter.child_ids.contains(&c))?;
        if self.is_online() {
            let query = ObservationFilter {
                child_ids: filter.child_ids.clone(),
                since: Some(filter.since(now.timestamp())),
                ..Default::default()
            };
            match self.deps.observations.query_by_filter(query).await {
                Ok(remote) => records.extend(self.join_assessments(remote).await),
                Err(e) if e.is_transient() => {
                    tracing::warn!(error = %e, "store query failed, digest covers queued observations only");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let media = self.media_events(filter.child_ids.clone(), &now).await;
        Ok(ClassReport {
            digest: class_digest(&records, &filter, now.timestamp()),
            activity: activity_by_day(&records, &media, ACTIVITY_WINDOW_DAYS, &now),
        })
    }

    async fn media_events(&self, child_ids: Vec<Uuid>, now: &jiff::Zoned) -> Vec<MediaEvent> {
        if !self.is_online() {
            return Vec::new();
        }
        let since = jiff::Timestamp::from_second(
            now.timestamp().as_second() - ACTIVITY_WINDOW_DAYS as i64 * 86_400,
        )
        .unwrap_or(jiff::Timestamp::MIN);
        match self.deps.media.media_events(child_ids, since).await {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "media activity unavailable");
                Vec::new()
            }
        }
    }

    /// Time-limited URL for a stored media path.
    pub async fn media_url(&self, path: &str) -> Result<String, ServiceError> {
        let ttl = Duration::from_secs(self.config.signed_url_ttl_secs);
        Ok(self.deps.media.signed_url(path.to_string(), ttl).await?)
    }
}
