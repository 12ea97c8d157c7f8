use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use gozlem_core::models::observation::Observation;
use gozlem_storage::queue::OfflineQueueEntry;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::events::ChangeEvent;
use crate::service::ObservationService;

/// Outcome of one drain pass. Counts, never per-entry errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Entries still queued after the pass, parked ones included.
    pub remaining: usize,
    /// Entries skipped because they reached the attempt limit.
    pub parked: usize,
    /// Entries deleted while their insert was in flight; the stored copy
    /// was removed again.
    pub discarded: usize,
    /// Another drain was in progress; this call did nothing.
    pub already_running: bool,
}

/// Moves queued observations into the store.
pub struct SyncCoordinator {
    service: Arc<ObservationService>,
    running: AtomicBool,
}

enum Pushed {
    Synced,
    Discarded,
}

/// Clears the in-progress flag when a drain ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncCoordinator {
    pub fn new(service: Arc<ObservationService>) -> Self {
        Self {
            service,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Push every queued entry to the store in FIFO order.
    ///
    /// A failing entry stays queued with its attempt count bumped and the
    /// pass moves on. Entries at the attempt limit are parked: skipped
    /// without a store call until [`retry_parked`](Self::retry_parked).
    /// A second concurrent call returns immediately with `already_running`.
    pub async fn drain(&self) -> Result<DrainReport, ServiceError> {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("drain already in progress");
            return Ok(DrainReport {
                already_running: true,
                ..Default::default()
            });
        }
        let _guard = RunningGuard(&self.running);

        let deps = &self.service.deps;
        let max_attempts = self.service.config.max_sync_attempts;
        let entries = deps.queue.list_all()?;
        let total = entries.len();
        let mut report = DrainReport::default();

        if entries.is_empty() {
            return Ok(report);
        }
        if !deps.connectivity.is_online() {
            report.remaining = entries.len();
            report.parked = entries.iter().filter(|e| e.is_parked(max_attempts)).count();
            tracing::debug!(queued = report.remaining, "offline, drain skipped");
            return Ok(report);
        }

        for entry in entries {
            if entry.is_parked(max_attempts) {
                report.parked += 1;
                continue;
            }
            if !deps.connectivity.is_online() {
                tracing::info!("connectivity lost, stopping drain");
                break;
            }

            let id = entry.id();
            let entry = match deps.queue.get(id) {
                Ok(Some(current)) => current,
                // Discarded by a delete while this pass was running.
                Ok(None) => continue,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(observation_id = %id, error = %e, "queue entry unreadable, skipped");
                    continue;
                }
            };
            match self.push(entry).await {
                Ok(Pushed::Synced) => report.succeeded += 1,
                Ok(Pushed::Discarded) => report.discarded += 1,
                Err(e) => {
                    report.failed += 1;
                    self.note_failure(id, &e, max_attempts);
                }
            }
        }

        report.remaining = match deps.queue.list_all() {
            Ok(left) => left.len(),
            Err(e) => {
                tracing::warn!(error = %e, "queue unreadable after drain");
                total.saturating_sub(report.succeeded + report.discarded)
            }
        };
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            remaining = report.remaining,
            parked = report.parked,
            discarded = report.discarded,
            "drain finished"
        );
        self.service
            .feed
            .publish(ChangeEvent::SyncCompleted { report });
        Ok(report)
    }

    fn note_failure(&self, id: Uuid, error: &ServiceError, max_attempts: u32) {
        let attempts = match self.service.deps.queue.record_failure(id, &error.to_string()) {
            Ok(attempts) => attempts,
            Err(e) => {
                tracing::warn!(
                    observation_id = %id,
                    error = %error,
                    queue_error = %e,
                    "sync failed and the attempt could not be recorded"
                );
                return;
            }
        };
        if attempts.is_some_and(|n| n >= max_attempts) {
            tracing::warn!(
                observation_id = %id,
                error = %error,
                "sync failed, entry parked until manual retry"
            );
        } else {
            tracing::warn!(
                observation_id = %id,
                error = %error,
                attempts = attempts.unwrap_or(0),
                "sync failed, entry stays queued"
            );
        }
    }

    /// Clear attempt counters on parked entries and drain again.
    pub async fn retry_parked(&self) -> Result<DrainReport, ServiceError> {
        let reset = self.service.deps.queue.reset_attempts()?;
        tracing::info!(reset, "retrying parked entries");
        self.drain().await
    }

    async fn push(&self, entry: OfflineQueueEntry) -> Result<Pushed, ServiceError> {
        let deps = &self.service.deps;
        let client_id = entry.id();

        let stored = match self.earlier_copy(&entry).await? {
            Some(stored) => stored,
            None => self.insert(entry).await?,
        };

        match deps.queue.remove_by_id(client_id) {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(
                    observation_id = %client_id,
                    stored_id = %stored.id,
                    "observation deleted during sync"
                );
                self.service.discard_stored(stored.id).await;
                return Ok(Pushed::Discarded);
            }
            Err(e) => {
                tracing::error!(
                    observation_id = %client_id,
                    stored_id = %stored.id,
                    error = %e,
                    "stored observation could not be removed from the queue"
                );
                if let Err(mark) = deps.queue.mark_synced(client_id, stored.id) {
                    tracing::error!(
                        observation_id = %client_id,
                        error = %mark,
                        "stored id not recorded, the next drain may insert a duplicate"
                    );
                }
                return Err(e.into());
            }
        }

        tracing::info!(
            observation_id = %stored.id,
            client_id = %client_id,
            child_id = %stored.child_id,
            "queued observation synced"
        );
        self.service.feed.publish(ChangeEvent::ObservationSaved {
            observation_id: stored.id,
            child_id: stored.child_id,
            pending_sync: false,
            replaces: Some(client_id),
        });
        self.service.assessment_job().spawn(stored);
        Ok(Pushed::Synced)
    }

    /// The copy an earlier drain stored before failing to dequeue, if the
    /// store still has it.
    async fn earlier_copy(&self, entry: &OfflineQueueEntry) -> Result<Option<Observation>, ServiceError> {
        let Some(stored_id) = entry.synced_as else {
            return Ok(None);
        };
        let found = self.service.deps.observations.get(stored_id).await?;
        if found.is_none() {
            tracing::warn!(
                observation_id = %entry.id(),
                stored_id = %stored_id,
                "earlier stored copy missing, inserting again"
            );
        }
        Ok(found)
    }

    async fn insert(&self, entry: OfflineQueueEntry) -> Result<Observation, ServiceError> {
        let mut observation = entry.observation.clone();
        let mut pending = entry.pending_media.clone();
        let uploads_before = pending.len();

        match self.service.persist(&mut observation, &mut pending).await {
            Ok(stored) => Ok(stored),
            Err(e) => {
                let queue = &self.service.deps.queue;
                if pending.len() != uploads_before && queue.get(entry.id())?.is_some() {
                    // Keep finished uploads so the retry does not repeat them.
                    queue.enqueue(OfflineQueueEntry {
                        observation,
                        pending_media: pending,
                        ..entry
                    })?;
                }
                Err(e.into())
            }
        }
    }
}

/// Drain once now if online, then on every offline → online transition.
///
/// The task ends when the connectivity signal is dropped; abort the handle
/// to stop it earlier.
pub fn spawn_auto_sync(
    coordinator: Arc<SyncCoordinator>,
    mut online: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut was_online = *online.borrow_and_update();
        if was_online {
            run_drain(&coordinator).await;
        }
        while online.changed().await.is_ok() {
            let is_online = *online.borrow_and_update();
            if is_online && !was_online {
                run_drain(&coordinator).await;
            }
            was_online = is_online;
        }
        tracing::debug!("connectivity signal closed, auto sync stopped");
    })
}

async fn run_drain(coordinator: &SyncCoordinator) {
    if let Err(e) = coordinator.drain().await {
        tracing::error!(error = %e, "drain failed");
    }
}
