#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gozlem_core::models::domain::Domain;
use gozlem_core::models::observation::ObservationDraft;
use gozlem_service::clock::FixedClock;
use gozlem_service::config::ServiceConfig;
use gozlem_service::connectivity::ConnectivitySignal;
use gozlem_service::events::ChangeEvent;
use gozlem_service::{Collaborators, ObservationService, SyncCoordinator};
use gozlem_storage::memory::MemoryStore;
use gozlem_storage::error::QueueError;
use gozlem_storage::queue::{MemoryQueue, OfflineQueue, OfflineQueueEntry};
use tokio::sync::broadcast;
use uuid::Uuid;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub queue: Arc<dyn OfflineQueue>,
    pub connectivity: Arc<ConnectivitySignal>,
    pub clock: Arc<FixedClock>,
    pub service: Arc<ObservationService>,
    pub author: Uuid,
}

pub fn start() -> jiff::Zoned {
    let at: jiff::Timestamp = "2025-03-14T09:00:00Z".parse().unwrap();
    at.to_zoned(jiff::tz::TimeZone::fixed(jiff::tz::offset(3)))
}

impl Harness {
    pub fn new(online: bool) -> Self {
        Self::build(online, Arc::new(MemoryQueue::new()), ServiceConfig::default())
    }

    pub fn with_config(online: bool, config: ServiceConfig) -> Self {
        Self::build(online, Arc::new(MemoryQueue::new()), config)
    }

    pub fn build(online: bool, queue: Arc<dyn OfflineQueue>, config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let connectivity = Arc::new(ConnectivitySignal::new(online));
        let clock = Arc::new(FixedClock::new(start()));
        let deps = Collaborators {
            observations: store.clone(),
            assessments: store.clone(),
            media: store.clone(),
            queue: queue.clone(),
            connectivity: connectivity.clone(),
            clock: clock.clone(),
        };
        Self {
            store,
            queue,
            connectivity,
            clock,
            service: Arc::new(ObservationService::new(deps, config)),
            author: Uuid::new_v4(),
        }
    }

    pub fn coordinator(&self) -> SyncCoordinator {
        SyncCoordinator::new(self.service.clone())
    }

    pub fn draft(&self, child_id: Uuid, note: &str, domains: &[Domain]) -> ObservationDraft {
        ObservationDraft {
            child_id,
            author_id: self.author,
            note: note.to_string(),
            domains: domains.to_vec(),
            ..Default::default()
        }
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock
            .advance(jiff::SignedDuration::from_secs(minutes * 60));
    }
}

/// Wait up to two seconds for the first event matching `pred`.
pub async fn wait_for(
    rx: &mut broadcast::Receiver<ChangeEvent>,
    pred: impl Fn(&ChangeEvent) -> bool,
) -> ChangeEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("change feed closed: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for change event")
}

pub fn is_assessment_for(id: Uuid) -> impl Fn(&ChangeEvent) -> bool {
    move |e| {
        matches!(e,
            ChangeEvent::AssessmentUpdated { observation_id, .. }
            | ChangeEvent::AssessmentFailed { observation_id, .. }
            if *observation_id == id)
    }
}

/// In-memory queue whose writes can be made to fail, the way a full disk
/// fails a `FileQueue` flush.
#[derive(Default)]
pub struct FlakyQueue {
    inner: MemoryQueue,
    failing_removals: AtomicUsize,
    failing_records: AtomicUsize,
}

impl FlakyQueue {
    pub fn fail_removals(&self, times: usize) {
        self.failing_removals.store(times, Ordering::SeqCst);
    }

    pub fn fail_records(&self, times: usize) {
        self.failing_records.store(times, Ordering::SeqCst);
    }

    fn take(counter: &AtomicUsize) -> Result<(), QueueError> {
        let armed = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            return Err(QueueError::Io(std::io::Error::other("no space left on device")));
        }
        Ok(())
    }
}

impl OfflineQueue for FlakyQueue {
    fn enqueue(&self, entry: OfflineQueueEntry) -> Result<(), QueueError> {
        self.inner.enqueue(entry)
    }

    fn list_all(&self) -> Result<Vec<OfflineQueueEntry>, QueueError> {
        self.inner.list_all()
    }

    fn get(&self, id: Uuid) -> Result<Option<OfflineQueueEntry>, QueueError> {
        self.inner.get(id)
    }

    fn remove_by_id(&self, id: Uuid) -> Result<bool, QueueError> {
        Self::take(&self.failing_removals)?;
        self.inner.remove_by_id(id)
    }

    fn is_empty(&self) -> Result<bool, QueueError> {
        self.inner.is_empty()
    }

    fn record_failure(&self, id: Uuid, error: &str) -> Result<Option<u32>, QueueError> {
        Self::take(&self.failing_records)?;
        self.inner.record_failure(id, error)
    }

    fn reset_attempts(&self) -> Result<usize, QueueError> {
        self.inner.reset_attempts()
    }

    fn mark_synced(&self, id: Uuid, stored_id: Uuid) -> Result<bool, QueueError> {
        self.inner.mark_synced(id, stored_id)
    }
}
