//! Device-local queue of observations that have not reached the store.
//!
//! Single writer per device: one process owns the queue file. Within that
//! process a mutex serialises every mutation, so enqueue and removal are
//! atomic with respect to a concurrent drain.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use gozlem_core::models::media::PendingMedia;
use gozlem_core::models::observation::Observation;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QueueError;

/// Current queue file version. Bump on shape changes.
const QUEUE_VERSION: u32 = 1;

/// A queued observation plus the media blobs still on local disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineQueueEntry {
    pub observation: Observation,
    pub enqueued_at: jiff::Timestamp,
    #[serde(default)]
    pub pending_media: Vec<PendingMedia>,
    /// Failed drain attempts so far.
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Store id of a copy already inserted by an earlier drain whose queue
    /// removal failed. The next drain finishes that sync without inserting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_as: Option<Uuid>,
}

impl OfflineQueueEntry {
    pub fn new(
        observation: Observation,
        pending_media: Vec<PendingMedia>,
        enqueued_at: jiff::Timestamp,
    ) -> Self {
        Self {
            observation,
            enqueued_at,
            pending_media,
            attempts: 0,
            last_error: None,
            synced_as: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.observation.id
    }

    /// Parked entries are skipped by automatic drains.
    pub fn is_parked(&self, max_attempts: u32) -> bool {
        self.attempts >= max_attempts
    }
}

pub trait OfflineQueue: Send + Sync {
    /// Append an entry. Re-enqueueing an existing id replaces it in place.
    fn enqueue(&self, entry: OfflineQueueEntry) -> Result<(), QueueError>;

    /// All entries in FIFO enqueue order.
    fn list_all(&self) -> Result<Vec<OfflineQueueEntry>, QueueError>;

    fn get(&self, id: Uuid) -> Result<Option<OfflineQueueEntry>, QueueError>;

    /// Returns whether an entry was removed.
    fn remove_by_id(&self, id: Uuid) -> Result<bool, QueueError>;

    fn is_empty(&self) -> Result<bool, QueueError>;

    /// Record a failed drain attempt. Returns the new attempt count, or
    /// `None` when the id is no longer queued.
    fn record_failure(&self, id: Uuid, error: &str) -> Result<Option<u32>, QueueError>;

    /// Clear attempt counters on every entry. Returns how many were reset.
    fn reset_attempts(&self) -> Result<usize, QueueError>;

    /// Note that the entry already exists in the store under `stored_id`.
    /// Returns `false` when the id is no longer queued.
    fn mark_synced(&self, id: Uuid, stored_id: Uuid) -> Result<bool, QueueError>;
}

/// On-disk shape of the queue file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct QueueDocument {
    version: u32,
    #[serde(default)]
    entries: Vec<OfflineQueueEntry>,
}

#[derive(Debug, Default)]
struct Entries(Vec<OfflineQueueEntry>);

impl Entries {
    fn enqueue(&mut self, entry: OfflineQueueEntry) {
        match self.0.iter_mut().find(|e| e.id() == entry.id()) {
            Some(existing) => *existing = entry,
            None => self.0.push(entry),
        }
    }

    fn get(&self, id: Uuid) -> Option<OfflineQueueEntry> {
        self.0.iter().find(|e| e.id() == id).cloned()
    }

    fn remove(&mut self, id: Uuid) -> bool {
        let before = self.0.len();
        self.0.retain(|e| e.id() != id);
        self.0.len() != before
    }

    fn record_failure(&mut self, id: Uuid, error: &str) -> Option<u32> {
        let entry = self.0.iter_mut().find(|e| e.id() == id)?;
        entry.attempts += 1;
        entry.last_error = Some(error.to_string());
        Some(entry.attempts)
    }

    fn mark_synced(&mut self, id: Uuid, stored_id: Uuid) -> bool {
        match self.0.iter_mut().find(|e| e.id() == id) {
            Some(entry) => {
                entry.synced_as = Some(stored_id);
                true
            }
            None => false,
        }
    }

    fn reset_attempts(&mut self) -> usize {
        let mut reset = 0;
        for entry in self.0.iter_mut().filter(|e| e.attempts > 0) {
            entry.attempts = 0;
            entry.last_error = None;
            reset += 1;
        }
        reset
    }
}

fn lock(entries: &Mutex<Entries>) -> Result<MutexGuard<'_, Entries>, QueueError> {
    entries.lock().map_err(|_| QueueError::Poisoned)
}

/// Queue persisted as one JSON file, rewritten atomically on every mutation.
pub struct FileQueue {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl FileQueue {
    /// Open the queue at `path`. A missing file is an empty queue.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let path = path.into();
        let entries = if path.exists() {
            let bytes = std::fs::read(&path)?;
            let doc: QueueDocument = serde_json::from_slice(&bytes)?;
            if doc.version > QUEUE_VERSION {
                return Err(QueueError::UnsupportedVersion {
                    found: doc.version,
                    supported: QUEUE_VERSION,
                });
            }
            tracing::debug!(path = %path.display(), entries = doc.entries.len(), "offline queue loaded");
            doc.entries
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(Entries(entries)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `f` to a copy under the lock, persist it, then commit. A failed
    /// write leaves the in-memory queue unchanged.
    fn mutate<R>(&self, f: impl FnOnce(&mut Entries) -> R) -> Result<R, QueueError> {
        let mut guard = lock(&self.entries)?;
        let mut next = Entries(guard.0.clone());
        let out = f(&mut next);
        self.flush(&next)?;
        *guard = next;
        Ok(out)
    }

    fn flush(&self, entries: &Entries) -> Result<(), QueueError> {
        let doc = QueueDocument {
            version: QUEUE_VERSION,
            entries: entries.0.clone(),
        };
        let json = serde_json::to_vec_pretty(&doc)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;

        // Queue entries carry children's notes.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        tracing::debug!(path = %self.path.display(), entries = entries.0.len(), "offline queue flushed");
        Ok(())
    }
}

impl OfflineQueue for FileQueue {
    fn enqueue(&self, entry: OfflineQueueEntry) -> Result<(), QueueError> {
        self.mutate(|e| e.enqueue(entry))
    }

    fn list_all(&self) -> Result<Vec<OfflineQueueEntry>, QueueError> {
        Ok(lock(&self.entries)?.0.clone())
    }

    fn get(&self, id: Uuid) -> Result<Option<OfflineQueueEntry>, QueueError> {
        Ok(lock(&self.entries)?.get(id))
    }

    fn remove_by_id(&self, id: Uuid) -> Result<bool, QueueError> {
        self.mutate(|e| e.remove(id))
    }

    fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(lock(&self.entries)?.0.is_empty())
    }

    fn record_failure(&self, id: Uuid, error: &str) -> Result<Option<u32>, QueueError> {
        self.mutate(|e| e.record_failure(id, error))
    }

    fn reset_attempts(&self) -> Result<usize, QueueError> {
        self.mutate(|e| e.reset_attempts())
    }

    fn mark_synced(&self, id: Uuid, stored_id: Uuid) -> Result<bool, QueueError> {
        self.mutate(|e| e.mark_synced(id, stored_id))
    }
}

/// Same semantics as [`FileQueue`] without persistence.
#[derive(Default)]
pub struct MemoryQueue {
    entries: Mutex<Entries>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OfflineQueue for MemoryQueue {
    fn enqueue(&self, entry: OfflineQueueEntry) -> Result<(), QueueError> {
        lock(&self.entries)?.enqueue(entry);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<OfflineQueueEntry>, QueueError> {
        Ok(lock(&self.entries)?.0.clone())
    }

    fn get(&self, id: Uuid) -> Result<Option<OfflineQueueEntry>, QueueError> {
        Ok(lock(&self.entries)?.get(id))
    }

    fn remove_by_id(&self, id: Uuid) -> Result<bool, QueueError> {
        Ok(lock(&self.entries)?.remove(id))
    }

    fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(lock(&self.entries)?.0.is_empty())
    }

    fn record_failure(&self, id: Uuid, error: &str) -> Result<Option<u32>, QueueError> {
        Ok(lock(&self.entries)?.record_failure(id, error))
    }

    fn reset_attempts(&self) -> Result<usize, QueueError> {
        Ok(lock(&self.entries)?.reset_attempts())
    }

    fn mark_synced(&self, id: Uuid, stored_id: Uuid) -> Result<bool, QueueError> {
        Ok(lock(&self.entries)?.mark_synced(id, stored_id))
    }
}
