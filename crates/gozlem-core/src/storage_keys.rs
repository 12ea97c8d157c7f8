//! Object key conventions.
//!
//! Pure string functions, no SDK dependency. These define the canonical
//! layout of records in the backing bucket.

use uuid::Uuid;

pub const OBSERVATIONS_PREFIX: &str = "observations/";

pub fn observation(id: Uuid) -> String {
    format!("observations/{id}.json")
}

pub fn assessment(observation_id: Uuid) -> String {
    format!("assessments/{observation_id}.json")
}

pub const MEDIA_PREFIX: &str = "media/";

pub fn child_media_prefix(child_id: Uuid) -> String {
    format!("media/{child_id}/")
}

/// Media object key. Path separators in the file name are flattened so a
/// name can never escape the child's prefix.
pub fn media(child_id: Uuid, media_id: Uuid, file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("media/{child_id}/{media_id}-{safe}")
}

/// Child id encoded in a media key, if the key follows [`media`].
pub fn child_of_media_key(key: &str) -> Option<Uuid> {
    let rest = key.strip_prefix(MEDIA_PREFIX)?;
    let (child, _) = rest.split_once('/')?;
    child.parse().ok()
}

/// Offline queue file name inside the local data directory.
pub const OFFLINE_QUEUE_FILE: &str = "offline-queue.json";
