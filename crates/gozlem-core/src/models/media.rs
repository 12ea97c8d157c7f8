use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// A media blob captured while offline, still on local disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMedia {
    pub local_path: PathBuf,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Upload metadata passed to the media store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl From<&PendingMedia> for MediaMetadata {
    fn from(p: &PendingMedia) -> Self {
        Self {
            file_name: p.file_name.clone(),
            content_type: p.content_type.clone(),
        }
    }
}

/// A media upload as seen by activity reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MediaEvent {
    pub child_id: Uuid,
    pub created_at: jiff::Timestamp,
}
