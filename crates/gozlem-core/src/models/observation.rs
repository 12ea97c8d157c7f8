use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::domain::{Domain, ObservationContext};
use crate::models::media::PendingMedia;

/// A teacher's free-text observation of one child.
///
/// `id` is issued by the store once the record is durable. While the
/// observation only lives in the offline queue it carries a client-issued
/// v4 UUID and `pending_sync = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Observation {
    pub id: Uuid,
    pub child_id: Uuid,
    pub author_id: Uuid,
    pub note: String,
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub context: ObservationContext,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub media_ids: Vec<String>,
    #[serde(default)]
    pub shared_with_family: bool,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
    #[serde(default)]
    pub pending_sync: bool,
}

impl Observation {
    /// Materialize a validated draft as a local (not yet durable) observation.
    ///
    /// Pending media blobs are split off; they travel with the queue entry
    /// until uploaded.
    pub fn from_draft(id: Uuid, draft: ValidDraft, now: jiff::Timestamp) -> (Self, Vec<PendingMedia>) {
        let ObservationDraft {
            child_id,
            author_id,
            note,
            domains,
            context,
            tags,
            media_ids,
            pending_media,
            shared_with_family,
        } = draft.0;

        let observation = Self {
            id,
            child_id,
            author_id,
            note,
            domains,
            context,
            tags,
            media_ids,
            shared_with_family,
            created_at: now,
            updated_at: now,
            pending_sync: true,
        };
        (observation, pending_media)
    }
}

/// Unvalidated input for a new observation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationDraft {
    pub child_id: Uuid,
    pub author_id: Uuid,
    pub note: String,
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub context: ObservationContext,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub media_ids: Vec<String>,
    #[serde(default)]
    pub pending_media: Vec<PendingMedia>,
    #[serde(default)]
    pub shared_with_family: bool,
}

/// A draft that passed [`ObservationDraft::validate`].
#[derive(Debug, Clone)]
pub struct ValidDraft(ObservationDraft);

impl ValidDraft {
    pub fn draft(&self) -> &ObservationDraft {
        &self.0
    }
}

impl ObservationDraft {
    /// Normalize and validate: trimmed non-empty note, at least one domain
    /// (deduplicated, first-seen order), cleaned tag list.
    pub fn validate(mut self) -> Result<ValidDraft, ValidationError> {
        self.note = normalize_note(&self.note)?;
        self.domains = normalize_domains(&self.domains)?;
        self.tags = normalize_tags(&self.tags);
        Ok(ValidDraft(self))
    }
}

/// Editable fields of a stored observation. Child and author are immutable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<Domain>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ObservationContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_with_family: Option<bool>,
}

impl ObservationPatch {
    pub fn is_empty(&self) -> bool {
        self.note.is_none()
            && self.domains.is_none()
            && self.context.is_none()
            && self.tags.is_none()
            && self.shared_with_family.is_none()
    }

    /// Apply the same normalization rules as drafts to the fields present.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(note) = &self.note {
            self.note = Some(normalize_note(note)?);
        }
        if let Some(domains) = &self.domains {
            self.domains = Some(normalize_domains(domains)?);
        }
        if let Some(tags) = &self.tags {
            self.tags = Some(normalize_tags(tags));
        }
        Ok(self)
    }

    /// Whether applying this patch changes the inputs of the risk heuristic.
    pub fn changes_assessment_inputs(&self, current: &Observation) -> bool {
        let note_changed = self.note.as_ref().is_some_and(|n| *n != current.note);
        let domains_changed = self
            .domains
            .as_ref()
            .is_some_and(|d| *d != current.domains);
        note_changed || domains_changed
    }

    pub fn apply(&self, observation: &mut Observation, now: jiff::Timestamp) {
        if let Some(note) = &self.note {
            observation.note = note.clone();
        }
        if let Some(domains) = &self.domains {
            observation.domains = domains.clone();
        }
        if let Some(context) = self.context {
            observation.context = context;
        }
        if let Some(tags) = &self.tags {
            observation.tags = tags.clone();
        }
        if let Some(shared) = self.shared_with_family {
            observation.shared_with_family = shared;
        }
        observation.updated_at = now;
    }
}

pub fn normalize_note(note: &str) -> Result<String, ValidationError> {
    let trimmed = note.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyNote);
    }
    Ok(trimmed.to_string())
}

pub fn normalize_domains(domains: &[Domain]) -> Result<Vec<Domain>, ValidationError> {
    let mut out: Vec<Domain> = Vec::with_capacity(domains.len());
    for d in domains {
        if !out.contains(d) {
            out.push(*d);
        }
    }
    if out.is_empty() {
        return Err(ValidationError::NoDomains);
    }
    Ok(out)
}

/// Trim, drop empties, and deduplicate case-insensitively keeping the first
/// spelling and position.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(str::to_string)
        .collect()
}
