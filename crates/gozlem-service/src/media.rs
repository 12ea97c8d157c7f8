use gozlem_core::models::media::{MediaMetadata, PendingMedia};
use gozlem_core::models::observation::Observation;
use gozlem_storage::error::StoreError;
use gozlem_storage::store::MediaStore;

/// Upload pending blobs in order, moving each uploaded one into
/// `observation.media_ids`. On failure the unsent blobs stay in `pending`,
/// so a later retry does not upload anything twice.
pub async fn upload_pending(
    store: &dyn MediaStore,
    observation: &mut Observation,
    pending: &mut Vec<PendingMedia>,
) -> Result<(), StoreError> {
    while let Some(next) = pending.first() {
        let bytes = tokio::fs::read(&next.local_path).await?;
        let path = store
            .upload(observation.child_id, bytes, MediaMetadata::from(next))
            .await?;
        tracing::debug!(
            observation_id = %observation.id,
            path = %path,
            "pending media uploaded"
        );
        observation.media_ids.push(path);
        pending.remove(0);
    }
    Ok(())
}
