use std::time::Duration;

use aws_sdk_s3::Client;
use futures::future::try_join_all;
use gozlem_core::models::assessment::Assessment;
use gozlem_core::models::media::{MediaEvent, MediaMetadata};
use gozlem_core::models::observation::{Observation, ObservationPatch};
use gozlem_core::storage_keys;
use uuid::Uuid;

use crate::documents::{load_document, save_document};
use crate::error::StoreError;
use crate::objects;
use crate::store::{
    AssessmentStore, BoxFuture, MediaStore, ObservationFilter, ObservationStore, sort_newest_first,
};

/// Observation, assessment and media storage in a single S3 bucket.
///
/// Records are JSON documents under [`storage_keys`]. Queries list a prefix
/// and filter after decoding, so they are linear in the bucket's record count.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn load_observation(&self, id: Uuid) -> Result<Option<Observation>, StoreError> {
        load_document(&self.client, &self.bucket, &storage_keys::observation(id)).await
    }

    async fn save_observation(&self, observation: &Observation) -> Result<(), StoreError> {
        let key = storage_keys::observation(observation.id);
        save_document(&self.client, &self.bucket, &key, observation).await
    }

    async fn load_all_observations(&self) -> Result<Vec<Observation>, StoreError> {
        let keys = objects::list_objects(
            &self.client,
            &self.bucket,
            storage_keys::OBSERVATIONS_PREFIX,
        )
        .await?;

        let loads = keys.iter().map(|key| async move {
            load_document::<Observation>(&self.client, &self.bucket, key).await
        });
        // A key can disappear between list and get; skip it.
        Ok(try_join_all(loads).await?.into_iter().flatten().collect())
    }
}

impl ObservationStore for S3Store {
    fn insert(&self, mut observation: Observation) -> BoxFuture<'_, Result<Observation, StoreError>> {
        Box::pin(async move {
            observation.id = Uuid::new_v4();
            observation.pending_sync = false;
            self.save_observation(&observation).await?;
            tracing::debug!(
                observation_id = %observation.id,
                child_id = %observation.child_id,
                "observation stored"
            );
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
            let mut observation = self
                .load_observation(id)
                .await?
                .ok_or_else(|| StoreError::not_found(storage_keys::observation(id)))?;
            patch.apply(&mut observation, now);
            self.save_observation(&observation).await?;
            Ok(observation)
        })
    }

    fn delete(&self, id: Uuid) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            objects::delete_object(&self.client, &self.bucket, &storage_keys::observation(id)).await
        })
    }

    fn get(&self, id: Uuid) -> BoxFuture<'_, Result<Option<Observation>, StoreError>> {
        Box::pin(async move { self.load_observation(id).await })
    }

    fn query_by_child(&self, child_id: Uuid) -> BoxFuture<'_, Result<Vec<Observation>, StoreError>> {
        Box::pin(async move {
            let mut observations = self.load_all_observations().await?;
            observations.retain(|o| o.child_id == child_id);
            sort_newest_first(&mut observations);
            Ok(observations)
        })
    }

    fn query_by_filter(
        &self,
        filter: ObservationFilter,
    ) -> BoxFuture<'_, Result<Vec<Observation>, StoreError>> {
        Box::pin(async move { Ok(filter.apply(self.load_all_observations().await?)) })
    }
}

impl AssessmentStore for S3Store {
    fn upsert(&self, assessment: Assessment) -> BoxFuture<'_, Result<Assessment, StoreError>> {
        Box::pin(async move {
            let key = storage_keys::assessment(assessment.observation_id);
            save_document(&self.client, &self.bucket, &key, &assessment).await?;
            Ok(assessment)
        })
    }

    fn delete_by_observation(&self, observation_id: Uuid) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let key = storage_keys::assessment(observation_id);
            objects::delete_object(&self.client, &self.bucket, &key).await
        })
    }

    fn get_by_observation(
        &self,
        observation_id: Uuid,
    ) -> BoxFuture<'_, Result<Option<Assessment>, StoreError>> {
        Box::pin(async move {
            let key = storage_keys::assessment(observation_id);
            load_document(&self.client, &self.bucket, &key).await
        })
    }

    fn query_by_observations(
        &self,
        observation_ids: Vec<Uuid>,
    ) -> BoxFuture<'_, Result<Vec<Assessment>, StoreError>> {
        Box::pin(async move {
            let loads = observation_ids.into_iter().map(|id| async move {
                let key = storage_keys::assessment(id);
                load_document::<Assessment>(&self.client, &self.bucket, &key).await
            });
            Ok(try_join_all(loads).await?.into_iter().flatten().collect())
        })
    }
}

impl MediaStore for S3Store {
    fn upload(
        &self,
        child_id: Uuid,
        bytes: Vec<u8>,
        metadata: MediaMetadata,
    ) -> BoxFuture<'_, Result<String, StoreError>> {
        Box::pin(async move {
            let key = storage_keys::media(child_id, Uuid::new_v4(), &metadata.file_name);
            objects::put_object(
                &self.client,
                &self.bucket,
                &key,
                bytes,
                metadata.content_type.as_deref(),
            )
            .await?;
            tracing::debug!(child_id = %child_id, key = %key, "media uploaded");
            Ok(key)
        })
    }

    fn signed_url(&self, path: String, ttl: Duration) -> BoxFuture<'_, Result<String, StoreError>> {
        Box::pin(async move { objects::presign_get(&self.client, &self.bucket, &path, ttl).await })
    }

    fn media_events(
        &self,
        child_ids: Vec<Uuid>,
        since: jiff::Timestamp,
    ) -> BoxFuture<'_, Result<Vec<MediaEvent>, StoreError>> {
        Box::pin(async move {
            let prefix = match child_ids.as_slice() {
                [only] => storage_keys::child_media_prefix(*only),
                _ => storage_keys::MEDIA_PREFIX.to_string(),
            };
            let objects =
                objects::list_objects_with_metadata(&self.client, &self.bucket, &prefix).await?;

            Ok(objects
                .into_iter()
                .filter_map(|o| {
                    let child_id = storage_keys::child_of_media_key(&o.key)?;
                    let created_at = o.last_modified?;
                    Some(MediaEvent {
                        child_id,
                        created_at,
                    })
                })
                .filter(|e| child_ids.is_empty() || child_ids.contains(&e.child_id))
                .filter(|e| e.created_at >= since)
                .collect())
        })
    }
}
