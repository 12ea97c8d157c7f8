use std::time::Duration;

use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_smithy_types::byte_stream::ByteStream;
use aws_smithy_types::error::display::DisplayErrorContext;

use crate::error::StoreError;

/// S3 error codes that indicate a retryable service-side condition.
const TRANSIENT_CODES: &[&str] = &[
    "InternalError",
    "ServiceUnavailable",
    "SlowDown",
    "RequestTimeout",
];

/// Map an SDK failure onto the store taxonomy.
///
/// Timeouts, dispatch failures, unparseable responses, 5xx statuses and the
/// throttling codes are transient. Missing keys are `NotFound`. Everything
/// else is a rejection.
pub fn classify<E>(err: SdkError<E, HttpResponse>, key: &str) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            return StoreError::Transient(message);
        }
        _ => {}
    }

    if let Some(code) = err.code() {
        if code == "NoSuchKey" || code == "NotFound" {
            return StoreError::not_found(key);
        }
        if TRANSIENT_CODES.contains(&code) {
            return StoreError::Transient(message);
        }
    }
    if let Some(resp) = err.raw_response()
        && resp.status().is_server_error()
    {
        return StoreError::Transient(message);
    }
    StoreError::Rejected(message)
}

/// Read an object's full body.
pub async fn get_object(client: &Client, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
    let resp = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| classify(e, key))?;

    let bytes = resp
        .body
        .collect()
        .await
        .map_err(|e| StoreError::Transient(format!("reading {key}: {e}")))?;
    Ok(bytes.into_bytes().to_vec())
}

/// Put an object to S3.
pub async fn put_object(
    client: &Client,
    bucket: &str,
    key: &str,
    body: Vec<u8>,
    content_type: Option<&str>,
) -> Result<(), StoreError> {
    let mut req = client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body));

    if let Some(ct) = content_type {
        req = req.content_type(ct);
    }

    req.send().await.map_err(|e| classify(e, key))?;
    Ok(())
}

/// Delete an object from S3. Deleting a missing key succeeds.
pub async fn delete_object(client: &Client, bucket: &str, key: &str) -> Result<(), StoreError> {
    client
        .delete_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| classify(e, key))?;

    Ok(())
}

/// Key and modification time of a listed object.
pub struct ObjectMeta {
    pub key: String,
    pub last_modified: Option<jiff::Timestamp>,
}

/// List every object under a prefix, following continuation tokens.
pub async fn list_objects_with_metadata(
    client: &Client,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<ObjectMeta>, StoreError> {
    let mut objects = Vec::new();
    let mut continuation_token: Option<String> = None;

    loop {
        let mut req = client.list_objects_v2().bucket(bucket).prefix(prefix);

        if let Some(token) = &continuation_token {
            req = req.continuation_token(token);
        }

        let resp = req.send().await.map_err(|e| classify(e, prefix))?;

        for obj in resp.contents() {
            if let Some(key) = obj.key() {
                objects.push(ObjectMeta {
                    key: key.to_string(),
                    last_modified: obj
                        .last_modified()
                        .and_then(|t| jiff::Timestamp::from_second(t.secs()).ok()),
                });
            }
        }

        if resp.is_truncated() == Some(true) {
            continuation_token = resp.next_continuation_token().map(|s| s.to_string());
        } else {
            break;
        }
    }

    Ok(objects)
}

/// List object keys under a prefix.
pub async fn list_objects(
    client: &Client,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<String>, StoreError> {
    Ok(list_objects_with_metadata(client, bucket, prefix)
        .await?
        .into_iter()
        .map(|o| o.key)
        .collect())
}

/// Generate a presigned GET URL for an object.
pub async fn presign_get(
    client: &Client,
    bucket: &str,
    key: &str,
    expires_in: Duration,
) -> Result<String, StoreError> {
    let presign_config = PresigningConfig::builder()
        .expires_in(expires_in)
        .build()
        .map_err(|e| StoreError::Rejected(e.to_string()))?;

    let presigned = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .presigned(presign_config)
        .await
        .map_err(|e| classify(e, key))?;

    Ok(presigned.uri().to_string())
}
