use gozlem_storage::s3::S3Store;

use crate::config::{CredentialSource, GozlemConfig};

/// Build an `SdkConfig` from a region and credential source.
pub async fn build_aws_config(region: &str, creds: &CredentialSource) -> aws_config::SdkConfig {
    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));

    match creds {
        CredentialSource::Inline {
            access_key_id,
            secret_access_key,
            session_token,
        } => {
            builder = builder.credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key_id,
                secret_access_key,
                session_token.clone(),
                None,
                "gozlem-config",
            ));
        }
        CredentialSource::Profile { profile_name } => {
            builder = builder.profile_name(profile_name);
        }
        CredentialSource::DefaultChain => {}
    }

    builder.load().await
}

/// S3-backed store for the configured bucket.
pub async fn build_store(config: &GozlemConfig) -> S3Store {
    let sdk = build_aws_config(&config.region, &config.credentials).await;
    tracing::debug!(region = %config.region, bucket = %config.bucket, "S3 client ready");
    S3Store::new(aws_sdk_s3::Client::new(&sdk), config.bucket.clone())
}
