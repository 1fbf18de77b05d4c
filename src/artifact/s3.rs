//! S3-backed artifact store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use tokio::io::AsyncWriteExt;

use super::store::{ArtifactLocation, ArtifactStore, FetchError};
use crate::config::AwsCredentials;

/// Error codes S3 returns when the caller's credentials are missing,
/// expired or lack permission.
const AUTH_ERROR_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "InvalidToken",
    "AllAccessDisabled",
];

/// Downloads bundles with `GetObject`. Requests are attempted once.
#[derive(Debug, Clone)]
pub struct S3ArtifactStore {
    client: aws_sdk_s3::Client,
}

impl S3ArtifactStore {
    /// Build a client from explicit credentials.
    ///
    /// Fields left unset fall back to the SDK's default provider chain.
    pub async fn from_credentials(credentials: &AwsCredentials) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).retry_config(RetryConfig::disabled());

        if let Some(region) = &credentials.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let (Some(id), Some(secret)) = (&credentials.access_key_id, &credentials.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                id.clone(),
                secret.clone(),
                credentials.session_token.clone(),
                None,
                "hotel-inference",
            ));
        }

        let sdk_config = loader.load().await;
        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
        }
    }

    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

fn classify(location: &ArtifactLocation, err: SdkError<GetObjectError>) -> FetchError {
    if let SdkError::ServiceError(service) = &err {
        let inner = service.err();
        if inner.is_no_such_key() || inner.code() == Some("NoSuchBucket") {
            return FetchError::NotFound {
                location: location.clone(),
            };
        }
        let status = service.raw().status().as_u16();
        if status == 401 || status == 403 || inner.code().is_some_and(|c| AUTH_ERROR_CODES.contains(&c)) {
            return FetchError::Unauthorized {
                location: location.clone(),
                message: DisplayErrorContext(&err).to_string(),
            };
        }
    }
    FetchError::Transport {
        location: location.clone(),
        message: DisplayErrorContext(&err).to_string(),
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn fetch(&self, location: &ArtifactLocation, staging_dir: &Path) -> Result<PathBuf, FetchError> {
        tracing::info!(%location, "downloading model artifact");

        let output = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| classify(location, e))?;

        tokio::fs::create_dir_all(staging_dir)
            .await
            .map_err(|e| FetchError::io(staging_dir, e))?;
        let dest = staging_dir.join(location.file_name());
        let mut file = tokio::fs::File::create(&dest)
            .await
            .map_err(|e| FetchError::io(&dest, e))?;

        let mut body = output.body;
        let mut bytes = 0u64;
        while let Some(chunk) = body.try_next().await.map_err(|e| FetchError::Transport {
            location: location.clone(),
            message: DisplayErrorContext(&e).to_string(),
        })? {
            file.write_all(&chunk).await.map_err(|e| FetchError::io(&dest, e))?;
            bytes += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| FetchError::io(&dest, e))?;

        tracing::info!(%location, path = %dest.display(), bytes, "downloaded model artifact");
        Ok(dest)
    }
}
