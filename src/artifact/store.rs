//! Artifact store clients.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Bucket/key address of an artifact in object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub bucket: String,
    pub key: String,
}

impl ArtifactLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Last path segment of the key, used as the local file name.
    pub fn file_name(&self) -> &str {
        match self.key.rsplit('/').next() {
            Some(name) if !name.is_empty() => name,
            _ => "artifact",
        }
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Retrieving an artifact failed. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("artifact {location} not found")]
    NotFound { location: ArtifactLocation },
    #[error("access to {location} denied: {message}")]
    Unauthorized {
        location: ArtifactLocation,
        message: String,
    },
    #[error("failed to download {location}: {message}")]
    Transport {
        location: ArtifactLocation,
        message: String,
    },
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Source of model bundles.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Download the artifact into `staging_dir` and return the local path.
    ///
    /// The file is named after the last segment of the key and replaces any
    /// file of that name already in `staging_dir`.
    async fn fetch(&self, location: &ArtifactLocation, staging_dir: &Path) -> Result<PathBuf, FetchError>;
}

/// Artifact store backed by a local directory laid out as `root/bucket/key`.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, location: &ArtifactLocation) -> PathBuf {
        self.root.join(&location.bucket).join(&location.key)
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn fetch(&self, location: &ArtifactLocation, staging_dir: &Path) -> Result<PathBuf, FetchError> {
        let source = self.resolve(location);
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            return Err(FetchError::NotFound {
                location: location.clone(),
            });
        }

        tokio::fs::create_dir_all(staging_dir)
            .await
            .map_err(|e| FetchError::io(staging_dir, e))?;
        let dest = staging_dir.join(location.file_name());
        let bytes = tokio::fs::copy(&source, &dest)
            .await
            .map_err(|e| FetchError::io(&dest, e))?;

        tracing::info!(%location, path = %dest.display(), bytes, "fetched model artifact from local store");
        Ok(dest)
    }
}
