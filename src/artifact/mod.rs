//! Model artifact acquisition and materialization.
//!
//! At startup the model bundle (a gzip-compressed tar archive) is fetched from
//! an [`ArtifactStore`] into `<staging>/download`, unpacked into
//! `<staging>/model`, and the model file inside it is loaded into a
//! [`BoosterModel`](crate::model::BoosterModel). Both steps run exactly once
//! per process and any failure is fatal.

mod archive;
mod materialize;
mod store;

#[cfg(feature = "s3")]
mod s3;

pub use archive::{extract_archive, locate_model_file};
pub use materialize::{
    load_model_file, materialize, MaterializeError, MaterializeOptions, DEFAULT_MODEL_FILE,
};
pub use store::{ArtifactLocation, ArtifactStore, FetchError, LocalArtifactStore};

#[cfg(feature = "s3")]
pub use s3::S3ArtifactStore;

use std::path::Path;

use crate::model::BoosterModel;

/// Subdirectory of the staging directory that receives the downloaded bundle.
pub const DOWNLOAD_DIR: &str = "download";
/// Subdirectory of the staging directory the bundle is unpacked into.
pub const EXTRACT_DIR: &str = "model";

/// Fetching or materializing the model failed.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
}

/// Fetch the bundle at `location` into `<staging_dir>/download` and
/// materialize it.
///
/// Materialization does blocking file IO; this is meant for startup, before
/// the server accepts connections.
pub async fn load_model(
    store: &dyn ArtifactStore,
    location: &ArtifactLocation,
    staging_dir: &Path,
    options: &MaterializeOptions,
) -> Result<BoosterModel, LoadError> {
    let archive = store.fetch(location, &staging_dir.join(DOWNLOAD_DIR)).await?;
    let model = materialize(&archive, options)?;
    Ok(model)
}
