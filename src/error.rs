//! Crate-level error type.

use crate::artifact::{FetchError, LoadError, MaterializeError};
use crate::config::ConfigError;
use crate::encoding::EncodingError;
use crate::model::{ModelError, PredictError};
use crate::service::ServiceError;

/// Any failure this crate reports.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Predict(#[from] PredictError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<LoadError> for Error {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Fetch(e) => Error::Fetch(e),
            LoadError::Materialize(e) => Error::Materialize(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
