//! Turning a fetched bundle into a [`BoosterModel`].

use std::path::{Path, PathBuf};

use crate::compat::{FormatError, XgbModel};
use crate::features::{FeatureSchema, FEATURE_SCHEMA};
use crate::model::{BoosterModel, ModelError, SchemaMismatch};

use super::archive::{extract_archive, locate_model_file};

/// Name of the model file SageMaker's XGBoost container writes into the bundle.
pub const DEFAULT_MODEL_FILE: &str = "xgboost-model";

/// The bundle could not be turned into a usable model.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("{} is not a valid tar.gz archive: {reason}", path.display())]
    InvalidArchive { path: PathBuf, reason: String },

    #[error("archive {} lies inside the extraction directory {}", archive.display(), dir.display())]
    ArchiveInsideExtractDir { archive: PathBuf, dir: PathBuf },

    #[error("model file `{name}` not found under {}", dir.display())]
    ModelFileMissing { name: String, dir: PathBuf },

    #[error("{} is not an XGBoost model file", path.display())]
    UnrecognizedFormat { path: PathBuf },

    #[error("failed to parse model file {}: {source}", path.display())]
    CorruptModel {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("invalid model: {0}")]
    Model(#[from] ModelError),

    #[error("model does not match the booking feature schema: {0}")]
    SchemaMismatch(#[from] SchemaMismatch),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MaterializeError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        MaterializeError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Where to unpack the bundle and what to look for inside it.
#[derive(Debug, Clone)]
pub struct MaterializeOptions {
    /// Directory the archive is unpacked into. Cleared before extraction.
    pub extract_dir: PathBuf,
    /// File name of the model inside the bundle.
    pub model_file_name: String,
    /// Input layout the model must accept.
    pub schema: FeatureSchema,
}

impl MaterializeOptions {
    pub fn new(extract_dir: impl Into<PathBuf>) -> Self {
        Self {
            extract_dir: extract_dir.into(),
            model_file_name: DEFAULT_MODEL_FILE.to_owned(),
            schema: FEATURE_SCHEMA,
        }
    }

    pub fn with_model_file_name(mut self, name: impl Into<String>) -> Self {
        self.model_file_name = name.into();
        self
    }
}

/// Read and convert a model file.
///
/// XGBoost JSON, UBJSON and the legacy binary layout are accepted; the
/// format is detected from the leading bytes. Anything else (a pickle, an
/// empty file) is [`UnrecognizedFormat`](MaterializeError::UnrecognizedFormat).
pub fn load_model_file(path: &Path) -> Result<BoosterModel, MaterializeError> {
    let bytes = std::fs::read(path).map_err(|e| MaterializeError::io(path, e))?;

    let (xgb, format) = XgbModel::from_bytes(&bytes).map_err(|source| match source {
        FormatError::Unrecognized => MaterializeError::UnrecognizedFormat {
            path: path.to_path_buf(),
        },
        source => MaterializeError::CorruptModel {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let model = BoosterModel::from_xgboost(&xgb)?;

    tracing::info!(
        path = %path.display(),
        %format,
        version = ?xgb.version,
        booster = xgb.learner.gradient_booster.name(),
        objective = model.objective().name(),
        trees = model.num_trees(),
        features = model.num_features(),
        "loaded model"
    );
    Ok(model)
}

/// Extract `archive`, load the model inside and check it against the schema.
pub fn materialize(archive: &Path, options: &MaterializeOptions) -> Result<BoosterModel, MaterializeError> {
    let dest = &options.extract_dir;
    if archive.starts_with(dest) {
        return Err(MaterializeError::ArchiveInsideExtractDir {
            archive: archive.to_path_buf(),
            dir: dest.clone(),
        });
    }
    if dest.exists() {
        std::fs::remove_dir_all(dest).map_err(|e| MaterializeError::io(dest, e))?;
    }
    extract_archive(archive, dest)?;

    let model_path = locate_model_file(dest, &options.model_file_name)?;
    let model = load_model_file(&model_path)?;
    model.check_schema(&options.schema)?;

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{booking_model_json, to_legacy_binary, to_ubjson, write_bundle};

    #[test]
    fn materializes_bundled_model() {
        let staging = tempfile::tempdir().unwrap();
        let archive = staging.path().join("model.tar.gz");
        let json = serde_json::to_vec(&booking_model_json()).unwrap();
        write_bundle(&archive, &[("xgboost-model", json.as_slice())]).unwrap();

        let model = materialize(&archive, &MaterializeOptions::new(staging.path().join("x"))).unwrap();
        assert_eq!(model.num_features(), 17);
        assert!(model.num_trees() > 0);
    }

    #[test]
    fn custom_model_file_name() {
        let staging = tempfile::tempdir().unwrap();
        let archive = staging.path().join("model.tar.gz");
        let json = serde_json::to_vec(&booking_model_json()).unwrap();
        write_bundle(&archive, &[("model.json", json.as_slice())]).unwrap();

        let options = MaterializeOptions::new(staging.path().join("x"));
        assert!(matches!(
            materialize(&archive, &options),
            Err(MaterializeError::ModelFileMissing { .. })
        ));

        let options = options.with_model_file_name("model.json");
        assert!(materialize(&archive, &options).is_ok());
    }

    #[test]
    fn archive_inside_extract_dir_is_rejected() {
        let staging = tempfile::tempdir().unwrap();
        let archive = staging.path().join("model");
        let json = serde_json::to_vec(&booking_model_json()).unwrap();
        write_bundle(&archive, &[("xgboost-model", json.as_slice())]).unwrap();

        let err = materialize(&archive, &MaterializeOptions::new(staging.path().join("model"))).unwrap_err();
        assert!(matches!(err, MaterializeError::ArchiveInsideExtractDir { .. }));
        assert!(archive.is_file(), "the archive must survive");

        let nested = staging.path().join("x").join("bundle.tar.gz");
        std::fs::create_dir_all(nested.parent().unwrap()).unwrap();
        std::fs::copy(&archive, &nested).unwrap();
        let err = materialize(&nested, &MaterializeOptions::new(staging.path().join("x"))).unwrap_err();
        assert!(matches!(err, MaterializeError::ArchiveInsideExtractDir { .. }));
    }

    #[test]
    fn loads_every_xgboost_format() {
        let dir = tempfile::tempdir().unwrap();
        let json = booking_model_json();
        let xgb = crate::compat::XgbModel::from_value(&json).unwrap();
        let reference = load_bytes(dir.path(), "model.json", &serde_json::to_vec(&json).unwrap());

        for (name, bytes) in [("model.ubj", to_ubjson(&json)), ("model.bin", to_legacy_binary(&xgb))] {
            let model = load_bytes(dir.path(), name, &bytes);
            assert_eq!(model.num_trees(), reference.num_trees(), "{name}");
            assert_eq!(model.num_features(), 17, "{name}");
            assert_eq!(model.objective(), reference.objective(), "{name}");
            let row = [0.0f32; 17];
            assert_eq!(model.predict_row(&row), reference.predict_row(&row), "{name}");
        }
    }

    fn load_bytes(dir: &Path, name: &str, bytes: &[u8]) -> BoosterModel {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        load_model_file(&path).unwrap()
    }

    #[test]
    fn pickle_is_unrecognized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xgboost-model");
        std::fs::write(&path, b"\x80\x04\x95\x10\x00\x00\x00\x00\x00\x00\x00").unwrap();

        assert!(matches!(
            load_model_file(&path),
            Err(MaterializeError::UnrecognizedFormat { .. })
        ));
    }

    #[test]
    fn truncated_binary_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xgboost-model");
        std::fs::write(&path, [0x62, 0x69, 0x6e, 0x66, 0x00, 0x00]).unwrap();

        assert!(matches!(
            load_model_file(&path),
            Err(MaterializeError::CorruptModel { .. })
        ));
    }

    #[test]
    fn truncated_json_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xgboost-model");
        std::fs::write(&path, b"  {\"version\": [1, 7, 6], \"learner\": ").unwrap();

        assert!(matches!(
            load_model_file(&path),
            Err(MaterializeError::CorruptModel { .. })
        ));
    }

    #[test]
    fn wide_model_fails_schema_check() {
        let staging = tempfile::tempdir().unwrap();
        let archive = staging.path().join("model.tar.gz");
        let mut json = booking_model_json();
        json["learner"]["learner_model_param"]["num_feature"] = "18".into();
        json["learner"]["feature_names"] = serde_json::json!([]);
        let bytes = serde_json::to_vec(&json).unwrap();
        write_bundle(&archive, &[("xgboost-model", bytes.as_slice())]).unwrap();

        let err = materialize(&archive, &MaterializeOptions::new(staging.path().join("x"))).unwrap_err();
        assert!(matches!(
            err,
            MaterializeError::SchemaMismatch(SchemaMismatch::FeatureCount { model: 18, schema: 17 })
        ));
    }
}
