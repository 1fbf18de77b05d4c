//! Test case loading utilities for integration tests.
//!
//! For assertion helpers, use `hotel_inference::testing`.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use hotel_inference::artifact::{ArtifactLocation, LocalArtifactStore, MaterializeOptions, EXTRACT_DIR};
use hotel_inference::compat::XgbModel;
use hotel_inference::encoding::EncodingPolicy;
use hotel_inference::model::BoosterModel;
use hotel_inference::service::PredictionService;
use hotel_inference::testing::write_bundle;

#[allow(unused_imports)]
pub use hotel_inference::assert_approx_eq;
#[allow(unused_imports)]
pub use hotel_inference::testing::{sigmoid, zero_booking, DEFAULT_TOLERANCE};

pub const BUCKET: &str = "sprint4-5";
pub const KEY: &str = "modelos/hotel_reservation/output/model.tar.gz";

// =============================================================================
// Test Case Loading
// =============================================================================

/// Base directory for test cases.
pub fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/test-cases")
}

/// Directory for XGBoost test cases.
pub fn xgboost_test_cases_dir() -> PathBuf {
    test_cases_dir().join("xgboost")
}

/// Load a JSON file and deserialize it.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> T {
    let file = File::open(path).unwrap_or_else(|e| panic!("Failed to open {}: {e}", path.display()));
    serde_json::from_reader(file).unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()))
}

/// Input feature rows for a test case.
#[derive(Debug, Deserialize)]
pub struct TestInput {
    pub features: Vec<Vec<f64>>,
    pub num_rows: usize,
    pub num_features: usize,
}

impl TestInput {
    pub fn to_f32_rows(&self) -> Vec<Vec<f32>> {
        self.features
            .iter()
            .map(|row| row.iter().map(|&v| v as f32).collect())
            .collect()
    }
}

/// Expected outputs for a test case.
#[derive(Debug, Deserialize)]
pub struct TestExpected {
    /// Raw margins.
    pub predictions: Vec<f64>,
    /// Scores after the objective's transform.
    pub predictions_transformed: Vec<f64>,
    #[serde(default)]
    pub objective: Option<String>,
}

/// Load `<name>.model.json`, `<name>.input.json` and `<name>.expected.json`.
pub fn load_case(name: &str) -> (XgbModel, TestInput, TestExpected) {
    let dir = xgboost_test_cases_dir();
    let model: XgbModel = load_json(&dir.join(format!("{name}.model.json")));
    let input: TestInput = load_json(&dir.join(format!("{name}.input.json")));
    let expected: TestExpected = load_json(&dir.join(format!("{name}.expected.json")));
    (model, input, expected)
}

pub fn booking_model_path() -> PathBuf {
    xgboost_test_cases_dir().join("booking_status.model.json")
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn booking_service(policy: EncodingPolicy) -> PredictionService {
    let (xgb, _, _) = load_case("booking_status");
    let model = BoosterModel::from_xgboost(&xgb).expect("booking model converts");
    PredictionService::new(Arc::new(model), policy)
}

/// A local store under `root` holding the bundle at [`BUCKET`]/[`KEY`]
/// with `files` inside.
pub fn local_store_with(root: &Path, files: &[(&str, &[u8])]) -> (LocalArtifactStore, ArtifactLocation) {
    local_store_at(root, KEY, files)
}

/// Like [`local_store_with`], with the bundle stored under `key`.
pub fn local_store_at(root: &Path, key: &str, files: &[(&str, &[u8])]) -> (LocalArtifactStore, ArtifactLocation) {
    let archive = root.join(BUCKET).join(key);
    std::fs::create_dir_all(archive.parent().expect("key has a parent")).expect("create store dirs");
    write_bundle(&archive, files).expect("write bundle");
    (LocalArtifactStore::new(root), ArtifactLocation::new(BUCKET, key))
}

/// A local store holding the booking model as SageMaker packages it.
pub fn booking_store(root: &Path) -> (LocalArtifactStore, ArtifactLocation) {
    let model = std::fs::read(booking_model_path()).expect("read fixture");
    local_store_with(root, &[("xgboost-model", model.as_slice())])
}

pub fn materialize_options(staging: &Path) -> MaterializeOptions {
    MaterializeOptions::new(staging.join(EXTRACT_DIR))
}
