//! XGBoost inference tests: parsing, conversion and prediction of the
//! booking model against precomputed outputs.

mod common;

use hotel_inference::features::FEATURE_SCHEMA;
use hotel_inference::compat::{ModelFormat, XgbModel};
use hotel_inference::model::{BoosterModel, ModelSource};
use hotel_inference::objective::Objective;
use hotel_inference::testing::{booking_model_json, to_legacy_binary, to_ubjson};

use common::{assert_approx_eq, load_case, DEFAULT_TOLERANCE};

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn parse_booking_model() {
    let (model, input, _) = load_case("booking_status");

    assert_eq!(model.version, [1, 7, 6]);
    assert_eq!(model.learner.gradient_booster.name(), "gbtree");
    assert_eq!(model.learner.learner_model_param.num_feature, 17);
    assert_eq!(model.learner.feature_names.len(), 17);
    assert_eq!(input.num_features, 17);
    assert_eq!(input.features.len(), input.num_rows);
}

// =============================================================================
// Conversion
// =============================================================================

#[test]
fn convert_booking_model() {
    let (xgb, _, _) = load_case("booking_status");
    let model = BoosterModel::from_xgboost(&xgb).unwrap();

    assert_eq!(model.num_trees(), 3);
    assert_eq!(model.num_features(), 17);
    assert_eq!(model.objective(), Objective::BinaryLogistic);
    assert_eq!(model.source(), &ModelSource::XGBoost { version: [1, 7, 6] });
    assert_eq!(model.check_schema(&FEATURE_SCHEMA), Ok(()));
}

// =============================================================================
// Prediction
// =============================================================================

#[test]
fn predict_booking_rows() {
    let (xgb, input, expected) = load_case("booking_status");
    let model = BoosterModel::from_xgboost(&xgb).unwrap();
    assert_eq!(expected.objective.as_deref(), Some("binary:logistic"));

    for (i, row) in input.to_f32_rows().iter().enumerate() {
        let score = model.predict_row(row).unwrap();
        assert_approx_eq!(
            score as f64,
            expected.predictions_transformed[i],
            DEFAULT_TOLERANCE as f64,
            "row {i}"
        );
    }
}

#[test]
fn predict_booking_rows_from_binary_formats() {
    let (xgb, input, expected) = load_case("booking_status");
    let files = [
        (ModelFormat::Ubjson, to_ubjson(&booking_model_json())),
        (ModelFormat::LegacyBinary, to_legacy_binary(&xgb)),
    ];

    for (format, bytes) in files {
        let (parsed, detected) = XgbModel::from_bytes(&bytes).unwrap();
        assert_eq!(detected, format);
        let model = BoosterModel::from_xgboost(&parsed).unwrap();
        assert_eq!(model.objective(), Objective::BinaryLogistic);

        for (i, row) in input.to_f32_rows().iter().enumerate() {
            let score = model.predict_row(row).unwrap();
            assert_approx_eq!(
                score as f64,
                expected.predictions_transformed[i],
                DEFAULT_TOLERANCE as f64,
                "{format} row {i}"
            );
        }
    }
}

#[test]
fn logitraw_objective_returns_margins() {
    let (mut xgb, input, expected) = load_case("booking_status");
    xgb.learner.objective = hotel_inference::compat::xgboost::Objective::BinaryLogitRaw;
    // Base score is stored in margin space for logitraw.
    xgb.learner.learner_model_param.base_score = 0.0;
    let model = BoosterModel::from_xgboost(&xgb).unwrap();

    for (i, row) in input.to_f32_rows().iter().enumerate() {
        let margin = model.predict_row(row).unwrap();
        assert_approx_eq!(margin as f64, expected.predictions[i], DEFAULT_TOLERANCE as f64, "row {i}");
    }
}

#[test]
fn predictions_are_deterministic() {
    let (xgb, input, _) = load_case("booking_status");
    let model = BoosterModel::from_xgboost(&xgb).unwrap();
    let rows = input.to_f32_rows();

    let first: Vec<f32> = rows.iter().map(|r| model.predict_row(r).unwrap()).collect();
    for _ in 0..10 {
        let again: Vec<f32> = rows.iter().map(|r| model.predict_row(r).unwrap()).collect();
        assert_eq!(first, again);
    }
}
