//! The loaded, inference-ready model.
//!
//! [`BoosterModel`] wraps a tree ensemble together with the objective used to
//! turn margins into scores and the input width it was trained on. It is built
//! once at startup and never mutated; share it behind an `Arc`.
//!
//! # Example
//!
//! ```ignore
//! use hotel_inference::compat::XgbModel;
//! use hotel_inference::model::BoosterModel;
//!
//! let xgb = XgbModel::from_slice(&std::fs::read("xgboost-model")?)?;
//! let model = BoosterModel::from_xgboost(&xgb)?;
//! let score = model.predict_row(&features)?;
//! ```

use crate::compat::xgboost::{ConversionError, XgbModel};
use crate::features::FeatureSchema;
use crate::forest::{ForestError, SoAForest};
use crate::objective::{Objective, UnsupportedObjective};
use crate::trees::ScalarLeaf;

// =============================================================================
// Errors
// =============================================================================

/// The model file describes something that cannot be served.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Forest(#[from] ForestError),
    #[error(transparent)]
    Objective(#[from] UnsupportedObjective),
    #[error("objective `{objective}` expects {expected} output groups but the forest has {actual}")]
    GroupMismatch {
        objective: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("a split reads feature {index} but the model declares only {num_features} features")]
    FeatureIndexOutOfRange { index: u32, num_features: usize },
}

/// The model's input layout disagrees with the feature schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaMismatch {
    #[error("model expects {model} features, schema has {schema}")]
    FeatureCount { model: usize, schema: usize },
    #[error("feature {index} is named {model:?} in the model but {schema:?} in the schema")]
    FeatureName {
        index: usize,
        model: String,
        schema: &'static str,
    },
}

/// Scoring one feature vector failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictError {
    #[error("feature vector has {actual} values, model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("feature {index} is not a finite number ({value})")]
    NonFiniteFeature { index: usize, value: f32 },
    #[error("model produced a non-finite score ({0})")]
    NonFiniteScore(f32),
}

// =============================================================================
// Model
// =============================================================================

/// Where the model came from (for diagnostics).
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// Built in-process.
    Native,

    /// Loaded from an XGBoost model file.
    XGBoost { version: [u32; 3] },
}

/// A trained gradient boosting model (inference-ready).
#[derive(Debug, Clone)]
pub struct BoosterModel {
    forest: SoAForest<ScalarLeaf>,
    objective: Objective,
    num_features: usize,
    feature_names: Vec<String>,
    source: ModelSource,
}

impl BoosterModel {
    /// Assemble a model, checking that the pieces fit together.
    pub fn new(forest: SoAForest<ScalarLeaf>, objective: Objective, num_features: usize) -> Result<Self, ModelError> {
        forest.validate()?;

        let groups = forest.num_groups() as usize;
        if groups != objective.num_outputs() {
            return Err(ModelError::GroupMismatch {
                objective: objective.name(),
                expected: objective.num_outputs(),
                actual: groups,
            });
        }

        if let Some(index) = forest.max_feature_index() {
            if index as usize >= num_features {
                return Err(ModelError::FeatureIndexOutOfRange { index, num_features });
            }
        }

        Ok(Self {
            forest,
            objective,
            num_features,
            feature_names: Vec::new(),
            source: ModelSource::Native,
        })
    }

    /// Convert a parsed XGBoost model.
    pub fn from_xgboost(model: &XgbModel) -> Result<Self, ModelError> {
        let forest = model.to_forest()?;
        let objective = Objective::from_xgboost(&model.learner.objective)?;
        let num_features = model.learner.learner_model_param.num_feature.max(0) as usize;

        let mut booster = Self::new(forest, objective, num_features)?;
        booster.feature_names = model.learner.feature_names.clone();
        booster.source = ModelSource::XGBoost {
            version: model.version,
        };
        Ok(booster)
    }

    /// Attach feature names (as recorded at training time).
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = names;
        self
    }

    #[inline]
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    #[inline]
    pub fn num_trees(&self) -> usize {
        self.forest.num_trees()
    }

    #[inline]
    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Feature names stored in the model file; empty when training data had none.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    /// Check the model against the input layout requests will be built with.
    ///
    /// The feature count must match. Names are only compared when the model
    /// file recorded them.
    pub fn check_schema(&self, schema: &FeatureSchema) -> Result<(), SchemaMismatch> {
        if self.num_features != schema.len() {
            return Err(SchemaMismatch::FeatureCount {
                model: self.num_features,
                schema: schema.len(),
            });
        }

        if self.feature_names.is_empty() {
            return Ok(());
        }
        if self.feature_names.len() != schema.len() {
            return Err(SchemaMismatch::FeatureCount {
                model: self.feature_names.len(),
                schema: schema.len(),
            });
        }
        for (index, (model, &expected)) in self.feature_names.iter().zip(schema.names()).enumerate() {
            if model != expected {
                return Err(SchemaMismatch::FeatureName {
                    index,
                    model: model.clone(),
                    schema: expected,
                });
            }
        }
        Ok(())
    }

    /// Score one row.
    ///
    /// The row must have exactly [`num_features`](Self::num_features) finite
    /// values.
    pub fn predict_row(&self, features: &[f32]) -> Result<f32, PredictError> {
        if features.len() != self.num_features {
            return Err(PredictError::ShapeMismatch {
                expected: self.num_features,
                actual: features.len(),
            });
        }
        if let Some((index, &value)) = features.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(PredictError::NonFiniteFeature { index, value });
        }

        let margins = self.forest.predict_row(features);
        let score = self.objective.transform(&margins);
        if !score.is_finite() {
            return Err(PredictError::NonFiniteScore(score));
        }
        Ok(score)
    }
}
