//! The prediction service: booking in, score out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::encoding::{EncodingError, EncodingPolicy};
use crate::features::{BookingRecord, FeatureVector, FeatureVectorBuilder};
use crate::model::{BoosterModel, PredictError};

/// Score for one booking, as returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub result: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Predict(#[from] PredictError),
}

/// Scores bookings against a loaded model.
///
/// Holds no mutable state; clone it or share it behind an `Arc` across
/// request handlers.
#[derive(Debug, Clone)]
pub struct PredictionService {
    model: Arc<BoosterModel>,
    builder: FeatureVectorBuilder,
}

impl PredictionService {
    pub fn new(model: Arc<BoosterModel>, policy: EncodingPolicy) -> Self {
        Self {
            model,
            builder: FeatureVectorBuilder::new(policy),
        }
    }

    pub fn model(&self) -> &BoosterModel {
        &self.model
    }

    pub fn policy(&self) -> EncodingPolicy {
        self.builder.policy()
    }

    /// Score a prepared feature vector.
    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult, PredictError> {
        let score = self.model.predict_row(features.as_slice())?;
        Ok(PredictionResult {
            result: f64::from(score),
        })
    }

    /// Encode `record` and score it.
    pub fn score(&self, record: &BookingRecord) -> Result<PredictionResult, ServiceError> {
        let features = self.builder.build(record)?;
        let prediction = self.predict(&features)?;
        tracing::debug!(score = prediction.result, "scored booking");
        Ok(prediction)
    }
}
