//! Scoring endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::state::AppState;
use crate::features::BookingRecord;
use crate::service::{PredictionResult, ServiceError};

/// A request that could not be scored.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match err {
            ServiceError::Encoding(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Predict(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

pub async fn inference(
    State(state): State<AppState>,
    Json(record): Json<BookingRecord>,
) -> Result<Json<PredictionResult>, ApiError> {
    match state.service.score(&record) {
        Ok(prediction) => Ok(Json(prediction)),
        Err(e) => {
            tracing::warn!(error = %e, "inference request rejected");
            Err(e.into())
        }
    }
}
