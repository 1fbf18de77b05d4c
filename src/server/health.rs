//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelSummary {
    pub trees: usize,
    pub features: usize,
    pub objective: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: ModelSummary,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = state.service.model();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: ModelSummary {
            trees: model.num_trees(),
            features: model.num_features(),
            objective: model.objective().name().to_string(),
        },
    })
}
