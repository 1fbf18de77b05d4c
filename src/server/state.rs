//! Shared application state.

use std::sync::Arc;

use crate::service::PredictionService;

/// State handed to every request. Cloning only bumps a reference count.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
