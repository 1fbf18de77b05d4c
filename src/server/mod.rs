//! HTTP transport.
//!
//! | route                    | body            | response                 |
//! |--------------------------|-----------------|--------------------------|
//! | `POST /api/v1/inference` | booking JSON    | `{"result": <float>}`    |
//! | `GET /health`            |                 | status and model summary |
//!
//! Failed requests answer `{"detail": "<message>"}`.

mod api;
mod health;
mod state;

pub use api::ApiError;
pub use health::{HealthResponse, ModelSummary};
pub use state::AppState;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Route of the scoring endpoint.
pub const INFERENCE_ROUTE: &str = "/api/v1/inference";

/// Build the service router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(INFERENCE_ROUTE, post(api::inference))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "hotel inference server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for ctrl-c, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
