//! Health check endpoint

use axum::extract::State;
use axum::Json;

use crate::server::listener::AppState;
use crate::stats::HubStatus;

/// `GET /health`: always 200, reports registry size
pub(crate) async fn health_handler(State(state): State<AppState>) -> Json<HubStatus> {
    Json(state.hub.status().await)
}
