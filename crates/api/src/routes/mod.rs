//! HTTP surface. Each module owns one `/api/v1/*` router; protected routes
//! are wrapped with the gateway pipeline under their registered route names.

pub mod change_log;
pub mod emails;
pub mod members;
pub mod policies;
pub mod session;
pub mod swots;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/session", session::router(&state))
        .nest("/api/v1/members", members::router(&state))
        .nest("/api/v1/emails", emails::router(&state))
        .nest("/api/v1/swots", swots::router(&state))
        .nest("/api/v1/policies", policies::router(&state))
        .nest("/api/v1/change-log", change_log::router(&state))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
