//! Authorization registry introspection.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use stratboard_gateway::Policy;

use crate::error::{ApiError, ApiResult};
use crate::middleware::protected;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/{service}/{route}",
        protected(state, "getPolicy", get(get_policy)),
    )
}

/// Current policy for a (service, route) pair, without authenticating as
/// that pair. Admin-only by registry seed.
async fn get_policy(
    State(state): State<AppState>,
    Path((service, route)): Path<(String, String)>,
) -> ApiResult<Json<Policy>> {
    state
        .gateway
        .authorize_service_route(&service, &route)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("policyNotFound"))
}
