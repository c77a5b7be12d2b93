//! SWOT record CRUD. Every write appends to the change log.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{protected, Auth};
use crate::routes::change_log::{record_change, ChangeKind, EntityKind};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", protected(state, "getSwots", get(get_swots)))
        .route("/", protected(state, "createSwot", post(create_swot)))
        .route("/many", protected(state, "getSwotsByIds", put(get_swots_by_ids)))
        .route("/{swot_id}", protected(state, "getSwotById", get(get_swot_by_id)))
        .route("/{swot_id}", protected(state, "updateSwot", put(update_swot)))
        .route("/{swot_id}", protected(state, "deleteSwot", delete(delete_swot)))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Swot {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub kind: i16,
    pub classifications: Vec<String>,
    pub aspects: Vec<String>,
    pub factors: Vec<Uuid>,
    pub created_at: OffsetDateTime,
    pub created_by: Uuid,
    pub updated_at: OffsetDateTime,
    pub updated_by: Uuid,
}

const SWOT_PROJECTION: &str = "id, name, description, kind, classifications, \
     aspects, factors, created_at, created_by, updated_at, updated_by";

async fn get_swots(State(state): State<AppState>, Auth(_): Auth) -> ApiResult<Json<Vec<Swot>>> {
    let swots: Vec<Swot> =
        sqlx::query_as(&format!("SELECT {SWOT_PROJECTION} FROM swots ORDER BY created_at"))
            .fetch_all(&state.pool)
            .await?;
    Ok(Json(swots))
}

async fn get_swots_by_ids(
    State(state): State<AppState>,
    Auth(_): Auth,
    Json(ids): Json<Vec<Uuid>>,
) -> ApiResult<Json<Vec<Swot>>> {
    let swots: Vec<Swot> = sqlx::query_as(&format!(
        "SELECT {SWOT_PROJECTION} FROM swots WHERE id = ANY($1)"
    ))
    .bind(&ids)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(swots))
}

async fn get_swot_by_id(
    State(state): State<AppState>,
    Auth(_): Auth,
    Path(swot_id): Path<Uuid>,
) -> ApiResult<Json<Swot>> {
    let swot: Option<Swot> = sqlx::query_as(&format!(
        "SELECT {SWOT_PROJECTION} FROM swots WHERE id = $1"
    ))
    .bind(swot_id)
    .fetch_optional(&state.pool)
    .await?;

    swot.map(Json).ok_or(ApiError::NotFound("swotNotFound"))
}

#[derive(Debug, Deserialize)]
pub struct SwotInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: i16,
    #[serde(default)]
    pub classifications: Vec<String>,
    #[serde(default)]
    pub aspects: Vec<String>,
    #[serde(default)]
    pub factors: Vec<Uuid>,
}

async fn name_taken(state: &AppState, name: &str, exclude: Option<Uuid>) -> ApiResult<bool> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM swots WHERE name = $1 AND id IS DISTINCT FROM $2")
            .bind(name)
            .bind(exclude)
            .fetch_optional(&state.pool)
            .await?;
    Ok(row.is_some())
}

async fn create_swot(
    State(state): State<AppState>,
    Auth(context): Auth,
    Json(body): Json<SwotInput>,
) -> ApiResult<Json<Swot>> {
    if name_taken(&state, &body.name, None).await? {
        return Err(ApiError::Conflict("nameAlreadyExists"));
    }

    let swot: Swot = sqlx::query_as(&format!(
        "INSERT INTO swots \
         (name, description, kind, classifications, aspects, factors, created_by, updated_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
         RETURNING {SWOT_PROJECTION}"
    ))
    .bind(&body.name)
    .bind(&body.description)
    .bind(body.kind)
    .bind(&body.classifications)
    .bind(&body.aspects)
    .bind(&body.factors)
    .bind(context.account.id)
    .fetch_one(&state.pool)
    .await?;

    record_change(
        &state.pool,
        EntityKind::Swot,
        swot.id,
        ChangeKind::Insert,
        context.account.id,
    )
    .await;

    Ok(Json(swot))
}

async fn update_swot(
    State(state): State<AppState>,
    Auth(context): Auth,
    Path(swot_id): Path<Uuid>,
    Json(body): Json<SwotInput>,
) -> ApiResult<Json<Value>> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM swots WHERE id = $1")
        .bind(swot_id)
        .fetch_optional(&state.pool)
        .await?;
    if existing.is_none() {
        return Err(ApiError::NotFound("swotNotFound"));
    }

    if name_taken(&state, &body.name, Some(swot_id)).await? {
        return Err(ApiError::Conflict("nameAlreadyExists"));
    }

    let updated: (OffsetDateTime,) = sqlx::query_as(
        "UPDATE swots SET name = $1, description = $2, classifications = $3, \
         aspects = $4, factors = $5, updated_at = NOW(), updated_by = $6 \
         WHERE id = $7 RETURNING updated_at",
    )
    .bind(&body.name)
    .bind(&body.description)
    .bind(&body.classifications)
    .bind(&body.aspects)
    .bind(&body.factors)
    .bind(context.account.id)
    .bind(swot_id)
    .fetch_one(&state.pool)
    .await?;

    record_change(
        &state.pool,
        EntityKind::Swot,
        swot_id,
        ChangeKind::Update,
        context.account.id,
    )
    .await;

    Ok(Json(json!({
        "updated_at": updated.0,
        "updated_by": context.account.id,
    })))
}

/// Deleting an absent record succeeds; the delete is only logged when a row
/// actually went away. A record referenced as another record's factor cannot
/// be deleted.
async fn delete_swot(
    State(state): State<AppState>,
    Auth(context): Auth,
    Path(swot_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let referenced: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM swots WHERE $1 = ANY(factors) LIMIT 1")
            .bind(swot_id)
            .fetch_optional(&state.pool)
            .await?;
    if referenced.is_some() {
        return Err(ApiError::Forbidden("deletingReferencedSwotNotAllowed"));
    }

    let result = sqlx::query("DELETE FROM swots WHERE id = $1")
        .bind(swot_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() > 0 {
        record_change(
            &state.pool,
            EntityKind::Swot,
            swot_id,
            ChangeKind::Delete,
            context.account.id,
        )
        .await;
    }

    Ok(Json(json!(true)))
}
