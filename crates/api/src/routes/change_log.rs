//! Append-only change log.
//!
//! Appends are best-effort: a failed append is logged and never fails the
//! write that produced it.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use sqlx::PgPool;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{protected, Auth};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/{kind}/{since}",
        protected(state, "getLogs", get(get_logs)),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Swot = 0,
    Member = 1,
}

impl EntityKind {
    fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(EntityKind::Swot),
            1 => Some(EntityKind::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert = 0,
    Update = 1,
    Delete = 2,
}

/// Append one entry. Errors are swallowed after logging; losing a log line
/// must not roll back the change it records.
pub async fn record_change(
    pool: &PgPool,
    entity: EntityKind,
    entity_id: Uuid,
    change: ChangeKind,
    changed_by: Uuid,
) {
    let result = sqlx::query(
        "INSERT INTO change_log (entity_kind, entity_id, change_kind, changed_by) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(entity as i16)
    .bind(entity_id)
    .bind(change as i16)
    .bind(changed_by)
    .execute(pool)
    .await;

    if let Err(err) = result {
        tracing::error!(%entity_id, error = %err, "change log append failed");
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LogEntry {
    pub id: Uuid,
    pub entity_kind: i16,
    pub entity_id: Uuid,
    pub change_kind: i16,
    pub changed_by: Uuid,
    pub changed_at: OffsetDateTime,
}

/// Entries for one entity kind changed after `since` (RFC 3339).
async fn get_logs(
    State(state): State<AppState>,
    Auth(_): Auth,
    Path((kind, since)): Path<(i16, String)>,
) -> ApiResult<Json<Vec<LogEntry>>> {
    let kind = EntityKind::from_code(kind).ok_or(ApiError::BadRequest("invalidDataType"))?;

    let since = OffsetDateTime::parse(&since, &Rfc3339)
        .map_err(|_| ApiError::BadRequest("invalidDate"))?;

    let entries: Vec<LogEntry> = sqlx::query_as(
        "SELECT id, entity_kind, entity_id, change_kind, changed_by, changed_at \
         FROM change_log WHERE entity_kind = $1 AND changed_at > $2 \
         ORDER BY changed_at",
    )
    .bind(kind as i16)
    .bind(since)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(entries))
}
