//! Member management routes.
//!
//! Visibility follows role rank: listings only ever return members strictly
//! less privileged than the caller.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use stratboard_gateway::{Account, AuthError, Profile, Role, TokenPayload};

use crate::email::MailKind;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{protected, Auth};
use crate::routes::change_log::{record_change, ChangeKind, EntityKind};
use crate::state::AppState;
use crate::store::{AccountRow, ACCOUNT_PROJECTION};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", protected(state, "getAllUsers", get(get_all_users)))
        .route("/", protected(state, "createMember", post(create_member)))
        .route("/", protected(state, "updateProfile", put(update_profile)))
        .route(
            "/many",
            protected(state, "getUsersByIds", put(get_users_by_ids)),
        )
        .route(
            "/{user_id}",
            protected(state, "getUserById", get(get_user_by_id)),
        )
        .route(
            "/{user_id}",
            protected(state, "deleteMember", delete(delete_member)),
        )
}

async fn get_all_users(
    State(state): State<AppState>,
    Auth(context): Auth,
) -> ApiResult<Json<Vec<Account>>> {
    let rows: Vec<AccountRow> = sqlx::query_as(&format!(
        "SELECT {ACCOUNT_PROJECTION} FROM accounts WHERE role > $1 ORDER BY created_at"
    ))
    .bind(i16::from(context.account.role.0))
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(rows.into_iter().map(Account::from).collect()))
}

async fn get_users_by_ids(
    State(state): State<AppState>,
    Auth(context): Auth,
    Json(ids): Json<Vec<Uuid>>,
) -> ApiResult<Json<Vec<Account>>> {
    let rows: Vec<AccountRow> = sqlx::query_as(&format!(
        "SELECT {ACCOUNT_PROJECTION} FROM accounts WHERE id = ANY($1) AND role > $2"
    ))
    .bind(&ids)
    .bind(i16::from(context.account.role.0))
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(rows.into_iter().map(Account::from).collect()))
}

/// Members can always fetch themselves. Fetching someone else requires a
/// manager rank or better, and only reaches less privileged members.
async fn get_user_by_id(
    State(state): State<AppState>,
    Auth(context): Auth,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Account>> {
    let caller = &context.account;

    let row: Option<AccountRow> = if user_id == caller.id {
        sqlx::query_as(&format!(
            "SELECT {ACCOUNT_PROJECTION} FROM accounts WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?
    } else if caller.role <= Role::MANAGER {
        sqlx::query_as(&format!(
            "SELECT {ACCOUNT_PROJECTION} FROM accounts WHERE id = $1 AND role > $2"
        ))
        .bind(user_id)
        .bind(i16::from(caller.role.0))
        .fetch_optional(&state.pool)
        .await?
    } else {
        return Err(ApiError::Auth(AuthError::Unauthorized));
    };

    let row = row.ok_or(ApiError::NotFound("userNotFound"))?;
    Ok(Json(Account::from(row)))
}

#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    pub email: String,
    pub role: u8,
    pub profile: Profile,
}

/// Create a member with a pending email and no credential, then mail a
/// reset-class token so the new member can set a first password.
async fn create_member(
    State(state): State<AppState>,
    Auth(context): Auth,
    Json(body): Json<CreateMemberRequest>,
) -> ApiResult<Json<Account>> {
    if body.role > Role::VIEWER.0 {
        return Err(ApiError::BadRequest("invalidRole"));
    }

    let taken: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM accounts WHERE email = $1 OR email_to_activate = $1",
    )
    .bind(&body.email)
    .fetch_optional(&state.pool)
    .await?;
    if taken.is_some() {
        return Err(ApiError::Conflict("emailAlreadyExists"));
    }

    if !context.account.role.outranks(Role(body.role)) {
        return Err(ApiError::Denied("unauthorizedRole"));
    }

    let row: AccountRow = sqlx::query_as(&format!(
        "INSERT INTO accounts \
         (role, active, email, email_to_activate, first_name, middle_name, \
          last_name, title, mobile, birth_date, created_by, updated_by) \
         VALUES ($1, TRUE, NULL, $2, $3, $4, $5, $6, $7, $8, $9, $9) \
         RETURNING {ACCOUNT_PROJECTION}"
    ))
    .bind(i16::from(body.role))
    .bind(&body.email)
    .bind(&body.profile.first_name)
    .bind(&body.profile.middle_name)
    .bind(&body.profile.last_name)
    .bind(i16::from(body.profile.title))
    .bind(&body.profile.mobile)
    .bind(body.profile.birth_date)
    .bind(context.account.id)
    .fetch_one(&state.pool)
    .await?;

    let member = Account::from(row);

    let token = state.gateway.issue_token(member.id, TokenPayload::Reset)?;
    state
        .mailer
        .send(MailKind::NewMember, &body.email, &token)
        .await;

    record_change(
        &state.pool,
        EntityKind::Member,
        member.id,
        ChangeKind::Insert,
        context.account.id,
    )
    .await;

    tracing::info!(member = %member.id, created_by = %context.account.id, "member created");

    Ok(Json(member))
}

async fn update_profile(
    State(state): State<AppState>,
    Auth(context): Auth,
    Json(profile): Json<Profile>,
) -> ApiResult<Json<Value>> {
    sqlx::query(
        "UPDATE accounts SET first_name = $1, middle_name = $2, last_name = $3, \
         title = $4, mobile = $5, birth_date = $6, updated_at = NOW(), \
         updated_by = $7 WHERE id = $7",
    )
    .bind(&profile.first_name)
    .bind(&profile.middle_name)
    .bind(&profile.last_name)
    .bind(i16::from(profile.title))
    .bind(&profile.mobile)
    .bind(profile.birth_date)
    .bind(context.account.id)
    .execute(&state.pool)
    .await?;

    record_change(
        &state.pool,
        EntityKind::Member,
        context.account.id,
        ChangeKind::Update,
        context.account.id,
    )
    .await;

    Ok(Json(json!(true)))
}

/// Soft delete: the account row stays, the member just can't authenticate.
async fn delete_member(
    State(state): State<AppState>,
    Auth(context): Auth,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    sqlx::query(
        "UPDATE accounts SET active = FALSE, updated_at = NOW(), updated_by = $2 \
         WHERE id = $1",
    )
    .bind(user_id)
    .bind(context.account.id)
    .execute(&state.pool)
    .await?;

    record_change(
        &state.pool,
        EntityKind::Member,
        user_id,
        ChangeKind::Delete,
        context.account.id,
    )
    .await;

    tracing::info!(member = %user_id, deleted_by = %context.account.id, "member deactivated");

    Ok(Json(json!(true)))
}
