//! Email lifecycle routes: address changes and activation.
//!
//! Verification is the only route registered with an activation-class
//! policy, and the only route the pipeline lets a pending-email account
//! reach.

use axum::extract::{Path, State};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use stratboard_gateway::{
    verify_credential, Account, AuthError, TokenPayload, EMAIL_ACTIVATION_ROUTE,
};

use crate::email::MailKind;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{protected, Auth};
use crate::state::AppState;
use crate::store::{AccountRow, ACCOUNT_PROJECTION};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", protected(state, "changeEmail", put(change_email)))
        .route(
            "/{user_id}",
            protected(state, "changeMemberEmail", put(change_member_email)),
        )
        .route("/resend-verification-email", post(resend_verification_email))
        .route(
            "/verify-email",
            protected(state, EMAIL_ACTIVATION_ROUTE, put(verify_email)),
        )
}

#[derive(Debug, Deserialize)]
pub struct ChangeEmailRequest {
    pub email: String,
}

async fn email_taken(state: &AppState, email: &str) -> ApiResult<bool> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM accounts WHERE email = $1 OR email_to_activate = $1",
    )
    .bind(email)
    .fetch_optional(&state.pool)
    .await?;
    Ok(row.is_some())
}

async fn set_pending_email(
    state: &AppState,
    target: Uuid,
    email: &str,
    updated_by: Uuid,
) -> ApiResult<()> {
    sqlx::query(
        "UPDATE accounts SET email_to_activate = $1, updated_at = NOW(), \
         updated_by = $2 WHERE id = $3",
    )
    .bind(email)
    .bind(updated_by)
    .bind(target)
    .execute(&state.pool)
    .await?;
    Ok(())
}

async fn send_verification(state: &AppState, target: Uuid, email: &str) -> ApiResult<()> {
    let token = state.gateway.issue_token(
        target,
        TokenPayload::Activation {
            email: email.to_string(),
        },
    )?;
    state.mailer.send(MailKind::VerifyEmail, email, &token).await;
    Ok(())
}

/// A member asks to change their own address. The new address stays pending
/// until verified; the current activated address keeps working meanwhile.
async fn change_email(
    State(state): State<AppState>,
    Auth(context): Auth,
    Json(body): Json<ChangeEmailRequest>,
) -> ApiResult<Json<Value>> {
    if email_taken(&state, &body.email).await? {
        return Err(ApiError::Conflict("emailAlreadyExists"));
    }

    set_pending_email(&state, context.account.id, &body.email, context.account.id).await?;
    send_verification(&state, context.account.id, &body.email).await?;

    Ok(Json(json!(true)))
}

/// A privileged member corrects another member's pending address. Only
/// allowed while the target has never activated an address.
async fn change_member_email(
    State(state): State<AppState>,
    Auth(context): Auth,
    Path(user_id): Path<Uuid>,
    Json(body): Json<ChangeEmailRequest>,
) -> ApiResult<Json<Value>> {
    let row: Option<AccountRow> = sqlx::query_as(&format!(
        "SELECT {ACCOUNT_PROJECTION} FROM accounts WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?;
    let target = Account::from(row.ok_or(ApiError::NotFound("userNotFound"))?);

    if !context.account.role.outranks(target.role) {
        return Err(ApiError::Auth(AuthError::Unauthorized));
    }

    if target.email_activated() {
        return Err(ApiError::Forbidden("changeEmailNotAllowed"));
    }

    if target.email_to_activate.as_deref() == Some(body.email.as_str()) {
        return Ok(Json(json!(true)));
    }

    if email_taken(&state, &body.email).await? {
        return Err(ApiError::Conflict("emailAlreadyExists"));
    }

    set_pending_email(&state, target.id, &body.email, context.account.id).await?;
    send_verification(&state, target.id, &body.email).await?;

    Ok(Json(json!(true)))
}

#[derive(Debug, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
    pub password: String,
}

/// Unauthenticated by necessity: the caller cannot log in yet. The stored
/// credential stands in for a session.
async fn resend_verification_email(
    State(state): State<AppState>,
    Json(body): Json<ResendVerificationRequest>,
) -> ApiResult<Json<Value>> {
    let row: Option<AccountRow> = sqlx::query_as(&format!(
        "SELECT {ACCOUNT_PROJECTION} FROM accounts WHERE email_to_activate = $1"
    ))
    .bind(&body.email)
    .fetch_optional(&state.pool)
    .await?;
    let account = Account::from(row.ok_or(ApiError::NotFound("userNotFound"))?);

    let pending = account
        .email_to_activate
        .as_deref()
        .ok_or(ApiError::NotFound("emailNotFound"))?;

    let credential = state
        .credentials
        .find_credential_by_id(account.id)
        .await?
        .ok_or(ApiError::Denied("wrongPassword"))?;
    if !verify_credential(&body.password, &credential.hash, &credential.salt) {
        return Err(ApiError::Denied("wrongPassword"));
    }

    send_verification(&state, account.id, pending).await?;

    Ok(Json(json!(true)))
}

/// Complete activation. The activation token must carry the exact address
/// that is currently pending on the account.
async fn verify_email(
    State(state): State<AppState>,
    Auth(context): Auth,
) -> ApiResult<Json<Value>> {
    let TokenPayload::Activation { email } = &context.claims.payload else {
        return Err(ApiError::Auth(AuthError::InvalidToken));
    };

    if context.account.email_to_activate.as_deref() != Some(email.as_str()) {
        return Err(ApiError::Auth(AuthError::InvalidToken));
    }

    sqlx::query(
        "UPDATE accounts SET email = $1, email_to_activate = NULL, \
         updated_at = NOW(), updated_by = $2 WHERE id = $2",
    )
    .bind(email)
    .bind(context.account.id)
    .execute(&state.pool)
    .await?;

    tracing::info!(subject = %context.account.id, "email activated");

    Ok(Json(json!(true)))
}
