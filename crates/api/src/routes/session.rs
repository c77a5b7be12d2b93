//! Session routes: login, auth verification, password lifecycle.

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use stratboard_gateway::{
    derive_credential, verify_credential, Account, AuthError, TokenPayload,
};

use crate::email::MailKind;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{protected, Auth};
use crate::state::AppState;
use crate::store::{AccountRow, ACCOUNT_PROJECTION};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route(
            "/verify-auth",
            protected(state, "verifyAuth", get(verify_auth)),
        )
        .route(
            "/reset-password",
            protected(state, "resetPassword", put(reset_password)),
        )
        .route(
            "/change-password",
            protected(state, "changePassword", post(change_password)),
        )
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: Account,
}

async fn find_by_either_email(
    state: &AppState,
    email: &str,
) -> ApiResult<Option<Account>> {
    let row: Option<AccountRow> = sqlx::query_as(&format!(
        "SELECT {ACCOUNT_PROJECTION} FROM accounts \
         WHERE email = $1 OR email_to_activate = $1"
    ))
    .bind(email)
    .fetch_optional(&state.pool)
    .await?;

    Ok(row.map(Account::from))
}

/// Credential login. The failure code never distinguishes an unknown email
/// from a wrong password.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let account = find_by_either_email(&state, &body.email)
        .await?
        .ok_or(ApiError::NotFound("wrongEmailorPassword"))?;

    if !account.active {
        return Err(ApiError::Denied("inActiveMember"));
    }

    // Logging in with the pending address is refused until it is verified.
    if account.email_to_activate.as_deref() == Some(body.email.as_str()) {
        return Err(ApiError::Forbidden("emailNotActivated"));
    }

    let credential = state
        .credentials
        .find_credential_by_id(account.id)
        .await?
        .ok_or(ApiError::Denied("wrongEmailorPassword"))?;

    if !verify_credential(&body.password, &credential.hash, &credential.salt) {
        return Err(ApiError::Denied("wrongEmailorPassword"));
    }

    let token = state
        .gateway
        .issue_token(account.id, TokenPayload::Default)?;

    tracing::info!(subject = %account.id, "login succeeded");

    Ok(Json(SessionResponse {
        token,
        user: account,
    }))
}

/// Echo the authenticated context. The interesting work already happened in
/// the middleware; the fresh token carries the slid expiration.
async fn verify_auth(Auth(context): Auth) -> Json<SessionResponse> {
    Json(SessionResponse {
        token: context.token,
        user: context.account,
    })
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<Value>> {
    let account = find_by_either_email(&state, &body.email)
        .await?
        .ok_or(ApiError::NotFound("userNotFound"))?;

    let token = state.gateway.issue_token(account.id, TokenPayload::Reset)?;

    // Prefer the activated address; fall back to the pending one for members
    // who never completed activation.
    let recipient = account
        .email
        .as_deref()
        .or(account.email_to_activate.as_deref())
        .ok_or(ApiError::NotFound("emailNotFound"))?;

    state
        .mailer
        .send(MailKind::ResetPassword, recipient, &token)
        .await;

    Ok(Json(json!(true)))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Requires a reset-class token; the route policy enforces that.
async fn reset_password(
    State(state): State<AppState>,
    Auth(context): Auth,
    Json(body): Json<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    let credential = derive_credential(&body.password);

    sqlx::query(
        "UPDATE accounts SET password_hash = $1, password_salt = $2, \
         updated_at = NOW(), updated_by = $3 WHERE id = $3",
    )
    .bind(&credential.hash)
    .bind(&credential.salt)
    .bind(context.account.id)
    .execute(&state.pool)
    .await?;

    tracing::info!(subject = %context.account.id, "password reset");

    Ok(Json(json!(true)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    Auth(context): Auth,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    let credential = state
        .credentials
        .find_credential_by_id(context.account.id)
        .await?
        .ok_or(ApiError::Auth(AuthError::CredentialMismatch))?;

    if !verify_credential(&body.old_password, &credential.hash, &credential.salt) {
        return Err(ApiError::BadRequest("incorrectPassword"));
    }

    let fresh = derive_credential(&body.new_password);

    sqlx::query(
        "UPDATE accounts SET password_hash = $1, password_salt = $2, \
         updated_at = NOW(), updated_by = $3 WHERE id = $3",
    )
    .bind(&fresh.hash)
    .bind(&fresh.salt)
    .bind(context.account.id)
    .execute(&state.pool)
    .await?;

    tracing::info!(subject = %context.account.id, "password changed");

    Ok(Json(json!(true)))
}
