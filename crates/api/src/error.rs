//! API error type and HTTP mapping.
//!
//! Every gateway failure kind maps to a stable machine-readable code in the
//! response body: `{ "error": <code>, "code": <status> }`. Transient store
//! failures map to 503 so clients can retry; they never surface as
//! authentication failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use stratboard_gateway::{AuthError, GatewayError, StoreError, TokenError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Route-level denial with its own wire code (e.g. "unauthorizedRole").
    #[error("unauthorized: {0}")]
    Denied(&'static str),
    #[error("bad request: {0}")]
    BadRequest(&'static str),
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("service temporarily unavailable")]
    Unavailable,
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            // serviceNotFound is a policy gap, not a credential problem.
            ApiError::Auth(AuthError::ServiceNotFound) => StatusCode::FORBIDDEN,
            ApiError::Auth(_) | ApiError::Denied(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Auth(kind) => kind.code(),
            ApiError::Denied(code)
            | ApiError::BadRequest(code)
            | ApiError::NotFound(code)
            | ApiError::Conflict(code)
            | ApiError::Forbidden(code) => code,
            ApiError::Unavailable => "serviceUnavailable",
            ApiError::Internal => "unknownError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.code(),
            "code": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Auth(kind) => ApiError::Auth(kind),
            GatewayError::Store(store) => store.into(),
            GatewayError::Internal(msg) => {
                tracing::error!(error = %msg, "gateway internal error");
                ApiError::Internal
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::warn!(error = %err, "store failure");
        ApiError::Unavailable
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::Auth(AuthError::ExpiredToken),
            TokenError::Invalid => ApiError::Auth(AuthError::InvalidToken),
            TokenError::Signing(msg) => {
                tracing::error!(error = %msg, "token signing failed");
                ApiError::Internal
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                tracing::warn!(error = %err, "database unreachable");
                ApiError::Unavailable
            }
            other => {
                tracing::error!(error = %other, "database query failed");
                ApiError::Internal
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_keep_their_wire_codes() {
        assert_eq!(ApiError::Auth(AuthError::TokenRequired).code(), "tokenRequired");
        assert_eq!(
            ApiError::Auth(AuthError::ServiceNotFound).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Auth(AuthError::ExpiredToken).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn store_failures_are_retryable() {
        let err: ApiError = StoreError::Unavailable("down".into()).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "serviceUnavailable");
    }

    #[test]
    fn route_level_denials_carry_custom_codes() {
        let err = ApiError::Denied("unauthorizedRole");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "unauthorizedRole");
    }
}
