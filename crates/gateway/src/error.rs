//! Gateway error taxonomy.

use crate::stores::StoreError;
use crate::token::TokenError;

/// Authentication/authorization failure kinds. Every kind is surfaced to the
/// calling layer verbatim with a stable machine-readable code; none are
/// retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no token supplied")]
    TokenRequired,
    #[error("token signature invalid or payload malformed")]
    InvalidToken,
    #[error("token expiration has passed")]
    ExpiredToken,
    #[error("no authorization policy registered for service/route")]
    ServiceNotFound,
    #[error("token class does not match the route policy")]
    TokenTypeMismatch,
    /// The token's subject no longer resolves: a structurally valid token
    /// whose account was deleted after issue.
    #[error("token subject no longer resolves to an account")]
    OutdatedToken,
    #[error("account is deactivated")]
    AccountInactive,
    #[error("account email is not activated")]
    EmailInactive,
    #[error("role not permitted for this route")]
    Unauthorized,
    /// Presented secret does not match the stored credential. Raised by
    /// credential-verification flows only, never by token flows.
    #[error("secret does not match stored credential")]
    CredentialMismatch,
}

impl AuthError {
    /// Stable wire code, part of the client protocol. Do not rename.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::TokenRequired => "tokenRequired",
            AuthError::InvalidToken => "invalidToken",
            AuthError::ExpiredToken => "expiredToken",
            AuthError::ServiceNotFound => "serviceNotFound",
            AuthError::TokenTypeMismatch => "tokenTypeMismatch",
            AuthError::OutdatedToken => "outdatedToken",
            AuthError::AccountInactive => "userInactive",
            AuthError::EmailInactive => "emailInactive",
            AuthError::Unauthorized => "unauthorized",
            AuthError::CredentialMismatch => "credentialMismatch",
        }
    }
}

/// Top-level pipeline result error: either an authentication failure, a
/// transient store failure, or an internal fault (claims failed to sign).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TokenError> for GatewayError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => GatewayError::Auth(AuthError::ExpiredToken),
            TokenError::Invalid => GatewayError::Auth(AuthError::InvalidToken),
            TokenError::Signing(msg) => GatewayError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(AuthError::TokenRequired.code(), "tokenRequired");
        assert_eq!(AuthError::ServiceNotFound.code(), "serviceNotFound");
        assert_eq!(AuthError::OutdatedToken.code(), "outdatedToken");
        assert_eq!(AuthError::AccountInactive.code(), "userInactive");
        assert_eq!(AuthError::EmailInactive.code(), "emailInactive");
        assert_eq!(AuthError::CredentialMismatch.code(), "credentialMismatch");
    }

    #[test]
    fn token_errors_map_into_auth_kinds() {
        assert!(matches!(
            GatewayError::from(TokenError::Expired),
            GatewayError::Auth(AuthError::ExpiredToken)
        ));
        assert!(matches!(
            GatewayError::from(TokenError::Invalid),
            GatewayError::Auth(AuthError::InvalidToken)
        ));
        assert!(matches!(
            GatewayError::from(TokenError::Signing("boom".into())),
            GatewayError::Internal(_)
        ));
    }
}
