//! Authentication pipeline.
//!
//! One fixed-order pass over a single request, short-circuiting on the first
//! failure. Each evaluation is a pure, read-only computation over the
//! presented token, the process-wide signing secret, the policy set, and one
//! account record; nothing mutable is shared between concurrent evaluations,
//! so the pipeline needs no locking. The only output beyond the verdict is a
//! freshly signed token (sliding expiration); no writes occur here.

use std::sync::Arc;

use uuid::Uuid;

use crate::account::Account;
use crate::error::{AuthError, GatewayError};
use crate::policy::{authorize, Policy};
use crate::stores::{AccountStore, PolicyStore, StoreError};
use crate::token::{Claims, TokenCodec, TokenPayload};

/// The single route name exempt from the email-activation check. A token
/// that passes every other check may call this route even while the
/// account's email is still pending activation; no other route or pattern
/// is ever exempt.
pub const EMAIL_ACTIVATION_ROUTE: &str = "activateEmail";

/// Result of a successful pipeline run. Ephemeral: owned by the calling
/// request for its lifetime only, never persisted.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuthContext {
    /// Fresh token re-issued for the resolved account (sliding expiration).
    pub token: String,
    /// Decoded metadata of the token that was presented.
    pub claims: Claims,
    /// Resolved account projection, credential fields excluded.
    pub account: Account,
}

/// The gateway: token codec plus injected account/policy collaborators.
///
/// Collaborators are typed references supplied at construction; the pipeline
/// never resolves them from ambient global state.
#[derive(Clone)]
pub struct AuthGateway {
    codec: TokenCodec,
    accounts: Arc<dyn AccountStore>,
    policies: Arc<dyn PolicyStore>,
}

impl AuthGateway {
    pub fn new(
        codec: TokenCodec,
        accounts: Arc<dyn AccountStore>,
        policies: Arc<dyn PolicyStore>,
    ) -> Self {
        Self {
            codec,
            accounts,
            policies,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Answer "is this token, for this route, from this caller, currently
    /// valid?" and return the enriched context on success.
    ///
    /// Checks run in fixed order: token presence, signature/expiration,
    /// policy lookup, class match, account resolution, active state, email
    /// activation (with the single designated bypass route), role rule.
    pub async fn authenticate(
        &self,
        token: Option<&str>,
        service: &str,
        route: &str,
    ) -> Result<AuthContext, GatewayError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::TokenRequired)?;

        let claims = self.codec.verify(token)?;

        let policy = self
            .policies
            .find_policy(service, route)
            .await?
            .ok_or(AuthError::ServiceNotFound)?;

        if claims.class() != policy.required_class {
            return Err(AuthError::TokenTypeMismatch.into());
        }

        let account = self
            .accounts
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::OutdatedToken)?;

        if !account.active {
            return Err(AuthError::AccountInactive.into());
        }

        if !account.email_activated() && route != EMAIL_ACTIVATION_ROUTE {
            return Err(AuthError::EmailInactive.into());
        }

        if !authorize(&policy, account.role, claims.class()) {
            return Err(AuthError::Unauthorized.into());
        }

        let fresh = self.codec.issue(account.id, TokenPayload::Default)?;

        tracing::debug!(subject = %account.id, service, route, "authentication succeeded");

        Ok(AuthContext {
            token: fresh,
            claims,
            account,
        })
    }

    /// Introspection surface: current policy for a (service, route) pair,
    /// without performing a full authentication.
    pub async fn authorize_service_route(
        &self,
        service: &str,
        route: &str,
    ) -> Result<Option<Policy>, StoreError> {
        self.policies.find_policy(service, route).await
    }

    /// Convenience for collaborators that issue tokens outside the pipeline
    /// (login, password-reset mails).
    pub fn issue_token(
        &self,
        subject: Uuid,
        payload: TokenPayload,
    ) -> Result<String, GatewayError> {
        Ok(self.codec.issue(subject, payload)?)
    }
}
