//! Collaborator store traits.
//!
//! The pipeline resolves accounts and policies fresh on every call (role and
//! active-state can change between requests), so implementations must not
//! cache. Store failures are transient and retryable; they are kept strictly
//! apart from the authentication failure taxonomy.

use async_trait::async_trait;
use uuid::Uuid;

use crate::account::Account;
use crate::password::Credential;
use crate::policy::Policy;

/// Transient collaborator failure (storage unreachable, query failed).
/// Callers may retry or degrade; never conflated with [`crate::AuthError`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store query failed: {0}")]
    Query(String),
}

/// Read access to account projections (credential fields excluded).
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;
}

/// Read access to stored credentials. Used only by credential-change flows,
/// never by `authenticate`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_credential_by_id(&self, id: Uuid) -> Result<Option<Credential>, StoreError>;
}

/// Read access to the authorization registry.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn find_policy(&self, service: &str, route: &str)
        -> Result<Option<Policy>, StoreError>;
}
