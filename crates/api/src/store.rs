//! Postgres implementations of the gateway's collaborator traits.
//!
//! Lookups always hit the database fresh; role and active-state can change
//! between requests, so nothing here caches.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use stratboard_gateway::{
    Account, AccountStore, Credential, CredentialStore, Policy, PolicyStore, Profile, Role,
    RoleRule, StoreError, TokenClass,
};

/// Column list for the credential-free account projection. Credential columns
/// are deliberately absent; only [`PgCredentialStore`] reads those.
pub const ACCOUNT_PROJECTION: &str = "id, role, active, email, email_to_activate, \
     first_name, middle_name, last_name, title, mobile, birth_date, created_at, updated_at";

#[derive(Debug, FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub role: i16,
    pub active: bool,
    pub email: Option<String>,
    pub email_to_activate: Option<String>,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub title: i16,
    pub mobile: String,
    pub birth_date: Option<Date>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            role: Role(row.role.clamp(0, u8::MAX as i16) as u8),
            active: row.active,
            email: row.email,
            email_to_activate: row.email_to_activate,
            profile: Profile {
                first_name: row.first_name,
                middle_name: row.middle_name,
                last_name: row.last_name,
                title: row.title.clamp(0, u8::MAX as i16) as u8,
                mobile: row.mobile,
                birth_date: row.birth_date,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn store_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_PROJECTION} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(Account::from))
    }
}

#[derive(Debug, FromRow)]
struct CredentialRow {
    password_hash: Option<String>,
    password_salt: Option<String>,
}

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_credential_by_id(&self, id: Uuid) -> Result<Option<Credential>, StoreError> {
        let row: Option<CredentialRow> =
            sqlx::query_as("SELECT password_hash, password_salt FROM accounts WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;

        // An account without a set password has no credential yet.
        Ok(row.and_then(|r| match (r.password_hash, r.password_salt) {
            (Some(hash), Some(salt)) => Some(Credential { hash, salt }),
            _ => None,
        }))
    }
}

#[derive(Debug, FromRow)]
struct PolicyRow {
    service: String,
    route: String,
    required_class: String,
    rule: serde_json::Value,
}

fn parse_class(raw: &str) -> Result<TokenClass, StoreError> {
    match raw {
        "default" => Ok(TokenClass::Default),
        "activation" => Ok(TokenClass::Activation),
        "reset" => Ok(TokenClass::Reset),
        other => Err(StoreError::Query(format!("unknown token class '{other}'"))),
    }
}

impl PolicyRow {
    fn into_policy(self) -> Result<Policy, StoreError> {
        let required_class = parse_class(&self.required_class)?;
        let rule: RoleRule = serde_json::from_value(self.rule)
            .map_err(|e| StoreError::Query(format!("malformed role rule: {e}")))?;
        Ok(Policy {
            service: self.service,
            route: self.route,
            required_class,
            rule,
        })
    }
}

#[derive(Clone)]
pub struct PgPolicyStore {
    pool: PgPool,
}

impl PgPolicyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyStore for PgPolicyStore {
    async fn find_policy(
        &self,
        service: &str,
        route: &str,
    ) -> Result<Option<Policy>, StoreError> {
        let row: Option<PolicyRow> = sqlx::query_as(
            "SELECT service, route, required_class, rule \
             FROM service_authorizations WHERE service = $1 AND route = $2",
        )
        .bind(service)
        .bind(route)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(PolicyRow::into_policy).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_row_decodes_tagged_rule() {
        let row = PolicyRow {
            service: "api.auth".into(),
            route: "getAllUsers".into(),
            required_class: "default".into(),
            rule: serde_json::json!({"kind": "one_of", "roles": [0, 1]}),
        };
        let policy = row.into_policy().unwrap();
        assert_eq!(policy.required_class, TokenClass::Default);
        assert!(policy.rule.permits(Role(1)));
        assert!(!policy.rule.permits(Role(2)));
    }

    #[test]
    fn unknown_class_is_a_query_error() {
        let row = PolicyRow {
            service: "api.auth".into(),
            route: "x".into(),
            required_class: "session".into(),
            rule: serde_json::json!({"kind": "any"}),
        };
        assert!(matches!(row.into_policy(), Err(StoreError::Query(_))));
    }

    #[test]
    fn account_row_projection_maps_role_and_profile() {
        let row = AccountRow {
            id: Uuid::new_v4(),
            role: 2,
            active: true,
            email: Some("a@example.com".into()),
            email_to_activate: None,
            first_name: "Ada".into(),
            middle_name: String::new(),
            last_name: "Lovelace".into(),
            title: 1,
            mobile: String::new(),
            birth_date: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let account = Account::from(row);
        assert_eq!(account.role, Role::SUPERVIEWER);
        assert!(account.email_activated());
        assert_eq!(account.profile.display_name(), "Ada Lovelace");
    }
}
