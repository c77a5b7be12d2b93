//! Edge case tests for the authentication pipeline
//!
//! Covers the fixed check order and every terminal failure kind:
//! - Token presence and verification (PIPE-01 to PIPE-03)
//! - Policy lookup and class matching (PIPE-04 to PIPE-05)
//! - Account state checks and the activation bypass (PIPE-06 to PIPE-09)
//! - Role rules and sliding re-issue (PIPE-10 to PIPE-12)
//! - Transient store failures stay distinct from auth failures (PIPE-13)

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::account::{Account, Profile, Role};
use crate::error::{AuthError, GatewayError};
use crate::pipeline::{AuthGateway, EMAIL_ACTIVATION_ROUTE};
use crate::policy::{Policy, RoleRule};
use crate::stores::{AccountStore, PolicyStore, StoreError};
use crate::token::{DurationTable, TokenClass, TokenCodec, TokenPayload};

const SECRET: &[u8] = b"edge-case-secret-at-least-32-chars!!";
const SERVICE: &str = "api.auth";

struct MemoryAccounts(HashMap<Uuid, Account>);

#[async_trait]
impl AccountStore for MemoryAccounts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.0.get(&id).cloned())
    }
}

struct MemoryPolicies(Vec<Policy>);

#[async_trait]
impl PolicyStore for MemoryPolicies {
    async fn find_policy(
        &self,
        service: &str,
        route: &str,
    ) -> Result<Option<Policy>, StoreError> {
        Ok(self
            .0
            .iter()
            .find(|p| p.service == service && p.route == route)
            .cloned())
    }
}

struct UnreachableAccounts;

#[async_trait]
impl AccountStore for UnreachableAccounts {
    async fn find_by_id(&self, _id: Uuid) -> Result<Option<Account>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

fn account(role: Role, active: bool, email_activated: bool) -> Account {
    Account {
        id: Uuid::new_v4(),
        role,
        active,
        email: email_activated.then(|| "member@example.com".to_string()),
        email_to_activate: (!email_activated).then(|| "member@example.com".to_string()),
        profile: Profile {
            first_name: "Test".into(),
            last_name: "Member".into(),
            ..Profile::default()
        },
        created_at: OffsetDateTime::now_utc(),
        updated_at: OffsetDateTime::now_utc(),
    }
}

fn policy(route: &str, required_class: TokenClass, rule: RoleRule) -> Policy {
    Policy {
        service: SERVICE.into(),
        route: route.into(),
        required_class,
        rule,
    }
}

fn gateway(accounts: Vec<Account>, policies: Vec<Policy>) -> AuthGateway {
    gateway_with_durations(accounts, policies, DurationTable::default())
}

fn gateway_with_durations(
    accounts: Vec<Account>,
    policies: Vec<Policy>,
    durations: DurationTable,
) -> AuthGateway {
    let accounts = MemoryAccounts(accounts.into_iter().map(|a| (a.id, a)).collect());
    AuthGateway::new(
        TokenCodec::new(SECRET, durations),
        Arc::new(accounts),
        Arc::new(MemoryPolicies(policies)),
    )
}

fn assert_auth_err(result: Result<crate::AuthContext, GatewayError>, expected: AuthError) {
    match result {
        Err(GatewayError::Auth(kind)) => assert_eq!(kind, expected),
        other => panic!("expected {expected:?}, got {other:?}"),
    }
}

// =========================================================================
// PIPE-01: No token supplied - TokenRequired
// =========================================================================
#[tokio::test]
async fn missing_token_fails_token_required() {
    let gw = gateway(vec![], vec![]);
    assert_auth_err(
        gw.authenticate(None, SERVICE, "getAllUsers").await,
        AuthError::TokenRequired,
    );
    // An empty string is the same as no token at all.
    assert_auth_err(
        gw.authenticate(Some(""), SERVICE, "getAllUsers").await,
        AuthError::TokenRequired,
    );
}

// =========================================================================
// PIPE-02: Token signed with a different secret - InvalidToken
// =========================================================================
#[tokio::test]
async fn foreign_signature_fails_invalid_token() {
    let gw = gateway(vec![], vec![]);
    let foreign = TokenCodec::new(b"some-other-secret-32-chars-long!", DurationTable::default());
    let token = foreign
        .issue(Uuid::new_v4(), TokenPayload::Default)
        .unwrap();

    assert_auth_err(
        gw.authenticate(Some(&token), SERVICE, "getAllUsers").await,
        AuthError::InvalidToken,
    );
}

// =========================================================================
// PIPE-03: RESET token presented after its duration elapsed - ExpiredToken
// =========================================================================
#[tokio::test]
async fn expired_reset_token_fails_expired() {
    let member = account(Role::MANAGER, true, true);
    let durations = DurationTable {
        reset: Duration::seconds(-1),
        ..DurationTable::default()
    };
    let gw = gateway_with_durations(
        vec![member.clone()],
        vec![policy("resetPassword", TokenClass::Reset, RoleRule::Any)],
        durations,
    );

    let token = gw.issue_token(member.id, TokenPayload::Reset).unwrap();
    assert_auth_err(
        gw.authenticate(Some(&token), SERVICE, "resetPassword").await,
        AuthError::ExpiredToken,
    );
}

// =========================================================================
// PIPE-04: No policy registered for the route - ServiceNotFound
// =========================================================================
#[tokio::test]
async fn unregistered_route_fails_service_not_found() {
    let member = account(Role::ADMIN, true, true);
    let gw = gateway(vec![member.clone()], vec![]);
    let token = gw.issue_token(member.id, TokenPayload::Default).unwrap();

    assert_auth_err(
        gw.authenticate(Some(&token), SERVICE, "noSuchRoute").await,
        AuthError::ServiceNotFound,
    );
}

// =========================================================================
// PIPE-05: Token class differs from the policy's - TokenTypeMismatch
// =========================================================================
#[tokio::test]
async fn class_mismatch_fails_before_account_lookup() {
    let member = account(Role::ADMIN, true, true);
    let gw = gateway(
        vec![member.clone()],
        vec![policy("resetPassword", TokenClass::Reset, RoleRule::Any)],
    );
    let token = gw.issue_token(member.id, TokenPayload::Default).unwrap();

    assert_auth_err(
        gw.authenticate(Some(&token), SERVICE, "resetPassword").await,
        AuthError::TokenTypeMismatch,
    );
}

// =========================================================================
// PIPE-06: Structurally valid token whose account was deleted - OutdatedToken
// =========================================================================
#[tokio::test]
async fn deleted_account_fails_outdated_token() {
    let gw = gateway(
        vec![],
        vec![policy("getAllUsers", TokenClass::Default, RoleRule::Any)],
    );
    let token = gw.issue_token(Uuid::new_v4(), TokenPayload::Default).unwrap();

    assert_auth_err(
        gw.authenticate(Some(&token), SERVICE, "getAllUsers").await,
        AuthError::OutdatedToken,
    );
}

// =========================================================================
// PIPE-07: Deactivated account - AccountInactive even when all else passes
// =========================================================================
#[tokio::test]
async fn deactivated_account_fails_inactive() {
    let member = account(Role::ADMIN, false, true);
    let gw = gateway(
        vec![member.clone()],
        vec![policy("getAllUsers", TokenClass::Default, RoleRule::Any)],
    );
    let token = gw.issue_token(member.id, TokenPayload::Default).unwrap();

    assert_auth_err(
        gw.authenticate(Some(&token), SERVICE, "getAllUsers").await,
        AuthError::AccountInactive,
    );
}

// =========================================================================
// PIPE-08: Unactivated email on a regular route - EmailInactive
// =========================================================================
#[tokio::test]
async fn pending_email_fails_on_regular_route() {
    let member = account(Role::VIEWER, true, false);
    let gw = gateway(
        vec![member.clone()],
        vec![policy("getAllUsers", TokenClass::Default, RoleRule::Any)],
    );
    let token = gw.issue_token(member.id, TokenPayload::Default).unwrap();

    assert_auth_err(
        gw.authenticate(Some(&token), SERVICE, "getAllUsers").await,
        AuthError::EmailInactive,
    );
}

// =========================================================================
// PIPE-09: Unactivated email on the designated activation route - succeeds
// =========================================================================
#[tokio::test]
async fn pending_email_passes_on_activation_route() {
    let member = account(Role::VIEWER, true, false);
    let gw = gateway(
        vec![member.clone()],
        vec![policy(
            EMAIL_ACTIVATION_ROUTE,
            TokenClass::Activation,
            RoleRule::Any,
        )],
    );
    let token = gw
        .issue_token(
            member.id,
            TokenPayload::Activation {
                email: "member@example.com".into(),
            },
        )
        .unwrap();

    let ctx = gw
        .authenticate(Some(&token), SERVICE, EMAIL_ACTIVATION_ROUTE)
        .await
        .unwrap();
    assert_eq!(ctx.account.id, member.id);
    assert_eq!(ctx.claims.class(), TokenClass::Activation);
}

// =========================================================================
// PIPE-10: Role set {0,1} - role 2 denied, role 1 admitted
// =========================================================================
#[tokio::test]
async fn role_set_policy_admits_only_listed_roles() {
    let manager = account(Role(1), true, true);
    let viewer = account(Role(2), true, true);
    let rule = RoleRule::OneOf {
        roles: BTreeSet::from([Role(0), Role(1)]),
    };
    let gw = gateway(
        vec![manager.clone(), viewer.clone()],
        vec![policy("getAllUsers", TokenClass::Default, rule)],
    );

    let token = gw.issue_token(viewer.id, TokenPayload::Default).unwrap();
    assert_auth_err(
        gw.authenticate(Some(&token), SERVICE, "getAllUsers").await,
        AuthError::Unauthorized,
    );

    let token = gw.issue_token(manager.id, TokenPayload::Default).unwrap();
    let ctx = gw
        .authenticate(Some(&token), SERVICE, "getAllUsers")
        .await
        .unwrap();
    assert_eq!(ctx.account.role, Role(1));
}

// =========================================================================
// PIPE-11: Rank threshold policy - hierarchical comparison
// =========================================================================
#[tokio::test]
async fn rank_threshold_policy_cuts_off_below_threshold() {
    let author = account(Role::AUTHOR, true, true);
    let gw = gateway(
        vec![author.clone()],
        vec![policy(
            "createSwot",
            TokenClass::Default,
            RoleRule::AtMost { rank: Role(2) },
        )],
    );
    let token = gw.issue_token(author.id, TokenPayload::Default).unwrap();

    assert_auth_err(
        gw.authenticate(Some(&token), SERVICE, "createSwot").await,
        AuthError::Unauthorized,
    );
}

// =========================================================================
// PIPE-12: Success re-issues a fresh DEFAULT token bound to the account
// =========================================================================
#[tokio::test]
async fn success_reissues_sliding_token() {
    let member = account(Role::ADMIN, true, true);
    let gw = gateway(
        vec![member.clone()],
        vec![policy("getAllUsers", TokenClass::Default, RoleRule::Any)],
    );
    let presented = gw.issue_token(member.id, TokenPayload::Default).unwrap();

    let ctx = gw
        .authenticate(Some(&presented), SERVICE, "getAllUsers")
        .await
        .unwrap();

    // The fresh token verifies under the same codec and names the account.
    let reissued = gw.codec().verify(&ctx.token).unwrap();
    assert_eq!(reissued.sub, member.id);
    assert_eq!(reissued.class(), TokenClass::Default);
    // The presented token's metadata is surfaced unchanged.
    assert_eq!(ctx.claims.sub, member.id);
}

// =========================================================================
// PIPE-13: Store outage surfaces as a transient error, not an auth failure
// =========================================================================
#[tokio::test]
async fn store_outage_is_not_an_auth_failure() {
    let gw = AuthGateway::new(
        TokenCodec::new(SECRET, DurationTable::default()),
        Arc::new(UnreachableAccounts),
        Arc::new(MemoryPolicies(vec![policy(
            "getAllUsers",
            TokenClass::Default,
            RoleRule::Any,
        )])),
    );
    let token = gw.issue_token(Uuid::new_v4(), TokenPayload::Default).unwrap();

    match gw.authenticate(Some(&token), SERVICE, "getAllUsers").await {
        Err(GatewayError::Store(StoreError::Unavailable(_))) => {}
        other => panic!("expected transient store error, got {other:?}"),
    }
}

// =========================================================================
// Introspection returns the registered policy without authenticating
// =========================================================================
#[tokio::test]
async fn authorize_service_route_is_pure_lookup() {
    let registered = policy("getAllUsers", TokenClass::Default, RoleRule::Any);
    let gw = gateway(vec![], vec![registered.clone()]);

    let found = gw
        .authorize_service_route(SERVICE, "getAllUsers")
        .await
        .unwrap();
    assert_eq!(found, Some(registered));

    let absent = gw
        .authorize_service_route(SERVICE, "unregistered")
        .await
        .unwrap();
    assert_eq!(absent, None);
}
