//! Authorization registry types.
//!
//! A policy binds a (service, route) pair to the token class it requires and
//! the roles it admits. Absence of a policy means the route is unreachable
//! through the gateway; callers treat absent as a hard deny, distinct from a
//! policy that admits nobody.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::account::Role;
use crate::token::TokenClass;

/// Which roles a policy admits. Pure data; no I/O.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleRule {
    /// Any role may call the route.
    Any,
    /// Caller's role must be a member of the set. Invariant: non-empty
    /// (an empty set is expressed as `Any`, never as `OneOf`).
    OneOf { roles: BTreeSet<Role> },
    /// Hierarchical threshold: caller's rank must be numerically at most
    /// `rank` (lower rank is more privileged).
    AtMost { rank: Role },
}

impl RoleRule {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            RoleRule::Any => true,
            RoleRule::OneOf { roles } => roles.contains(&role),
            RoleRule::AtMost { rank } => role.0 <= rank.0,
        }
    }
}

/// Policy record for one (service, route) pair. At most one per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub service: String,
    pub route: String,
    pub required_class: TokenClass,
    pub rule: RoleRule,
}

/// True iff the presented token class matches the policy's required class
/// and the caller's role is admitted by the policy's rule.
pub fn authorize(policy: &Policy, role: Role, class: TokenClass) -> bool {
    class == policy.required_class && policy.rule.permits(role)
}
