//! Account projection read by the gateway.
//!
//! Accounts are owned and mutated by the member-management collaborator; the
//! gateway only reads a projection that excludes the stored credential.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Ordered role rank. Lower rank is more privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub u8);

impl Role {
    pub const ADMIN: Role = Role(0);
    pub const MANAGER: Role = Role(1);
    pub const SUPERVIEWER: Role = Role(2);
    pub const AUTHOR: Role = Role(3);
    pub const VIEWER: Role = Role(4);

    /// True when `self` is strictly more privileged than `other`.
    pub fn outranks(self, other: Role) -> bool {
        self.0 < other.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    pub last_name: String,
    #[serde(default)]
    pub title: u8,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub birth_date: Option<Date>,
}

impl Profile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Credential-free account projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub role: Role,
    pub active: bool,
    /// Activated email address. `None` until first activation completes.
    pub email: Option<String>,
    /// Pending address awaiting activation, set by email-change flows.
    pub email_to_activate: Option<String>,
    pub profile: Profile,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Account {
    /// An account's email is activated iff it has a confirmed address.
    pub fn email_activated(&self) -> bool {
        self.email.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_rank_outranks_higher() {
        assert!(Role::ADMIN.outranks(Role::MANAGER));
        assert!(Role::MANAGER.outranks(Role::VIEWER));
        assert!(!Role::VIEWER.outranks(Role::VIEWER));
        assert!(!Role::AUTHOR.outranks(Role::ADMIN));
    }

    #[test]
    fn email_activation_follows_confirmed_address() {
        let mut account = Account {
            id: Uuid::new_v4(),
            role: Role::VIEWER,
            active: true,
            email: None,
            email_to_activate: Some("pending@example.com".into()),
            profile: Profile::default(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert!(!account.email_activated());

        account.email = Some("pending@example.com".into());
        account.email_to_activate = None;
        assert!(account.email_activated());
    }
}
