#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Authentication and authorization gateway for the Stratboard back-end.
//!
//! Everything security-sensitive lives here: credential hashing, signed token
//! issue/verify, the per-route authorization registry, and the fixed-order
//! authentication pipeline that the HTTP layer runs on every protected call.
//! Storage and mail are collaborators behind traits; this crate performs no
//! I/O of its own beyond what those traits provide.

pub mod account;
#[cfg(test)]
mod edge_case_tests;
pub mod error;
pub mod password;
pub mod pipeline;
pub mod policy;
pub mod stores;
pub mod token;

pub use account::{Account, Profile, Role};
pub use error::{AuthError, GatewayError};
pub use password::{derive, derive_credential, verify_credential, Credential};
pub use pipeline::{AuthContext, AuthGateway, EMAIL_ACTIVATION_ROUTE};
pub use policy::{authorize, Policy, RoleRule};
pub use stores::{AccountStore, CredentialStore, PolicyStore, StoreError};
pub use token::{Claims, DurationTable, TokenClass, TokenCodec, TokenError, TokenPayload};
