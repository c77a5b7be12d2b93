//! Token codec
//!
//! Compact signed tokens (HS256 JWTs) carrying {subject, class, expiration,
//! class-specific payload}. The signing key is process-wide state loaded once
//! at startup; tokens are stateless and never persisted, so validity is
//! decided purely by signature and expiration at verification time.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Purpose of a token. Each class has its own validity duration, and routes
/// declare which class they accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Default,
    Activation,
    Reset,
}

/// Class-discriminated token payload.
///
/// The discriminant doubles as the token class, so payload access is
/// exhaustively checked: an activation token always carries the email it was
/// issued for, and nothing else ever does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cls", rename_all = "lowercase")]
pub enum TokenPayload {
    Default,
    Activation { email: String },
    Reset,
}

impl TokenPayload {
    pub fn class(&self) -> TokenClass {
        match self {
            TokenPayload::Default => TokenClass::Default,
            TokenPayload::Activation { .. } => TokenClass::Activation,
            TokenPayload::Reset => TokenClass::Reset,
        }
    }
}

/// Decoded token contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account identifier the signature vouches for.
    pub sub: Uuid,
    /// Absolute expiration instant, unix seconds.
    pub exp: i64,
    /// Issue instant, unix seconds.
    pub iat: i64,
    #[serde(flatten)]
    pub payload: TokenPayload,
}

impl Claims {
    pub fn class(&self) -> TokenClass {
        self.payload.class()
    }
}

/// Per-class validity durations. Policy, not mechanism: the table is fixed
/// for a process lifetime but injectable so deployments (and tests) can
/// override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationTable {
    pub default: Duration,
    pub activation: Duration,
    pub reset: Duration,
}

impl Default for DurationTable {
    fn default() -> Self {
        Self {
            default: Duration::days(30),
            activation: Duration::days(1),
            reset: Duration::days(30),
        }
    }
}

impl DurationTable {
    pub fn for_class(&self, class: TokenClass) -> Duration {
        match class {
            TokenClass::Default => self.default,
            TokenClass::Activation => self.activation,
            TokenClass::Reset => self.reset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Signature did not validate or the payload is malformed.
    #[error("invalid token")]
    Invalid,
    /// Expiration instant has passed.
    #[error("expired token")]
    Expired,
    /// Token could not be signed (claims failed to serialize).
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Signs and verifies tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    durations: DurationTable,
}

impl TokenCodec {
    pub fn new(secret: &[u8], durations: DurationTable) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            durations,
        }
    }

    pub fn durations(&self) -> &DurationTable {
        &self.durations
    }

    /// Sign a token for `subject`. Expiration is now plus the payload
    /// class's configured duration.
    pub fn issue(&self, subject: Uuid, payload: TokenPayload) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + self.durations.for_class(payload.class());
        let claims = Claims {
            sub: subject,
            exp: exp.unix_timestamp(),
            iat: now.unix_timestamp(),
            payload,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiration, returning the decoded claims.
    ///
    /// HS256 is enforced explicitly; tokens signed with a different or absent
    /// key, or missing the subject, fail with [`TokenError::Invalid`].
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-chars!";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, DurationTable::default())
    }

    #[test]
    fn issue_verify_round_trip_preserves_subject_and_class() {
        let codec = codec();
        let subject = Uuid::new_v4();

        let token = codec.issue(subject, TokenPayload::Default).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.sub, subject);
        assert_eq!(claims.class(), TokenClass::Default);
    }

    #[test]
    fn activation_payload_carries_email() {
        let codec = codec();
        let token = codec
            .issue(
                Uuid::new_v4(),
                TokenPayload::Activation {
                    email: "new@example.com".into(),
                },
            )
            .unwrap();

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.class(), TokenClass::Activation);
        match claims.payload {
            TokenPayload::Activation { email } => assert_eq!(email, "new@example.com"),
            other => panic!("wrong payload variant: {other:?}"),
        }
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        // Negative duration puts the expiration in the past at issue time.
        let durations = DurationTable {
            default: Duration::seconds(-60),
            ..DurationTable::default()
        };
        let codec = TokenCodec::new(SECRET, durations);

        let token = codec.issue(Uuid::new_v4(), TokenPayload::Default).unwrap();
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_signed_with_different_secret_is_invalid() {
        let issuer = TokenCodec::new(b"one-secret-key-of-sufficient-len", DurationTable::default());
        let verifier = codec();

        let token = issuer.issue(Uuid::new_v4(), TokenPayload::Default).unwrap();
        assert_eq!(verifier.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let codec = codec();
        let mut token = codec.issue(Uuid::new_v4(), TokenPayload::Default).unwrap();
        token.pop();
        token.push('A');
        assert_eq!(codec.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn malformed_token_is_invalid() {
        let codec = codec();
        assert_eq!(codec.verify("not.a.token"), Err(TokenError::Invalid));
        assert_eq!(codec.verify(""), Err(TokenError::Invalid));
    }

    #[test]
    fn duration_table_defaults_match_policy() {
        let table = DurationTable::default();
        assert_eq!(table.for_class(TokenClass::Default), Duration::days(30));
        assert_eq!(table.for_class(TokenClass::Activation), Duration::days(1));
        assert_eq!(table.for_class(TokenClass::Reset), Duration::days(30));
    }

    #[test]
    fn claims_serialize_with_class_discriminant() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            exp: 2_000_000_000,
            iat: 1_000_000_000,
            payload: TokenPayload::Reset,
        };
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["cls"], "reset");
    }
}
