//! Credential hashing
//!
//! Passwords are stored as a `{hash, salt}` pair: PBKDF2-HMAC-SHA256 over the
//! secret with a per-credential random salt, base64 encoded. Verification
//! re-derives the hash and compares in constant time.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const ITERATIONS: u32 = 10_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 64;

/// Stored credential pair. The hash is never recoverable to plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub hash: String,
    pub salt: String,
}

/// Derive the hash for `secret` under an existing salt.
///
/// Deterministic: the same secret and salt always produce the same hash.
/// The salt string's bytes are fed to the KDF directly, so any well-formed
/// string is a usable salt and derivation cannot fail.
pub fn derive(secret: &str, salt: &str) -> String {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt.as_bytes(), ITERATIONS, &mut key);
    BASE64.encode(key)
}

/// Derive a credential with a freshly generated random salt.
pub fn derive_credential(secret: &str) -> Credential {
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = BASE64.encode(salt_bytes);
    let hash = derive(secret, &salt);
    Credential { hash, salt }
}

/// Check `secret` against a stored hash+salt pair.
///
/// Comparison is constant-time over the full hash length; it must not
/// short-circuit on the first differing byte.
pub fn verify_credential(secret: &str, hash: &str, salt: &str) -> bool {
    let computed = derive(secret, salt);
    computed.as_bytes().ct_eq(hash.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic_for_same_salt() {
        let cred = derive_credential("hunter2");
        assert_eq!(cred.hash, derive("hunter2", &cred.salt));
    }

    #[test]
    fn verify_round_trip() {
        let cred = derive_credential("correct horse battery staple");
        assert!(verify_credential(
            "correct horse battery staple",
            &cred.hash,
            &cred.salt
        ));
    }

    #[test]
    fn verify_rejects_different_secret() {
        let cred = derive_credential("hunter2");
        assert!(!verify_credential("hunter3", &cred.hash, &cred.salt));
    }

    #[test]
    fn fresh_salts_are_unique() {
        let a = derive_credential("same secret");
        let b = derive_credential("same secret");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn hash_has_expected_length() {
        // 64-byte key, base64 encoded with padding
        let cred = derive_credential("x");
        assert_eq!(cred.hash.len(), 88);
    }

    #[test]
    fn verify_rejects_truncated_hash() {
        let cred = derive_credential("hunter2");
        let truncated = &cred.hash[..cred.hash.len() - 4];
        assert!(!verify_credential("hunter2", truncated, &cred.salt));
    }

    #[test]
    fn empty_secret_is_still_well_formed() {
        let cred = derive_credential("");
        assert!(verify_credential("", &cred.hash, &cred.salt));
        assert!(!verify_credential(" ", &cred.hash, &cred.salt));
    }
}
