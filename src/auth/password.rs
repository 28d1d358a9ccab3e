//! Salted password hashing
//!
//! PBKDF2-HMAC-SHA256 with a per-account random salt, stored as hex.
//! Comparisons of hashes and shared secrets run in constant time.

use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::storage::StoredCredential;

#[cfg(not(test))]
const ROUNDS: u32 = 210_000;
#[cfg(test)]
const ROUNDS: u32 = 1_000;

const HASH_LEN: usize = 32;

/// Hash `password` with a fresh random salt
pub fn hash_password(password: &str) -> StoredCredential {
    let salt = Uuid::new_v4().simple().to_string();
    let hash = derive(&salt, password);
    StoredCredential { salt, hash }
}

/// Check `password` against a stored credential
pub fn verify_password(password: &str, credential: &StoredCredential) -> bool {
    let candidate = derive(&credential.salt, password);
    secrets_match(&candidate, &credential.hash)
}

/// Constant-time equality for secrets of any length
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn derive(salt: &str, password: &str) -> String {
    let mut out = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), ROUNDS, &mut out);
    out.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_roundtrip() {
        let credential = hash_password("SV001@123");
        assert!(verify_password("SV001@123", &credential));
        assert!(!verify_password("sv001@123", &credential));
        assert!(!verify_password("", &credential));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same");
        let b = hash_password("same");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
        assert_eq!(a.hash.len(), 64);
    }

    #[test]
    fn test_known_vector() {
        // RFC 7914 §11, PBKDF2-HMAC-SHA256 with c = 1
        let mut out = [0u8; 64];
        pbkdf2::pbkdf2_hmac::<Sha256>(b"passwd", b"salt", 1, &mut out);
        assert_eq!(&out[..4], &[0x55, 0xac, 0x04, 0x6e]);
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("proxy-key", "proxy-key"));
        assert!(!secrets_match("proxy-kez", "proxy-key"));
        assert!(!secrets_match("proxy-key-2", "proxy-key"));
        assert!(!secrets_match("", "proxy-key"));
    }
}
