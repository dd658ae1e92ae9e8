//! Salted password hashing
//!
//! `hash = hex(SHA-256^rounds(salt ":" password))`

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Hash iterations applied after the first digest
pub const HASH_ROUNDS: u32 = 10_000;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Fresh random salt
pub fn generate_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    let mut digest = hasher.finalize();

    for _ in 0..HASH_ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(digest);
        digest = hasher.finalize();
    }

    hex::encode(digest)
}

/// Compare in time independent of where the strings differ
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    let actual = hash_password(password, salt);
    if actual.len() != expected_hash.len() {
        return false;
    }
    actual
        .bytes()
        .zip(expected_hash.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic_per_salt() {
        let a = hash_password("correct horse", "salt-1");
        let b = hash_password("correct horse", "salt-1");
        let c = hash_password("correct horse", "salt-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_verify() {
        let salt = generate_salt();
        let hash = hash_password("hunter22", &salt);
        assert!(verify_password("hunter22", &salt, &hash));
        assert!(!verify_password("hunter23", &salt, &hash));
        assert!(!verify_password("hunter22", &salt, "short"));
    }

    #[test]
    fn test_salts_are_unique() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
