//! Cryptographic utility functions

use anyhow::{Result, bail};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Generate a cryptographically secure random key
pub fn generate_key(len: usize) -> Vec<u8> {
    let mut key = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

/// Generate a 256-bit (32 byte) signing key
pub fn generate_signing_key() -> Vec<u8> {
    generate_key(32)
}

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Encode bytes to a hex string
pub fn encode_hex(bytes: &[u8]) -> String {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";
    let mut result = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        result.push(HEX_CHARS[(byte >> 4) as usize] as char);
        result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
    }
    result
}

/// Calculate SHA256 hash and return as hex string
pub fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    encode_hex(&hasher.finalize())
}

/// Hash a password with a random salt, producing `salt$digest`
pub fn hash_password(password: &str) -> String {
    let salt = encode_hex(&generate_key(16));
    let digest = sha256_hex(&format!("{}{}", salt, password));
    format!("{}${}", salt, digest)
}

/// Verify a password against a `salt$digest` stored hash
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let Some((salt, digest)) = stored.split_once('$') else {
        bail!("Malformed password hash");
    };
    let candidate = sha256_hex(&format!("{}{}", salt, password));
    Ok(constant_time_eq(&candidate, digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key_length() {
        assert_eq!(generate_key(32).len(), 32);
        assert_eq!(generate_key(16).len(), 16);
    }

    #[test]
    fn test_generate_key_unique() {
        assert_ne!(generate_key(32), generate_key(32));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }

    #[test]
    fn test_encode_hex() {
        assert_eq!(encode_hex(&[0x00, 0xff, 0x10]), "00ff10");
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("hunter2");
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_password_hashes_are_salted() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn test_verify_malformed_hash() {
        assert!(verify_password("x", "not-a-valid-hash").is_err());
    }
}
