//! Sealed-value helpers.
//!
//! Sealed values use ChaCha20-Poly1305 with a 32-byte key and 12-byte nonce.
//! The wire form is a `sealed.v1.` prefix followed by base64 of
//! `nonce(12) || ciphertext || tag(16)`.

use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Prefix marking a stored value as sealed.
pub const SEALED_PREFIX: &str = "sealed.v1.";

/// Nonce size for ChaCha20-Poly1305 (96 bits).
pub const NONCE_SIZE: usize = 12;
/// Key size for ChaCha20-Poly1305 (256 bits).
pub const KEY_SIZE: usize = 32;

/// Errors returned by the sealing helpers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SealError {
    #[error("invalid sealed payload: {0}")]
    Format(String),
    #[error("decryption failed")]
    Crypto,
}

/// Derive a sealing key from a secret using HKDF-SHA256.
///
/// `info` namespaces the derivation so the same secret can back multiple
/// sealing domains without key reuse.
pub fn derive_key(secret: &[u8], info: &[u8]) -> [u8; KEY_SIZE] {
    let hkdf = Hkdf::<Sha256>::new(None, secret);
    let mut okm = [0u8; KEY_SIZE];
    // expand only fails when the requested length is too large; 32 bytes is
    // always valid for SHA-256
    hkdf.expand(info, &mut okm)
        .unwrap_or_else(|_| unreachable!("HKDF expand of {} bytes", KEY_SIZE));
    okm
}

/// Check whether a stored value is a sealed blob.
pub fn is_sealed(value: &str) -> bool {
    value.starts_with(SEALED_PREFIX)
}

/// Seal a plaintext value with a fresh random nonce.
pub fn seal(key: &[u8; KEY_SIZE], plaintext: &str) -> Result<String, SealError> {
    let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| SealError::Crypto)?;

    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);
    let nonce_ref = Nonce::from_slice(&nonce);

    let ciphertext = cipher
        .encrypt(nonce_ref, plaintext.as_bytes())
        .map_err(|_| SealError::Crypto)?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);

    Ok(format!("{}{}", SEALED_PREFIX, BASE64.encode(blob)))
}

/// Unseal a sealed blob back to its plaintext value.
///
/// Returns [`SealError::Crypto`] when the key does not match the one the
/// value was sealed with.
pub fn unseal(key: &[u8; KEY_SIZE], sealed: &str) -> Result<String, SealError> {
    let encoded = sealed
        .strip_prefix(SEALED_PREFIX)
        .ok_or_else(|| SealError::Format("missing sealed prefix".to_string()))?;

    let blob = BASE64
        .decode(encoded)
        .map_err(|e| SealError::Format(e.to_string()))?;

    if blob.len() < NONCE_SIZE {
        return Err(SealError::Format(format!(
            "sealed payload too short: {} bytes",
            blob.len()
        )));
    }

    let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
    let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| SealError::Crypto)?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| SealError::Crypto)?;

    String::from_utf8(plaintext).map_err(|e| SealError::Format(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_unseal_round_trip() {
        let key = derive_key(b"secret", b"test-domain");
        let sealed = seal(&key, "refresh-token-value").unwrap();

        assert!(is_sealed(&sealed));
        assert_eq!(unseal(&key, &sealed).unwrap(), "refresh-token-value");
    }

    #[test]
    fn unseal_with_wrong_key_fails() {
        let key = derive_key(b"secret", b"test-domain");
        let other = derive_key(b"different-secret", b"test-domain");

        let sealed = seal(&key, "value").unwrap();
        assert_eq!(unseal(&other, &sealed).unwrap_err(), SealError::Crypto);
    }

    #[test]
    fn derive_key_namespaced_by_info() {
        let a = derive_key(b"secret", b"domain-a");
        let b = derive_key(b"secret", b"domain-b");
        assert_ne!(a, b);
    }

    #[test]
    fn unseal_rejects_unsealed_value() {
        let key = derive_key(b"secret", b"test-domain");
        let err = unseal(&key, "plain-token").unwrap_err();
        assert!(matches!(err, SealError::Format(_)));
    }

    #[test]
    fn unseal_rejects_truncated_payload() {
        let key = derive_key(b"secret", b"test-domain");
        let short = format!("{}{}", SEALED_PREFIX, "AAAA");
        let err = unseal(&key, &short).unwrap_err();
        assert!(matches!(err, SealError::Format(_)));
    }

    #[test]
    fn fresh_nonce_changes_ciphertext() {
        let key = derive_key(b"secret", b"test-domain");
        let a = seal(&key, "same plaintext").unwrap();
        let b = seal(&key, "same plaintext").unwrap();
        assert_ne!(a, b);
    }
}
