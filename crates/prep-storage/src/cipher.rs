//! AES-256-GCM sealing of byte payloads into a single storable string.
//!
//! Format: `sealed:` followed by base64url (no padding) of
//! `nonce (12 bytes) | ciphertext + tag`. A fresh nonce is drawn per call.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use thiserror::Error;

use crate::key_manager::KeyMaterial;

pub const CIPHERTEXT_PREFIX: &str = "sealed:";

const NONCE_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("cipher init failed: {0}")]
    Init(String),
    #[error("encrypt failed")]
    Encrypt,
    #[error("value is not sealed")]
    Format,
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("decrypt failed")]
    Decrypt,
}

/// Encrypt `plaintext` under `key` and return the textual ciphertext.
pub fn seal(key: &KeyMaterial, plaintext: &[u8]) -> Result<String, CipherError> {
    let cipher = build_cipher(key)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CipherError::Encrypt)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(nonce.as_slice());
    blob.extend_from_slice(&ciphertext);
    Ok(format!("{CIPHERTEXT_PREFIX}{}", URL_SAFE_NO_PAD.encode(blob)))
}

/// Decrypt a value produced by [`seal`]. Fails on any tampering or key mismatch.
pub fn open(key: &KeyMaterial, sealed: &str) -> Result<Vec<u8>, CipherError> {
    let encoded = sealed
        .trim()
        .strip_prefix(CIPHERTEXT_PREFIX)
        .ok_or(CipherError::Format)?;
    let blob = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CipherError::Decode(e.to_string()))?;
    if blob.len() < NONCE_LEN {
        return Err(CipherError::Format);
    }

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = build_cipher(key)?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CipherError::Decrypt)
}

fn build_cipher(material: &KeyMaterial) -> Result<Aes256Gcm, CipherError> {
    Aes256Gcm::new_from_slice(&material.bytes).map_err(|e| CipherError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_manager::legacy_key;

    #[test]
    fn seal_then_open_restores_plaintext() {
        let key = legacy_key("seed");
        let sealed = seal(&key, b"hello-prep").expect("seal");

        assert!(sealed.starts_with(CIPHERTEXT_PREFIX));
        assert!(!sealed.contains("hello-prep"));
        assert_eq!(open(&key, &sealed).expect("open"), b"hello-prep");
    }

    #[test]
    fn nonces_differ_between_calls() {
        let key = legacy_key("seed");
        let a = seal(&key, b"same").expect("seal");
        let b = seal(&key, b"same").expect("seal");
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_is_rejected() {
        let sealed = seal(&legacy_key("one"), b"payload").expect("seal");
        assert_eq!(open(&legacy_key("two"), &sealed), Err(CipherError::Decrypt));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let key = legacy_key("seed");
        let sealed = seal(&key, b"payload").expect("seal");
        let mut blob = URL_SAFE_NO_PAD
            .decode(&sealed[CIPHERTEXT_PREFIX.len()..])
            .expect("decode");
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        let tampered = format!("{CIPHERTEXT_PREFIX}{}", URL_SAFE_NO_PAD.encode(blob));

        assert_eq!(open(&key, &tampered), Err(CipherError::Decrypt));
    }

    #[test]
    fn malformed_input_is_rejected() {
        let key = legacy_key("seed");
        assert_eq!(open(&key, "{\"a\":1}"), Err(CipherError::Format));
        assert_eq!(open(&key, "sealed:AAAA"), Err(CipherError::Format));
        assert!(matches!(
            open(&key, "sealed:***"),
            Err(CipherError::Decode(_))
        ));
    }
}
