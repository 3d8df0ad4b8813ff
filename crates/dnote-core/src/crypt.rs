//! AEAD payload crypto for the sync wire format.
//!
//! Note bodies and book labels travel as AES-256-GCM ciphertexts encoded
//! `base64(nonce || ciphertext || tag)`. Plaintext never leaves the client.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Encrypt a payload under the session cipher key.
///
/// A fresh random nonce is drawn for every call and prepended to the
/// ciphertext before encoding.
pub fn encrypt(key: &[u8], plaintext: &str) -> Result<String, String> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| format!("cipher key must be {KEY_SIZE} bytes, got {}", key.len()))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| "AEAD encryption failed".to_string())?;

    let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    payload.extend_from_slice(&nonce_bytes);
    payload.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(payload))
}

/// Authenticated-decrypt a wire payload under the session cipher key.
///
/// Fails on malformed encoding, a truncated payload, tag mismatch, or
/// non-UTF-8 plaintext.
pub fn decrypt(key: &[u8], payload: &str) -> Result<String, String> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| format!("cipher key must be {KEY_SIZE} bytes, got {}", key.len()))?;

    let raw = BASE64
        .decode(payload)
        .map_err(|error| format!("malformed base64 payload: {error}"))?;
    if raw.len() <= NONCE_SIZE {
        return Err(format!("payload too short: {} bytes", raw.len()));
    }

    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| "AEAD verification failed".to_string())?;

    String::from_utf8(plaintext).map_err(|error| format!("plaintext is not UTF-8: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> [u8; KEY_SIZE] {
        [7u8; KEY_SIZE]
    }

    #[test]
    fn round_trip() {
        let payload = encrypt(&key(), "quick brown fox").unwrap();
        assert_eq!(decrypt(&key(), &payload).unwrap(), "quick brown fox");
    }

    #[test]
    fn nonces_are_unique_per_call() {
        let a = encrypt(&key(), "same input").unwrap();
        let b = encrypt(&key(), "same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_verification() {
        let payload = encrypt(&key(), "secret").unwrap();
        let other = [8u8; KEY_SIZE];
        assert!(decrypt(&other, &payload).is_err());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let payload = encrypt(&key(), "secret").unwrap();
        let mut raw = BASE64.decode(&payload).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = BASE64.encode(raw);
        assert!(decrypt(&key(), &tampered).is_err());
    }

    #[test]
    fn rejects_short_or_malformed_payloads() {
        assert!(decrypt(&key(), "not base64 !!!").is_err());
        assert!(decrypt(&key(), &BASE64.encode([0u8; 4])).is_err());
    }

    #[test]
    fn rejects_bad_key_length() {
        assert!(encrypt(&[0u8; 16], "x").is_err());
        assert!(decrypt(&[0u8; 16], "eA==").is_err());
    }
}
