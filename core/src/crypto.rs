//! Password hashing and at-rest encryption.
//!
//! Keys are PBKDF2-HMAC-SHA256 derived; payloads are sealed with AES-256-GCM
//! into a base64 [`CryptoEnvelope`] with the tag stored apart from the data.

use std::time::{SystemTime, UNIX_EPOCH};

use aes_gcm::aead::{rand_core::RngCore, Aead, OsRng};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 200_000;
const ENVELOPE_VERSION: u8 = 1;
const TAG_LEN: usize = 16;
const IV_LEN: usize = 12;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CryptoError {
    #[error("invalid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("cipher failure: {0}")]
    Cipher(String),

    #[error("malformed envelope: {0}")]
    Malformed(&'static str),

    /// Wrong key, or the payload was tampered with.
    #[error("decryption failed")]
    Decrypt,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CryptoEnvelope {
    pub v: u8,
    pub salt: String,
    pub iv: String,
    pub tag: String,
    pub data: String,
}

pub fn random_salt() -> [u8; 16] {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    salt
}

pub fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations.max(1), &mut key);
    key
}

pub fn encrypt_text_with_key(
    text: &str,
    salt: &[u8],
    key: &[u8; 32],
) -> Result<CryptoEnvelope, CryptoError> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let cipher =
        Aes256Gcm::new_from_slice(key.as_slice()).map_err(|err| CryptoError::Cipher(err.to_string()))?;
    let encrypted = cipher
        .encrypt(Nonce::from_slice(&iv), text.as_bytes())
        .map_err(|err| CryptoError::Cipher(err.to_string()))?;
    if encrypted.len() < TAG_LEN {
        return Err(CryptoError::Malformed("ciphertext shorter than tag"));
    }
    let (data, tag) = encrypted.split_at(encrypted.len() - TAG_LEN);

    Ok(CryptoEnvelope {
        v: ENVELOPE_VERSION,
        salt: encode_b64(salt),
        iv: encode_b64(&iv),
        tag: encode_b64(tag),
        data: encode_b64(data),
    })
}

pub fn decrypt_envelope_with_key(
    envelope: &CryptoEnvelope,
    key: &[u8; 32],
) -> Result<String, CryptoError> {
    let iv = decode_b64(envelope.iv.as_str())?;
    let tag = decode_b64(envelope.tag.as_str())?;
    let data = decode_b64(envelope.data.as_str())?;
    if iv.len() != IV_LEN {
        return Err(CryptoError::Malformed("iv length"));
    }
    if tag.len() != TAG_LEN {
        return Err(CryptoError::Malformed("tag length"));
    }

    let cipher =
        Aes256Gcm::new_from_slice(key.as_slice()).map_err(|err| CryptoError::Cipher(err.to_string()))?;
    let mut combined = Vec::with_capacity(data.len() + tag.len());
    combined.extend_from_slice(data.as_slice());
    combined.extend_from_slice(tag.as_slice());

    let decrypted = cipher
        .decrypt(Nonce::from_slice(iv.as_slice()), combined.as_slice())
        .map_err(|_| CryptoError::Decrypt)?;
    String::from_utf8(decrypted).map_err(|_| CryptoError::Decrypt)
}

pub fn now_string() -> String {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    ms.to_string()
}

pub fn new_id() -> String {
    let mut bytes = [0_u8; 10];
    OsRng.fill_bytes(&mut bytes);
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("id-{}-{hex}", now_string())
}

pub fn decode_b64(value: &str) -> Result<Vec<u8>, CryptoError> {
    Ok(B64.decode(value)?)
}

pub fn encode_b64(bytes: &[u8]) -> String {
    B64.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low iteration count keeps the suite fast.
    const ITER: u32 = 10;

    fn seal(text: &str, password: &str) -> (CryptoEnvelope, Vec<u8>) {
        let salt = random_salt();
        let key = derive_key(password, &salt, ITER);
        (encrypt_text_with_key(text, &salt, &key).unwrap(), salt.to_vec())
    }

    #[test]
    fn envelope_round_trip() {
        let (envelope, salt) = seal("{\"nome\":\"Ana\"}", "segredo");
        assert_eq!(envelope.v, 1);
        assert_eq!(decode_b64(&envelope.salt).unwrap(), salt);
        let key = derive_key("segredo", &salt, ITER);
        let text = decrypt_envelope_with_key(&envelope, &key).unwrap();
        assert_eq!(text, "{\"nome\":\"Ana\"}");
    }

    #[test]
    fn wrong_password_fails_to_decrypt() {
        let (envelope, salt) = seal("payload", "right");
        let key = derive_key("wrong", &salt, ITER);
        assert!(matches!(
            decrypt_envelope_with_key(&envelope, &key),
            Err(CryptoError::Decrypt)
        ));
    }

    #[test]
    fn tampered_tag_is_rejected() {
        let (mut envelope, salt) = seal("payload", "pw");
        envelope.tag = encode_b64(&[0u8; 16]);
        let key = derive_key("pw", &salt, ITER);
        assert!(decrypt_envelope_with_key(&envelope, &key).is_err());
    }

    #[test]
    fn derive_key_is_deterministic_per_salt() {
        let a = derive_key("pw", b"salt-one", ITER);
        let b = derive_key("pw", b"salt-one", ITER);
        let c = derive_key("pw", b"salt-two", ITER);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn ids_are_unique_and_prefixed() {
        let a = new_id();
        let b = new_id();
        assert!(a.starts_with("id-"));
        assert_ne!(a, b);
    }
}
