//! Payload encryption for SEND and BROADCAST content.
//!
//! Every node that shares the same secret derives the same AES-256-GCM key
//! (SHA-256 of the secret). There is no key exchange. Tokens are the
//! standard base64 encoding of `nonce || ciphertext || tag`.

use std::sync::OnceLock;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::constants::crypto::{DEFAULT_SHARED_SECRET, NONCE_LEN, TAG_LEN};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Malformed token: {0}")]
    Decode(String),

    #[error("Decryption failed: wrong key or tampered token")]
    Decrypt,

    #[error("Encryption failed")]
    Encrypt,
}

/// Symmetric cipher keyed from a pre-shared secret.
#[derive(Clone)]
pub struct Cipher {
    aead: Aes256Gcm,
}

impl Cipher {
    pub fn from_secret(secret: &[u8]) -> Self {
        let digest = Sha256::digest(secret);
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self {
            aead: Aes256Gcm::new(key),
        }
    }

    /// Process-wide cipher for the built-in secret, derived on first use.
    pub fn shared() -> &'static Cipher {
        static SHARED: OnceLock<Cipher> = OnceLock::new();
        SHARED.get_or_init(|| Cipher::from_secret(DEFAULT_SHARED_SECRET.as_bytes()))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);
        let sealed = self
            .aead
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut token = Vec::with_capacity(NONCE_LEN + sealed.len());
        token.extend_from_slice(&nonce_bytes);
        token.extend_from_slice(&sealed);
        Ok(STANDARD.encode(token))
    }

    pub fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        let raw = STANDARD
            .decode(token.trim())
            .map_err(|e| CryptoError::Decode(e.to_string()))?;

        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Decode(format!(
                "token too short: {} bytes (min: {})",
                raw.len(),
                NONCE_LEN + TAG_LEN
            )));
        }

        let (nonce_bytes, sealed) = raw.split_at(NONCE_LEN);
        let opened = self
            .aead
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| CryptoError::Decrypt)?;

        String::from_utf8(opened).map_err(|_| CryptoError::Decrypt)
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cipher(..)")
    }
}

/// Encrypt with the process-wide cipher.
pub fn encrypt(plaintext: &str) -> Result<String, CryptoError> {
    Cipher::shared().encrypt(plaintext)
}

/// Decrypt with the process-wide cipher.
pub fn decrypt(token: &str) -> Result<String, CryptoError> {
    Cipher::shared().decrypt(token)
}

/// Lowercase hex SHA-256 of a string.
pub fn hash_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}
