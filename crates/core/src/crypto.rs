//! At-rest sealing for upstream credentials and session blobs.
//!
//! [`Crypter`] wraps AES-256-GCM with a single process-wide key. Every call
//! to [`Crypter::seal`] draws a fresh 12-byte nonce and prepends it to the
//! ciphertext, so the stored layout is `nonce || ciphertext || tag`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::Rng;

/// AES-GCM nonce size in bytes.
pub const NONCE_LENGTH: usize = 12;

/// Required key size in bytes (AES-256).
pub const KEY_LENGTH: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The configured key is not 64 hex characters.
    #[error("encryption key must be {KEY_LENGTH} bytes encoded as hex")]
    InvalidKey,

    /// The buffer is shorter than a nonce or failed authentication.
    #[error("ciphertext is malformed or failed authentication")]
    BadCiphertext,

    #[error("encryption failed")]
    SealFailed,
}

/// Authenticated symmetric encryption with a process-wide key.
#[derive(Clone)]
pub struct Crypter {
    cipher: Aes256Gcm,
}

impl Crypter {
    /// Build a crypter from a 32-byte key given as 64 hex characters.
    pub fn from_hex(key_hex: &str) -> Result<Self, CryptoError> {
        let key = hex::decode(key_hex.trim()).map_err(|_| CryptoError::InvalidKey)?;
        Self::from_key(&key)
    }

    pub fn from_key(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_LENGTH {
            return Err(CryptoError::InvalidKey);
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        rand::rng().fill(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| CryptoError::SealFailed)?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt a buffer produced by [`Crypter::seal`].
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < NONCE_LENGTH {
            return Err(CryptoError::BadCiphertext);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LENGTH);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::BadCiphertext)
    }
}

impl std::fmt::Debug for Crypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Crypter { .. }")
    }
}
