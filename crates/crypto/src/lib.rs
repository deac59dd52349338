//! Envelope encryption for opaque state carried through the caller.
//!
//! Every message is encrypted under a fresh random data key, and the data
//! key is wrapped under a long-lived master key. Ciphertexts are URL-safe
//! strings of the form:
//!
//! `1<wrapped key length:3><iv length:3><iv><wrapped key><ciphertext>`
//!
//! Each master key generation is named by a cipher id. [`KeyRing`] holds the
//! active generation plus retired ones that must stay decryptable, and
//! [`EncryptedPayload`] pairs a ciphertext with the cipher id that made it.
//!
//! Decrypted values are returned as [`SecretString`] to prevent accidental
//! logging. [`MasterKey`] zeroizes key material on drop.

mod envelope;
mod keyring;
mod payload;

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub use envelope::{ENVELOPE_VERSION, decrypt_envelope, encrypt_envelope};
pub use keyring::{CIPHER_MASTER_ENV, CIPHER_MASTER_PREVIOUS_ENV, KeyRing, parse_retired_keys};
pub use payload::EncryptedPayload;

// Re-export for consumers so they don't need a direct `secrecy` dependency.
pub use secrecy::{ExposeSecret, SecretString};

/// A 32-byte AES-256 master key that is zeroized when dropped.
///
/// The [`Debug`] implementation is redacted to avoid accidental logging.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; 32]);

impl MasterKey {
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Errors that can occur during encryption/decryption operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No master key is configured in the environment.
    #[error("no cipher master key is configured")]
    NotConfigured,

    /// The provided master key is not valid (wrong length or encoding).
    #[error("invalid master key: {0}")]
    InvalidKey(String),

    /// The ciphertext could not be parsed.
    #[error("malformed ciphertext: {0}")]
    Malformed(String),

    /// Decryption failed (wrong key or corrupted data).
    #[error("decryption failed (wrong key or corrupted data)")]
    DecryptionFailed,

    /// The payload was produced by a key generation this process does not hold.
    #[error("payload was encrypted with cipher id {cid:?}, which is not available")]
    StaleCipherId { cid: String },

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}

impl CryptoError {
    /// True for errors caused by missing or invalid process configuration,
    /// as opposed to a bad or rotated ciphertext.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::NotConfigured | Self::InvalidKey(_))
    }
}

/// Parse a 32-byte master key from hex or base64.
///
/// Accepts either 64 hex characters or a base64 string that decodes to exactly
/// 32 bytes.
pub fn parse_master_key(raw: &str) -> Result<MasterKey, CryptoError> {
    let trimmed = raw.trim();
    if trimmed.len() == 64
        && let Ok(bytes) = hex::decode(trimmed)
        && bytes.len() == 32
    {
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        return Ok(MasterKey(key));
    }
    if let Ok(bytes) = B64.decode(trimmed)
        && bytes.len() == 32
    {
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        return Ok(MasterKey(key));
    }
    Err(CryptoError::InvalidKey(
        "must be 32 bytes encoded as 64 hex chars or base64".to_owned(),
    ))
}
