use std::fmt;

use secrecy::SecretString;

use crate::envelope::{decrypt_envelope, encrypt_envelope};
use crate::{CryptoError, MasterKey, parse_master_key};

/// Environment variable holding the active master key.
pub const CIPHER_MASTER_ENV: &str = "CIPHER_MASTER";

/// Environment variable holding retired keys as `cid:key,cid:key`.
pub const CIPHER_MASTER_PREVIOUS_ENV: &str = "CIPHER_MASTER_PREVIOUS";

/// The master keys known to this process, by cipher id.
///
/// The active key encrypts. Retired keys stay available for decryption so
/// that tokens minted before a rotation keep working.
pub struct KeyRing {
    cipher_id: String,
    current: Option<MasterKey>,
    retired: Vec<(String, MasterKey)>,
}

impl KeyRing {
    /// A key ring whose active generation is `cipher_id`.
    pub fn new(cipher_id: impl Into<String>, key: MasterKey) -> Self {
        Self {
            cipher_id: cipher_id.into(),
            current: Some(key),
            retired: Vec::new(),
        }
    }

    /// A key ring with no master key. Every operation fails with
    /// [`CryptoError::NotConfigured`].
    pub fn unconfigured(cipher_id: impl Into<String>) -> Self {
        Self {
            cipher_id: cipher_id.into(),
            current: None,
            retired: Vec::new(),
        }
    }

    /// Keep a retired key generation decryptable.
    #[must_use]
    pub fn with_retired(mut self, cipher_id: impl Into<String>, key: MasterKey) -> Self {
        self.retired.push((cipher_id.into(), key));
        self
    }

    /// Load keys from [`CIPHER_MASTER_ENV`] and [`CIPHER_MASTER_PREVIOUS_ENV`].
    ///
    /// A missing master key yields an unconfigured ring; a present but
    /// invalid one is an error.
    pub fn from_env(cipher_id: &str) -> Result<Self, CryptoError> {
        let mut ring = match std::env::var(CIPHER_MASTER_ENV) {
            Ok(raw) if !raw.trim().is_empty() => Self::new(cipher_id, parse_master_key(&raw)?),
            _ => Self::unconfigured(cipher_id),
        };
        if let Ok(raw) = std::env::var(CIPHER_MASTER_PREVIOUS_ENV) {
            ring.retired = parse_retired_keys(&raw)?;
        }
        tracing::debug!(
            cipher_id,
            configured = ring.is_configured(),
            retired = ring.retired.len(),
            "loaded cipher keys"
        );
        Ok(ring)
    }

    /// Identifier of the active key generation.
    #[must_use]
    pub fn cipher_id(&self) -> &str {
        &self.cipher_id
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.current.is_some()
    }

    fn current(&self) -> Result<&MasterKey, CryptoError> {
        self.current.as_ref().ok_or(CryptoError::NotConfigured)
    }

    /// Encrypt under the active key.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        encrypt_envelope(plaintext, self.current()?)
    }

    /// Decrypt a ciphertext produced by the active key.
    pub fn decrypt(&self, ciphertext: &str) -> Result<SecretString, CryptoError> {
        decrypt_envelope(ciphertext, self.current()?)
    }

    /// Decrypt a ciphertext recorded alongside `cipher_id`.
    ///
    /// The id is checked before any decryption is attempted. Unknown ids fail
    /// with [`CryptoError::StaleCipherId`].
    pub fn decrypt_with(&self, cipher_id: &str, ciphertext: &str) -> Result<SecretString, CryptoError> {
        let current = self.current()?;
        if cipher_id == self.cipher_id {
            return decrypt_envelope(ciphertext, current);
        }
        match self.retired.iter().find(|(cid, _)| cid == cipher_id) {
            Some((_, key)) => decrypt_envelope(ciphertext, key),
            None => Err(CryptoError::StaleCipherId {
                cid: cipher_id.to_owned(),
            }),
        }
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field("cipher_id", &self.cipher_id)
            .field("configured", &self.current.is_some())
            .field(
                "retired",
                &self.retired.iter().map(|(cid, _)| cid).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Parse a `cid:key,cid:key` list of retired keys.
pub fn parse_retired_keys(raw: &str) -> Result<Vec<(String, MasterKey)>, CryptoError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (cid, key) = entry.split_once(':').ok_or_else(|| {
                CryptoError::InvalidKey(format!(
                    "retired key entry must be `cid:key`, got {} characters without a separator",
                    entry.len()
                ))
            })?;
            Ok((cid.trim().to_owned(), parse_master_key(key)?))
        })
        .collect()
}
