use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{CryptoError, KeyRing};

/// A serialized value encrypted under one key generation.
///
/// `cid` names the generation that produced `payload`, so the value can be
/// sent back to the caller and decrypted on a later request even after the
/// active key has rotated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub cid: String,
    pub payload: String,
}

impl EncryptedPayload {
    /// Serialize `value` to JSON and encrypt it under the active key.
    pub fn encrypt<T: Serialize>(value: &T, keys: &KeyRing) -> Result<Self, CryptoError> {
        let plain = serde_json::to_string(value).map_err(|e| {
            CryptoError::EncryptionFailed(format!("JSON serialization failed: {e}"))
        })?;
        Ok(Self {
            cid: keys.cipher_id().to_owned(),
            payload: keys.encrypt(&plain)?,
        })
    }

    /// Decrypt and deserialize the original value.
    pub fn decrypt<T: DeserializeOwned>(&self, keys: &KeyRing) -> Result<T, CryptoError> {
        let plain = keys.decrypt_with(&self.cid, &self.payload)?;
        serde_json::from_str(plain.expose_secret())
            .map_err(|e| CryptoError::Malformed(format!("JSON parse failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::parse_master_key;

    fn ring(cid: &str, byte: &str) -> KeyRing {
        KeyRing::new(cid, parse_master_key(&byte.repeat(32)).unwrap())
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Tokens {
        access_token: String,
        refresh_token: Option<String>,
    }

    #[test]
    fn struct_roundtrip() {
        let keys = ring("1", "42");
        let tokens = Tokens {
            access_token: "at-123".into(),
            refresh_token: Some("rt-456".into()),
        };
        let encrypted = EncryptedPayload::encrypt(&tokens, &keys).unwrap();
        assert_eq!(encrypted.cid, "1");
        assert!(!encrypted.payload.contains("at-123"));
        let back: Tokens = encrypted.decrypt(&keys).unwrap();
        assert_eq!(back, tokens);
    }

    #[test]
    fn serializes_as_cid_and_payload() {
        let keys = ring("7", "42");
        let encrypted = EncryptedPayload::encrypt(&json!({"a": 1}), &keys).unwrap();
        let wire = serde_json::to_value(&encrypted).unwrap();
        assert_eq!(wire["cid"], "7");
        assert!(wire["payload"].is_string());
    }

    #[test]
    fn rotated_key_rejects_old_cid() {
        let encrypted = EncryptedPayload::encrypt(&json!("x"), &ring("1", "42")).unwrap();
        let err = encrypted
            .decrypt::<serde_json::Value>(&ring("2", "ab"))
            .unwrap_err();
        assert!(matches!(err, CryptoError::StaleCipherId { .. }));
    }

    #[test]
    fn unconfigured_ring_cannot_encrypt() {
        let err = EncryptedPayload::encrypt(&json!({}), &KeyRing::unconfigured("1")).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let keys = ring("1", "42");
        let encrypted = EncryptedPayload::encrypt(&json!([1, 2]), &keys).unwrap();
        let err = encrypted.decrypt::<Tokens>(&keys).unwrap_err();
        assert!(matches!(err, CryptoError::Malformed(_)));
    }
}
