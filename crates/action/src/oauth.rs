//! Helpers for actions that round-trip OAuth tokens through the caller.
//!
//! Tokens are handed back to the caller as `state_json` and return on the
//! next request. When encryption is enabled for an action they travel as an
//! [`EncryptedPayload`], otherwise as plain JSON.

use actionhub_crypto::{EncryptedPayload, KeyRing};
use serde::Serialize;
use tracing::{error, info};

use crate::error::ActionError;

/// Token state ready to hand back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OAuthState {
    Encrypted(EncryptedPayload),
    Plain(String),
}

/// Name of the per-action switch, e.g. `ENCRYPT_PAYLOAD_GOOGLE_DRIVE`.
#[must_use]
pub fn encryption_env_var(action_name: &str) -> String {
    format!("ENCRYPT_PAYLOAD_{}", action_name.to_uppercase())
}

/// Whether `ENCRYPT_PAYLOAD_<NAME>` is set to `true` for this action.
#[must_use]
pub fn encryption_enabled(action_name: &str) -> bool {
    std::env::var(encryption_env_var(action_name)).is_ok_and(|v| v == "true")
}

/// Encrypt `tokens` when the action's encryption switch is on, otherwise
/// serialize them as plain JSON.
pub fn maybe_encrypt_tokens<T: Serialize>(
    action_name: &str,
    tokens: &T,
    keys: &KeyRing,
    webhook_id: Option<&str>,
) -> Result<OAuthState, ActionError> {
    encode_tokens(encryption_enabled(action_name), action_name, tokens, keys, webhook_id)
}

fn encode_tokens<T: Serialize>(
    encrypt: bool,
    action_name: &str,
    tokens: &T,
    keys: &KeyRing,
    webhook_id: Option<&str>,
) -> Result<OAuthState, ActionError> {
    if !encrypt {
        let plain = serde_json::to_string(tokens)
            .map_err(|e| ActionError::Configuration(format!("tokens are not serializable: {e}")))?;
        return Ok(OAuthState::Plain(plain));
    }
    EncryptedPayload::encrypt(tokens, keys)
        .map(OAuthState::Encrypted)
        .map_err(|e| {
            error!(webhook_id, action = action_name, error = %e, "encryption not correctly configured");
            ActionError::Crypto(e)
        })
}

/// Recover token state sent back by the caller.
///
/// Accepts either an encrypted `{cid, payload}` envelope or plain JSON.
/// Parse and decrypt failures are logged and yield `None`.
pub fn extract_tokens_from_state_json(
    action_name: &str,
    state_json: &str,
    keys: &KeyRing,
    webhook_id: Option<&str>,
) -> Option<serde_json::Value> {
    let state: serde_json::Value = match serde_json::from_str(state_json) {
        Ok(state) => state,
        Err(_) => {
            error!(webhook_id, action = action_name, "failed to parse state_json");
            return None;
        }
    };

    let envelope = match (state.get("cid"), state.get("payload")) {
        (Some(serde_json::Value::String(cid)), Some(serde_json::Value::String(payload))) => {
            EncryptedPayload {
                cid: cid.clone(),
                payload: payload.clone(),
            }
        }
        _ => {
            info!(webhook_id, action = action_name, "extracting unencrypted state_json");
            return Some(state);
        }
    };

    info!(webhook_id, action = action_name, "extracting encrypted state_json");
    match envelope.decrypt(keys) {
        Ok(tokens) => Some(tokens),
        Err(e) => {
            error!(
                webhook_id,
                action = action_name,
                error = %e,
                "failed to decrypt or parse encrypted payload"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use actionhub_crypto::parse_master_key;
    use serde_json::json;

    use super::*;

    fn keys() -> KeyRing {
        KeyRing::new("1", parse_master_key(&"42".repeat(32)).unwrap())
    }

    #[test]
    fn env_var_name_is_uppercased() {
        assert_eq!(
            encryption_env_var("salesforce_campaigns"),
            "ENCRYPT_PAYLOAD_SALESFORCE_CAMPAIGNS"
        );
    }

    #[test]
    fn plain_tokens_are_json() {
        let tokens = json!({"access_token": "at"});
        let state = encode_tokens(false, "drive", &tokens, &keys(), None).unwrap();
        assert_eq!(state, OAuthState::Plain(r#"{"access_token":"at"}"#.into()));
    }

    #[test]
    fn encrypted_tokens_roundtrip_through_state_json() {
        let keys = keys();
        let tokens = json!({"access_token": "at", "refresh_token": "rt"});
        let state = encode_tokens(true, "drive", &tokens, &keys, Some("wh-1")).unwrap();
        let OAuthState::Encrypted(ref payload) = state else {
            panic!("expected encrypted state");
        };
        assert_eq!(payload.cid, "1");

        let state_json = serde_json::to_string(&state).unwrap();
        let back = extract_tokens_from_state_json("drive", &state_json, &keys, Some("wh-1"));
        assert_eq!(back, Some(tokens));
    }

    #[test]
    fn encryption_without_key_is_an_error() {
        let err = encode_tokens(true, "drive", &json!({}), &KeyRing::unconfigured("1"), None)
            .unwrap_err();
        assert!(matches!(err, ActionError::Crypto(_)));
    }

    #[test]
    fn plain_state_json_is_returned_as_is() {
        let back = extract_tokens_from_state_json("drive", r#"{"tokens": {"a": 1}}"#, &keys(), None);
        assert_eq!(back, Some(json!({"tokens": {"a": 1}})));
    }

    #[test]
    fn unparseable_state_json_is_none() {
        assert_eq!(extract_tokens_from_state_json("drive", "{oops", &keys(), None), None);
    }

    #[test]
    fn undecryptable_state_json_is_none() {
        let state_json = r#"{"cid": "1", "payload": "1064016garbage"}"#;
        assert_eq!(extract_tokens_from_state_json("drive", state_json, &keys(), None), None);
    }
}
