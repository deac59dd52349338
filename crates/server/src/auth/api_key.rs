use actionhub_crypto::{ExposeSecret, SecretString};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::error::ServerError;

type HmacSha512 = Hmac<Sha512>;

/// Environment variable holding the token signing secret.
pub const SECRET_ENV: &str = "ACTION_HUB_SECRET";

/// Mints and checks stateless API tokens of the form
/// `<nonce>/<hex HMAC-SHA512(secret, nonce)>`.
///
/// Without a secret every token is rejected.
pub struct ApiKeyAuthenticator {
    secret: Option<SecretString>,
}

impl ApiKeyAuthenticator {
    pub fn new(secret: Option<SecretString>) -> Self {
        Self {
            secret: secret.filter(|s| !s.expose_secret().is_empty()),
        }
    }

    /// Read the secret from [`SECRET_ENV`].
    pub fn from_env() -> Self {
        Self::new(std::env::var(SECRET_ENV).ok().map(SecretString::new))
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Mint a token for `nonce`.
    pub fn from_nonce(&self, nonce: &str) -> Result<String, ServerError> {
        let secret = self
            .secret
            .as_ref()
            .ok_or_else(|| ServerError::Config(format!("{SECRET_ENV} is not set")))?;
        Ok(format!("{nonce}/{}", digest(secret, nonce)))
    }

    /// Check `token` against the secret in constant time.
    ///
    /// Returns `false` for malformed tokens and whenever no secret is
    /// configured.
    pub fn validate(&self, token: &str) -> bool {
        let Some(secret) = &self.secret else {
            return false;
        };
        let Some((nonce, provided)) = token.rsplit_once('/') else {
            return false;
        };
        if nonce.is_empty() || provided.is_empty() {
            return false;
        }
        let expected = digest(secret, nonce);
        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }
}

impl std::fmt::Debug for ApiKeyAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuthenticator")
            .field("configured", &self.is_configured())
            .finish()
    }
}

fn digest(secret: &SecretString, nonce: &str) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC accepts any key size");
    mac.update(nonce.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> ApiKeyAuthenticator {
        ApiKeyAuthenticator::new(Some(SecretString::new("hub-secret".to_owned())))
    }

    #[test]
    fn minted_tokens_validate() {
        let auth = authenticator();
        for nonce in ["n", "a-much-longer-nonce", "with/slash"] {
            let token = auth.from_nonce(nonce).unwrap();
            assert!(auth.validate(&token), "{token}");
        }
    }

    #[test]
    fn token_layout() {
        let token = authenticator().from_nonce("abc").unwrap();
        let (nonce, digest) = token.split_once('/').unwrap();
        assert_eq!(nonce, "abc");
        assert_eq!(digest.len(), 128);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn any_digest_mutation_is_rejected() {
        let auth = authenticator();
        let token = auth.from_nonce("nonce").unwrap();
        let split = token.find('/').unwrap() + 1;
        for i in split..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(bytes).unwrap();
            assert!(!auth.validate(&mutated), "accepted mutation at {i}");
        }
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let auth = authenticator();
        let token = auth.from_nonce("nonce").unwrap();
        let digest = token.split_once('/').unwrap().1;

        assert!(!auth.validate(""));
        assert!(!auth.validate("no-separator"));
        assert!(!auth.validate("nonce/"));
        assert!(!auth.validate(&format!("/{digest}")));
        assert!(!auth.validate(&token[..token.len() - 1]));
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = authenticator().from_nonce("nonce").unwrap();
        let other = ApiKeyAuthenticator::new(Some(SecretString::new("other".to_owned())));
        assert!(!other.validate(&token));
    }

    #[test]
    fn fails_closed_without_secret() {
        let token = authenticator().from_nonce("nonce").unwrap();
        for auth in [
            ApiKeyAuthenticator::new(None),
            ApiKeyAuthenticator::new(Some(SecretString::new(String::new()))),
        ] {
            assert!(!auth.is_configured());
            assert!(!auth.validate(&token));
            assert!(matches!(auth.from_nonce("x"), Err(ServerError::Config(_))));
        }
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let text = format!("{:?}", authenticator());
        assert!(!text.contains("hub-secret"));
    }
}
