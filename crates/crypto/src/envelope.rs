use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64URL;
use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::{CryptoError, MasterKey};

/// Leading tag of every envelope produced by this crate.
pub const ENVELOPE_VERSION: char = '1';

const LENGTH_DIGITS: usize = 3;
const HEADER_LEN: usize = 1 + 2 * LENGTH_DIGITS;
const IV_LEN: usize = 12;
const DATA_KEY_LEN: usize = 32;

/// Encrypt `plaintext` under a fresh data key wrapped by `master_key`.
///
/// Two calls with the same input never produce the same output.
pub fn encrypt_envelope(plaintext: &str, master_key: &MasterKey) -> Result<String, CryptoError> {
    let mut data_key = Zeroizing::new([0u8; DATA_KEY_LEN]);
    data_key.copy_from_slice(&Aes256Gcm::generate_key(&mut OsRng));
    let iv = Aes256Gcm::generate_nonce(&mut OsRng);

    let data_cipher = Aes256Gcm::new_from_slice(data_key.as_slice())
        .map_err(|e| CryptoError::EncryptionFailed(format!("invalid data key: {e}")))?;
    let ciphertext = data_cipher
        .encrypt(&iv, plaintext.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let master_cipher = Aes256Gcm::new_from_slice(master_key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(format!("invalid AES key: {e}")))?;
    let wrapped_key = master_cipher
        .encrypt(&iv, data_key.as_slice())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let iv_b64 = B64URL.encode(iv.as_slice());
    let key_b64 = B64URL.encode(&wrapped_key);

    Ok(format!(
        "{ENVELOPE_VERSION}{:03}{:03}{iv_b64}{key_b64}{}",
        key_b64.len(),
        iv_b64.len(),
        B64URL.encode(&ciphertext),
    ))
}

/// Reverse [`encrypt_envelope`]: unwrap the data key with `master_key`, then
/// decrypt the payload with it.
pub fn decrypt_envelope(envelope: &str, master_key: &MasterKey) -> Result<SecretString, CryptoError> {
    let (iv, wrapped_key, ciphertext) = split_envelope(envelope)?;

    let iv = decode_field(iv, "iv")?;
    if iv.len() != IV_LEN {
        return Err(CryptoError::Malformed(format!(
            "IV must be {IV_LEN} bytes, got {}",
            iv.len()
        )));
    }
    let nonce = Nonce::from_slice(&iv);
    let wrapped_key = decode_field(wrapped_key, "wrapped key")?;
    let ciphertext = decode_field(ciphertext, "ciphertext")?;

    let master_cipher = Aes256Gcm::new_from_slice(master_key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(format!("invalid AES key: {e}")))?;
    let data_key = Zeroizing::new(
        master_cipher
            .decrypt(nonce, wrapped_key.as_slice())
            .map_err(|_| CryptoError::DecryptionFailed)?,
    );
    if data_key.len() != DATA_KEY_LEN {
        return Err(CryptoError::DecryptionFailed);
    }

    let data_cipher =
        Aes256Gcm::new_from_slice(data_key.as_slice()).map_err(|_| CryptoError::DecryptionFailed)?;
    let plaintext = data_cipher
        .decrypt(nonce, ciphertext.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)?;

    let s = String::from_utf8(plaintext)
        .map_err(|e| CryptoError::Malformed(format!("decrypted value is not UTF-8: {e}")))?;
    Ok(SecretString::new(s))
}

/// Split an envelope into its iv, wrapped key, and ciphertext fields using
/// the declared lengths.
fn split_envelope(envelope: &str) -> Result<(&str, &str, &str), CryptoError> {
    let header = envelope
        .get(..HEADER_LEN)
        .ok_or_else(|| CryptoError::Malformed("envelope is too short".into()))?;
    if !header.is_ascii() {
        return Err(CryptoError::Malformed("envelope header is not ASCII".into()));
    }
    if !header.starts_with(ENVELOPE_VERSION) {
        return Err(CryptoError::Malformed(format!(
            "unsupported envelope version {:?}",
            header.chars().next().unwrap_or_default()
        )));
    }
    let key_len = parse_length(&header[1..=LENGTH_DIGITS])?;
    let iv_len = parse_length(&header[1 + LENGTH_DIGITS..])?;

    let body = &envelope[HEADER_LEN..];
    let iv = body
        .get(..iv_len)
        .ok_or_else(|| CryptoError::Malformed("iv field is truncated".into()))?;
    let wrapped_key = body
        .get(iv_len..iv_len + key_len)
        .ok_or_else(|| CryptoError::Malformed("wrapped key field is truncated".into()))?;
    let ciphertext = &body[iv_len + key_len..];
    Ok((iv, wrapped_key, ciphertext))
}

fn parse_length(digits: &str) -> Result<usize, CryptoError> {
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CryptoError::Malformed(format!(
            "field length {digits:?} is not a number"
        )));
    }
    digits
        .parse()
        .map_err(|_| CryptoError::Malformed(format!("field length {digits:?} is not a number")))
}

fn decode_field(field: &str, name: &str) -> Result<Vec<u8>, CryptoError> {
    B64URL
        .decode(field)
        .map_err(|e| CryptoError::Malformed(format!("invalid base64 in {name}: {e}")))
}
