//! Token decryption and decrypt-time constraints.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rsa::Oaep;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;

use crate::alg::{ContentEncryptionAlg, KeyManagementAlg};
use crate::encrypt::{JwtPayload, CEK_LEN, IV_LEN, TAG_LEN};
use crate::error::JweError;
use crate::keys::DecryptionKey;

/// Constraints applied while decrypting.
///
/// `None` fields impose no constraint. [`DecryptOptions::merge`] combines a
/// configuration default with a call-site override, the override winning
/// field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecryptOptions {
    /// Allowed key management algorithms; `None` allows any supported one.
    pub key_management_algorithms: Option<Vec<KeyManagementAlg>>,
    /// Allowed content encryption algorithms; `None` allows any supported one.
    pub content_encryption_algorithms: Option<Vec<ContentEncryptionAlg>>,
}

impl DecryptOptions {
    /// Overlay `overrides` on `self`; fields present in `overrides` win.
    pub fn merge(&self, overrides: &DecryptOptions) -> DecryptOptions {
        DecryptOptions {
            key_management_algorithms: overrides
                .key_management_algorithms
                .clone()
                .or_else(|| self.key_management_algorithms.clone()),
            content_encryption_algorithms: overrides
                .content_encryption_algorithms
                .clone()
                .or_else(|| self.content_encryption_algorithms.clone()),
        }
    }
}

/// A successfully decrypted token.
#[derive(Debug, Clone)]
pub struct DecryptedJwt {
    /// The recovered payload, hook-added claims included.
    pub payload: JwtPayload,
    /// The protected header the token was sealed under.
    pub protected_header: Map<String, Value>,
}

/// Decrypt a JWE compact serialization.
///
/// # Errors
///
/// Returns [`JweError::InvalidToken`] if `token` is not JWE-shaped: wrong
/// segment count, undecodable base64url, malformed header or payload JSON.
/// Returns [`JweError::DecryptionFailed`] if the token parses but cannot be
/// opened with `key`: wrong key pair, tampered segments, or an algorithm
/// excluded by `options`.
pub fn decrypt_jwt(
    token: &str,
    key: &DecryptionKey,
    options: &DecryptOptions,
) -> Result<DecryptedJwt, JweError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 5 {
        return Err(JweError::InvalidToken(format!(
            "expected 5 segments, found {}",
            parts.len()
        )));
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(parts[0])
        .map_err(|_| JweError::InvalidToken("protected header is not valid base64url".into()))?;
    let header: Map<String, Value> = serde_json::from_slice(&header_bytes)
        .map_err(|_| JweError::InvalidToken("protected header is not a JSON object".into()))?;

    // One supported pair today; resolution validates names and allow-lists.
    resolve_key_management_alg(&header, options)?;
    resolve_content_encryption_alg(&header, options)?;

    let encrypted_key = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| JweError::InvalidToken("encrypted key is not valid base64url".into()))?;
    let iv = URL_SAFE_NO_PAD
        .decode(parts[2])
        .map_err(|_| JweError::InvalidToken("iv is not valid base64url".into()))?;
    if iv.len() != IV_LEN {
        return Err(JweError::InvalidToken(format!(
            "iv must be {IV_LEN} bytes, found {}",
            iv.len()
        )));
    }
    let ciphertext = URL_SAFE_NO_PAD
        .decode(parts[3])
        .map_err(|_| JweError::InvalidToken("ciphertext is not valid base64url".into()))?;
    let tag = URL_SAFE_NO_PAD
        .decode(parts[4])
        .map_err(|_| JweError::InvalidToken("tag is not valid base64url".into()))?;
    if tag.len() != TAG_LEN {
        return Err(JweError::InvalidToken(format!(
            "tag must be {TAG_LEN} bytes, found {}",
            tag.len()
        )));
    }

    let cek = key
        .0
        .decrypt(Oaep::new::<Sha256>(), &encrypted_key)
        .map_err(|_| JweError::DecryptionFailed("content key unwrap failed".into()))?;
    if cek.len() != CEK_LEN {
        return Err(JweError::DecryptionFailed(
            "unwrapped content key has unexpected length".into(),
        ));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&cek));
    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: &sealed,
                aad: parts[0].as_bytes(),
            },
        )
        .map_err(|_| JweError::DecryptionFailed("ciphertext authentication failed".into()))?;

    let payload: JwtPayload = serde_json::from_slice(&plaintext)
        .map_err(|_| JweError::InvalidToken("payload is not a JSON object".into()))?;

    Ok(DecryptedJwt {
        payload,
        protected_header: header,
    })
}

fn resolve_key_management_alg(
    header: &Map<String, Value>,
    options: &DecryptOptions,
) -> Result<KeyManagementAlg, JweError> {
    let name = header
        .get("alg")
        .and_then(Value::as_str)
        .ok_or_else(|| JweError::InvalidToken("protected header missing \"alg\"".into()))?;
    let alg = KeyManagementAlg::from_name(name).ok_or_else(|| {
        JweError::DecryptionFailed(format!("unsupported key management algorithm: {name}"))
    })?;
    if let Some(allowed) = &options.key_management_algorithms {
        if !allowed.contains(&alg) {
            return Err(JweError::DecryptionFailed(format!(
                "key management algorithm {name} is not allowed"
            )));
        }
    }
    Ok(alg)
}

fn resolve_content_encryption_alg(
    header: &Map<String, Value>,
    options: &DecryptOptions,
) -> Result<ContentEncryptionAlg, JweError> {
    let name = header
        .get("enc")
        .and_then(Value::as_str)
        .ok_or_else(|| JweError::InvalidToken("protected header missing \"enc\"".into()))?;
    let enc = ContentEncryptionAlg::from_name(name).ok_or_else(|| {
        JweError::DecryptionFailed(format!("unsupported content encryption algorithm: {name}"))
    })?;
    if let Some(allowed) = &options.content_encryption_algorithms {
        if !allowed.contains(&enc) {
            return Err(JweError::DecryptionFailed(format!(
                "content encryption algorithm {name} is not allowed"
            )));
        }
    }
    Ok(enc)
}
