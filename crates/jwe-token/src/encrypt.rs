//! Chainable encrypted-JWT builder producing JWE compact serializations.
//!
//! A token is five base64url segments joined by dots:
//! `<protected header>.<encrypted key>.<iv>.<ciphertext>.<tag>`. The content
//! encryption key is random per token, wrapped with RSA-OAEP-256; the payload
//! is sealed with A256GCM using the encoded protected header as additional
//! authenticated data.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rsa::Oaep;
use serde_json::{Map, Value};
use sha2::Sha256;

use crate::alg::{ContentEncryptionAlg, KeyManagementAlg};
use crate::error::JweError;
use crate::keys::EncryptionKey;

/// Byte length of the A256GCM content encryption key.
pub const CEK_LEN: usize = 32;

/// Byte length of the A256GCM initialisation vector (96 bits).
pub const IV_LEN: usize = 12;

/// Byte length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// JSON object carried as the token payload. Reserved claim names (`iat`,
/// `exp`, ...) live alongside caller keys.
pub type JwtPayload = Map<String, Value>;

/// Builder for an encrypted JWT.
///
/// Claim- and header-setting calls consume and return the builder so they can
/// be chained; [`EncryptJwt::encrypt`] is the terminal operation.
#[derive(Debug, Clone)]
pub struct EncryptJwt {
    payload: JwtPayload,
    protected_header: Map<String, Value>,
}

impl EncryptJwt {
    /// Start a token from a caller payload. The protected header starts
    /// empty; encryption fails unless a hook (or the caller) sets it.
    pub fn new(payload: JwtPayload) -> Self {
        Self {
            payload,
            protected_header: Map::new(),
        }
    }

    /// Replace the protected header with `{"alg": ..., "enc": ...}`.
    pub fn set_protected_header(
        mut self,
        alg: KeyManagementAlg,
        enc: ContentEncryptionAlg,
    ) -> Self {
        let mut header = Map::new();
        header.insert("alg".into(), Value::String(alg.name().into()));
        header.insert("enc".into(), Value::String(enc.name().into()));
        self.protected_header = header;
        self
    }

    /// Add or replace a single protected header parameter.
    pub fn protected_header_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.protected_header.insert(name.into(), value);
        self
    }

    /// Add or replace an arbitrary payload claim.
    pub fn claim(mut self, name: impl Into<String>, value: Value) -> Self {
        self.payload.insert(name.into(), value);
        self
    }

    /// Set the `iat` (issued-at) claim.
    pub fn set_issued_at(self, timestamp: i64) -> Self {
        self.claim("iat", timestamp.into())
    }

    /// Set the `exp` (expiration) claim.
    pub fn set_expiration(self, timestamp: i64) -> Self {
        self.claim("exp", timestamp.into())
    }

    /// Set the `nbf` (not-before) claim.
    pub fn set_not_before(self, timestamp: i64) -> Self {
        self.claim("nbf", timestamp.into())
    }

    /// Set the `sub` (subject) claim.
    pub fn set_subject(self, subject: impl Into<String>) -> Self {
        self.claim("sub", Value::String(subject.into()))
    }

    /// Set the `iss` (issuer) claim.
    pub fn set_issuer(self, issuer: impl Into<String>) -> Self {
        self.claim("iss", Value::String(issuer.into()))
    }

    /// Set the `aud` (audience) claim.
    pub fn set_audience(self, audience: impl Into<String>) -> Self {
        self.claim("aud", Value::String(audience.into()))
    }

    /// Set the `jti` (token identifier) claim.
    pub fn set_jti(self, jti: impl Into<String>) -> Self {
        self.claim("jti", Value::String(jti.into()))
    }

    /// Encrypt the token with `key`, producing the compact serialization.
    ///
    /// # Errors
    ///
    /// Returns [`JweError::Encryption`] if the protected header is missing or
    /// names an unsupported algorithm, or if the key wrap / AEAD seal fails.
    pub fn encrypt(&self, key: &EncryptionKey) -> Result<String, JweError> {
        let alg_name = self
            .protected_header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| JweError::Encryption("protected header missing \"alg\"".into()))?;
        KeyManagementAlg::from_name(alg_name).ok_or_else(|| {
            JweError::Encryption(format!("unsupported key management algorithm: {alg_name}"))
        })?;

        let enc_name = self
            .protected_header
            .get("enc")
            .and_then(Value::as_str)
            .ok_or_else(|| JweError::Encryption("protected header missing \"enc\"".into()))?;
        ContentEncryptionAlg::from_name(enc_name).ok_or_else(|| {
            JweError::Encryption(format!("unsupported content encryption algorithm: {enc_name}"))
        })?;

        let header_json = serde_json::to_vec(&self.protected_header)
            .map_err(|e| JweError::Encryption(format!("protected header not serialisable: {e}")))?;
        let header_b64 = URL_SAFE_NO_PAD.encode(header_json);

        let payload_json = serde_json::to_vec(&self.payload)
            .map_err(|e| JweError::Encryption(format!("payload not serialisable: {e}")))?;

        // Fresh CEK and IV per token, from the OS CSPRNG.
        use aes_gcm::aead::rand_core::RngCore;
        let mut cek = [0u8; CEK_LEN];
        OsRng.fill_bytes(&mut cek);
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut rng = rand::thread_rng();
        let encrypted_key = key
            .0
            .encrypt(&mut rng, Oaep::new::<Sha256>(), &cek)
            .map_err(|e| JweError::Encryption(format!("content key wrap failed: {e}")))?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&cek));
        let mut sealed = cipher
            .encrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &payload_json,
                    aad: header_b64.as_bytes(),
                },
            )
            .map_err(|_| JweError::Encryption("content encryption failed".into()))?;
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(format!(
            "{}.{}.{}.{}.{}",
            header_b64,
            URL_SAFE_NO_PAD.encode(encrypted_key),
            URL_SAFE_NO_PAD.encode(iv),
            URL_SAFE_NO_PAD.encode(sealed),
            URL_SAFE_NO_PAD.encode(tag),
        ))
    }
}
