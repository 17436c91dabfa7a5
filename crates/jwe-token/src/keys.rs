//! RSA key pairs for the fixed RSA-OAEP-256 key management algorithm.
//!
//! Keys are generated in-process and held in memory only; persistence is the
//! caller's choice via the PEM import/export helpers. A pair is never
//! validated against its partner at construction; a mismatched pair shows up
//! as a decryption failure, not here.

use rsa::{
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding},
    RsaPrivateKey, RsaPublicKey,
};
use thiserror::Error;
use tracing::debug;

/// RSA modulus size (bits) of generated key pairs.
pub const KEY_BITS: usize = 2048;

/// Errors produced by the key layer.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The underlying primitive could not produce a key pair. Environmental;
    /// never retried.
    #[error("key pair generation failed: {0}")]
    Generation(String),

    /// PEM material could not be parsed or encoded as a key of the expected
    /// type.
    #[error("invalid key material: {0}")]
    InvalidMaterial(String),
}

/// Public half of a key pair. Encrypts the per-token content key.
#[derive(Clone, PartialEq)]
pub struct EncryptionKey(pub(crate) RsaPublicKey);

impl EncryptionKey {
    /// Parse a PEM-encoded SPKI public key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidMaterial`] if the PEM does not contain an
    /// RSA public key.
    pub fn from_public_key_pem(pem: &str) -> Result<Self, KeyError> {
        RsaPublicKey::from_public_key_pem(pem)
            .map(Self)
            .map_err(|e| KeyError::InvalidMaterial(e.to_string()))
    }

    /// Encode this key as PEM (SPKI).
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidMaterial`] if DER encoding fails.
    pub fn to_public_key_pem(&self) -> Result<String, KeyError> {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeyError::InvalidMaterial(e.to_string()))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(rsa)")
    }
}

/// Private half of a key pair. Decrypts the per-token content key.
#[derive(Clone)]
pub struct DecryptionKey(pub(crate) RsaPrivateKey);

impl DecryptionKey {
    /// Parse a PEM-encoded PKCS#8 private key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidMaterial`] if the PEM does not contain an
    /// RSA private key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, KeyError> {
        RsaPrivateKey::from_pkcs8_pem(pem)
            .map(Self)
            .map_err(|e| KeyError::InvalidMaterial(e.to_string()))
    }

    /// Encode this key as PEM (PKCS#8).
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidMaterial`] if DER encoding fails.
    pub fn to_pkcs8_pem(&self) -> Result<String, KeyError> {
        self.0
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.as_str().to_owned())
            .map_err(|e| KeyError::InvalidMaterial(e.to_string()))
    }

    /// Derive the matching public half.
    pub fn public_key(&self) -> EncryptionKey {
        EncryptionKey(RsaPublicKey::from(&self.0))
    }
}

impl std::fmt::Debug for DecryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print private key material — not even in debug builds.
        f.write_str("DecryptionKey([REDACTED])")
    }
}

/// An asymmetric key pair bound to RSA-OAEP-256.
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// Decrypts tokens; keep server-side.
    pub private_key: DecryptionKey,
    /// Encrypts tokens.
    pub public_key: EncryptionKey,
}

/// Generate a fresh [`KEY_BITS`]-bit key pair.
///
/// Key generation is the one genuinely slow operation in this crate, so it
/// runs on the blocking pool.
///
/// # Errors
///
/// Returns [`KeyError::Generation`] if the primitive cannot produce a key,
/// treated as fatal/environmental.
pub async fn generate_key_pair() -> Result<KeyPair, KeyError> {
    let private = tokio::task::spawn_blocking(|| {
        let mut rng = rand::thread_rng();
        RsaPrivateKey::new(&mut rng, KEY_BITS)
    })
    .await
    .map_err(|e| KeyError::Generation(e.to_string()))?
    .map_err(|e| KeyError::Generation(e.to_string()))?;

    let public = RsaPublicKey::from(&private);
    debug!(bits = KEY_BITS, "generated RSA key pair");

    Ok(KeyPair {
        private_key: DecryptionKey(private),
        public_key: EncryptionKey(public),
    })
}
