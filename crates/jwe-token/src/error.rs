//! Errors produced by the token layer.

use thiserror::Error;

/// Errors raised while encrypting or decrypting a token.
///
/// [`JweError::DecryptionFailed`] and [`JweError::InvalidToken`] are distinct
/// so callers can tell a value that is not a token at all ("not ours") from a
/// token that cannot be decrypted with the configured key ("ours but wrong
/// key").
#[derive(Debug, Error)]
pub enum JweError {
    /// Token construction or encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The ciphertext could not be decrypted with the configured key: wrong
    /// key pair, tampered value, or an algorithm disallowed by the decrypt
    /// options.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// The value is not a well-formed JWE compact serialization.
    #[error("invalid JWE token: {0}")]
    InvalidToken(String),
}
