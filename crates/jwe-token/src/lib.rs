//! JWE compact token primitive used by `jwe-cookie-map`.
//!
//! Provides RSA-OAEP-256 key pairs, a chainable [`EncryptJwt`] builder that
//! produces RFC 7516 compact serializations with A256GCM content encryption,
//! and [`decrypt_jwt`] with per-call [`DecryptOptions`].

pub mod alg;
pub mod decrypt;
pub mod encrypt;
pub mod error;
pub mod keys;

pub use alg::{ContentEncryptionAlg, KeyManagementAlg};
pub use decrypt::{decrypt_jwt, DecryptOptions, DecryptedJwt};
pub use encrypt::{EncryptJwt, JwtPayload};
pub use error::JweError;
pub use keys::{generate_key_pair, DecryptionKey, EncryptionKey, KeyError, KeyPair};
