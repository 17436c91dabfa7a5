//! JWE algorithm identifiers.
//!
//! The token layer is fixed to one key management algorithm and one content
//! encryption scheme. The enums exist so decrypt-time allow-lists match on
//! typed values rather than raw header strings.

use serde::{Deserialize, Serialize};

/// JWE key management algorithm (RFC 7518 §4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyManagementAlg {
    /// RSAES OAEP using SHA-256 and MGF1 with SHA-256.
    #[serde(rename = "RSA-OAEP-256")]
    RsaOaep256,
}

impl KeyManagementAlg {
    /// Registered algorithm name as it appears in the protected header.
    pub fn name(&self) -> &'static str {
        match self {
            KeyManagementAlg::RsaOaep256 => "RSA-OAEP-256",
        }
    }

    /// Look up an algorithm by its registered name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RSA-OAEP-256" => Some(KeyManagementAlg::RsaOaep256),
            _ => None,
        }
    }
}

/// JWE content encryption algorithm (RFC 7518 §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentEncryptionAlg {
    /// AES-256 in Galois/Counter Mode.
    #[serde(rename = "A256GCM")]
    A256Gcm,
}

impl ContentEncryptionAlg {
    /// Registered algorithm name as it appears in the protected header.
    pub fn name(&self) -> &'static str {
        match self {
            ContentEncryptionAlg::A256Gcm => "A256GCM",
        }
    }

    /// Look up an algorithm by its registered name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "A256GCM" => Some(ContentEncryptionAlg::A256Gcm),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        let alg = KeyManagementAlg::RsaOaep256;
        assert_eq!(KeyManagementAlg::from_name(alg.name()), Some(alg));

        let enc = ContentEncryptionAlg::A256Gcm;
        assert_eq!(ContentEncryptionAlg::from_name(enc.name()), Some(enc));
    }

    #[test]
    fn unknown_names_rejected() {
        assert_eq!(KeyManagementAlg::from_name("RSA1_5"), None);
        assert_eq!(ContentEncryptionAlg::from_name("A128CBC-HS256"), None);
    }

    #[test]
    fn serde_uses_registered_names() {
        let json = serde_json::to_string(&KeyManagementAlg::RsaOaep256).unwrap();
        assert_eq!(json, "\"RSA-OAEP-256\"");
        let json = serde_json::to_string(&ContentEncryptionAlg::A256Gcm).unwrap();
        assert_eq!(json, "\"A256GCM\"");
    }
}
