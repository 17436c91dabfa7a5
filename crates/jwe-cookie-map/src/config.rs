//! Configuration shared by encrypted cookie maps: the key pair, default
//! cookie attributes, the pre-encryption hook, and default decrypt options.

use std::sync::Arc;

use jwe_token::{
    generate_key_pair, ContentEncryptionAlg, DecryptOptions, DecryptionKey, EncryptJwt,
    EncryptionKey, KeyError, KeyManagementAlg, KeyPair,
};
use tokio::sync::OnceCell;
use tracing::info;

use crate::options::SetCookieOptions;

/// Transformation applied to a fresh token builder before encryption.
///
/// Stored on the configuration and optionally composed with a call-site hook
/// (configuration hook first, call-site hook second).
pub type EncryptHook = Arc<dyn Fn(EncryptJwt) -> EncryptJwt + Send + Sync>;

/// The hook used when none is supplied: sets the protected header for the
/// fixed RSA-OAEP-256 / A256GCM pair, matching generated key pairs.
pub fn default_encrypt_hook() -> EncryptHook {
    Arc::new(|jwt| {
        jwt.set_protected_header(KeyManagementAlg::RsaOaep256, ContentEncryptionAlg::A256Gcm)
    })
}

/// Keys and defaults backing one or more [`JweCookieMap`]s.
///
/// Fields are public: a uniquely-owned configuration may be adjusted freely
/// before it is shared. Maps hold it behind an [`Arc`], so a shared
/// configuration is read-only from then on.
///
/// Keys are never validated against each other at construction; a mismatched
/// pair surfaces as a decryption failure on first use.
///
/// [`JweCookieMap`]: crate::map::JweCookieMap
pub struct JweCookieConfiguration {
    /// Decrypts stored cookie values.
    pub private_key: DecryptionKey,
    /// Encrypts staged cookie values.
    pub public_key: EncryptionKey,
    /// Attributes applied to encrypted cookies unless overridden per call.
    pub default_cookie_options: SetCookieOptions,
    /// Applied to every token builder before encryption.
    pub encrypt_hook: EncryptHook,
    /// Decrypt constraints merged under any call-site override.
    pub decrypt_options: DecryptOptions,
}

impl JweCookieConfiguration {
    /// Configuration with the default hook, no decrypt constraints, and no
    /// default cookie attributes.
    pub fn new(private_key: DecryptionKey, public_key: EncryptionKey) -> Self {
        Self {
            private_key,
            public_key,
            default_cookie_options: SetCookieOptions::default(),
            encrypt_hook: default_encrypt_hook(),
            decrypt_options: DecryptOptions::default(),
        }
    }

    /// Configuration owning both halves of `pair`.
    pub fn from_key_pair(pair: KeyPair) -> Self {
        Self::new(pair.private_key, pair.public_key)
    }

    /// Replace the default cookie attributes.
    pub fn with_cookie_options(mut self, options: SetCookieOptions) -> Self {
        self.default_cookie_options = options;
        self
    }

    /// Replace the pre-encryption hook.
    pub fn with_encrypt_hook(mut self, hook: EncryptHook) -> Self {
        self.encrypt_hook = hook;
        self
    }

    /// Replace the default decrypt options.
    pub fn with_decrypt_options(mut self, options: DecryptOptions) -> Self {
        self.decrypt_options = options;
        self
    }
}

impl std::fmt::Debug for JweCookieConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JweCookieConfiguration")
            .field("private_key", &self.private_key)
            .field("public_key", &self.public_key)
            .field("default_cookie_options", &self.default_cookie_options)
            .field("encrypt_hook", &"<hook>")
            .field("decrypt_options", &self.decrypt_options)
            .finish()
    }
}

/// Generate a fresh key pair and wrap it in a configuration with all other
/// values defaulted.
///
/// # Errors
///
/// Returns [`KeyError::Generation`] if key generation fails.
pub async fn configuration_with_new_key_pair() -> Result<JweCookieConfiguration, KeyError> {
    let pair = generate_key_pair().await?;
    Ok(JweCookieConfiguration::from_key_pair(pair))
}

static DEFAULT_CONFIGURATION: OnceCell<Arc<JweCookieConfiguration>> = OnceCell::const_new();

/// The process-wide default configuration.
///
/// Created once, lazily, on first use, with a freshly generated key pair that
/// is not persisted between executions. Callers wanting stable cookies across
/// restarts should construct their own configuration from loaded keys and
/// pass it explicitly.
///
/// # Errors
///
/// Returns [`KeyError::Generation`] if the one-time key generation fails; the
/// failure is not cached and a later call retries.
pub async fn default_configuration() -> Result<Arc<JweCookieConfiguration>, KeyError> {
    DEFAULT_CONFIGURATION
        .get_or_try_init(|| async {
            info!("generating key pair for the default cookie configuration");
            let configuration = configuration_with_new_key_pair().await?;
            Ok(Arc::new(configuration))
        })
        .await
        .map(Arc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_configuration_is_created_once() {
        let first = default_configuration().await.unwrap();
        let second = default_configuration().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn new_key_pair_configurations_are_distinct() {
        let a = configuration_with_new_key_pair().await.unwrap();
        let b = configuration_with_new_key_pair().await.unwrap();
        assert_ne!(a.public_key, b.public_key);
    }

    #[tokio::test]
    async fn builder_refiners_replace_fields() {
        let configuration = configuration_with_new_key_pair()
            .await
            .unwrap()
            .with_cookie_options(SetCookieOptions::new().secure(true))
            .with_decrypt_options(DecryptOptions {
                key_management_algorithms: Some(vec![KeyManagementAlg::RsaOaep256]),
                content_encryption_algorithms: None,
            });

        assert_eq!(configuration.default_cookie_options.secure, Some(true));
        assert_eq!(
            configuration.decrypt_options.key_management_algorithms,
            Some(vec![KeyManagementAlg::RsaOaep256])
        );
    }

    #[tokio::test]
    async fn debug_never_prints_key_material() {
        let configuration = configuration_with_new_key_pair().await.unwrap();
        let printed = format!("{configuration:?}");
        assert!(printed.contains("REDACTED"));
        assert!(printed.contains("<hook>"));
    }
}
