//! The encrypted cookie map: a map-like façade over a plaintext cookie
//! collection that adds encrypt-on-set and decrypt-on-get operations.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use http::HeaderMap;
use jwe_token::{decrypt_jwt, DecryptOptions, EncryptJwt, JweError, JwtPayload, KeyError};
use tracing::warn;

use crate::config::{
    configuration_with_new_key_pair, default_configuration, EncryptHook, JweCookieConfiguration,
};
use crate::options::SetCookieOptions;
use crate::store::{CookieMap, CookieStore};

/// Manages encrypted cookies for one request/response cycle.
///
/// Plain `get`/`set`/`entries` delegate unchanged to the wrapped store; the
/// encrypted operations run values through the configuration's key pair and
/// hooks. The configuration is shared, not owned; many maps may reference
/// the same one.
#[derive(Debug)]
pub struct JweCookieMap<S: CookieStore = CookieMap> {
    store: S,
    configuration: Arc<JweCookieConfiguration>,
}

impl JweCookieMap<CookieMap> {
    /// Bind a map to `headers` using the process-wide default configuration,
    /// created on first use (see
    /// [`default_configuration`](crate::config::default_configuration)).
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Generation`] if the default configuration's
    /// one-time key generation fails.
    pub async fn new(headers: &HeaderMap) -> Result<Self, KeyError> {
        Ok(Self::with_configuration(
            headers,
            default_configuration().await?,
        ))
    }

    /// Bind a map to `headers` with an explicit configuration.
    pub fn with_configuration(
        headers: &HeaderMap,
        configuration: Arc<JweCookieConfiguration>,
    ) -> Self {
        Self {
            store: CookieMap::new(headers),
            configuration,
        }
    }

    /// Serialized `Set-Cookie` values for every staged mutation.
    pub fn set_cookie_values(&self) -> Vec<String> {
        self.store.set_cookie_values()
    }

    /// Append staged mutations to `headers` as `Set-Cookie` entries.
    pub fn write_response(&self, headers: &mut HeaderMap) {
        self.store.write_response(headers);
    }
}

impl<S: CookieStore> JweCookieMap<S> {
    /// Wrap an arbitrary store. Tests substitute in-memory stores here.
    pub fn from_store(store: S, configuration: Arc<JweCookieConfiguration>) -> Self {
        Self {
            store,
            configuration,
        }
    }

    /// The shared configuration backing this map.
    pub fn configuration(&self) -> &Arc<JweCookieConfiguration> {
        &self.configuration
    }

    /// The wrapped plaintext store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Plain read, delegated unchanged.
    pub fn get(&self, name: &str) -> Option<String> {
        self.store.get(name)
    }

    /// Plain write, delegated unchanged. No option merging happens here;
    /// configuration defaults apply only to the encrypted path.
    pub fn set(&mut self, name: &str, value: &str, options: Option<&SetCookieOptions>) {
        self.store.set(name, value, options);
    }

    /// Every visible entry, delegated unchanged. Encrypted values appear in
    /// serialized form.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.store.entries()
    }

    /// Encrypt `payload` and stage it under `name` with the configuration's
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`JweError::Encryption`] if token construction or encryption
    /// fails; nothing is staged in that case.
    pub async fn set_encrypted(&mut self, name: &str, payload: JwtPayload) -> Result<(), JweError> {
        self.set_encrypted_with(name, payload, None, None).await
    }

    /// [`set_encrypted`](Self::set_encrypted) with call-site overrides.
    ///
    /// `options` are overlaid on the configuration's default cookie options,
    /// call-site attributes winning. `encrypt_hook` is applied *after* the
    /// configuration hook, so a call site can add claims without restating
    /// the protocol header.
    ///
    /// # Errors
    ///
    /// Returns [`JweError::Encryption`] if token construction or encryption
    /// fails; nothing is staged in that case.
    pub async fn set_encrypted_with(
        &mut self,
        name: &str,
        payload: JwtPayload,
        options: Option<&SetCookieOptions>,
        encrypt_hook: Option<&EncryptHook>,
    ) -> Result<(), JweError> {
        let token = self.encrypt_payload(payload, encrypt_hook)?;
        let merged = self.merge_cookie_options(options);
        self.store.set(name, &token, Some(&merged));
        Ok(())
    }

    /// Read and decrypt the cookie stored under `name` with the
    /// configuration's decrypt options.
    ///
    /// # Errors
    ///
    /// Returns [`JweError::DecryptionFailed`] for a value sealed under a
    /// different key pair or tampered with, and [`JweError::InvalidToken`]
    /// for a value that is not a JWE at all. An absent cookie is `Ok(None)`,
    /// never an error.
    pub async fn get_decrypted(&self, name: &str) -> Result<Option<JwtPayload>, JweError> {
        self.get_decrypted_with(name, None).await
    }

    /// [`get_decrypted`](Self::get_decrypted) with call-site decrypt options,
    /// merged over the configuration's defaults (call-site fields win).
    ///
    /// # Errors
    ///
    /// As [`get_decrypted`](Self::get_decrypted).
    pub async fn get_decrypted_with(
        &self,
        name: &str,
        options: Option<&DecryptOptions>,
    ) -> Result<Option<JwtPayload>, JweError> {
        let Some(value) = self.store.get(name) else {
            return Ok(None);
        };
        let merged = match options {
            Some(options) => self.configuration.decrypt_options.merge(options),
            None => self.configuration.decrypt_options.clone(),
        };
        let jwt = decrypt_jwt(&value, &self.configuration.private_key, &merged).map_err(|e| {
            warn!(cookie = name, error = %e, "cookie decryption failed");
            e
        })?;
        Ok(Some(jwt.payload))
    }

    /// Decrypt every visible entry.
    ///
    /// All-or-nothing: the first entry that fails to decrypt fails the whole
    /// call. There is no partial-success mode.
    ///
    /// # Errors
    ///
    /// The first [`JweError`] encountered, as for
    /// [`get_decrypted`](Self::get_decrypted).
    pub async fn decrypted_cookies(&self) -> Result<BTreeMap<String, JwtPayload>, JweError> {
        let mut cookies = BTreeMap::new();
        for (name, value) in self.entries() {
            let jwt = decrypt_jwt(
                &value,
                &self.configuration.private_key,
                &self.configuration.decrypt_options,
            )
            .map_err(|e| {
                warn!(cookie = %name, error = %e, "bulk cookie decryption failed");
                e
            })?;
            cookies.insert(name, jwt.payload);
        }
        Ok(cookies)
    }

    /// Encrypt every payload concurrently, then stage them all under the
    /// given (merged) options.
    ///
    /// All-or-nothing: if any encryption fails, the aggregate fails and
    /// nothing is staged.
    ///
    /// # Errors
    ///
    /// The first [`JweError::Encryption`] encountered.
    pub async fn set_multiple_encrypted(
        &mut self,
        payloads: BTreeMap<String, JwtPayload>,
        options: Option<&SetCookieOptions>,
    ) -> Result<(), JweError> {
        let this = &*self;
        let encrypted = try_join_all(payloads.into_iter().map(|(name, payload)| async move {
            this.encrypt_payload(payload, None)
                .map(|token| (name, token))
        }))
        .await?;

        let merged = self.merge_cookie_options(options);
        for (name, token) in encrypted {
            self.store.set(&name, &token, Some(&merged));
        }
        Ok(())
    }

    fn encrypt_payload(
        &self,
        payload: JwtPayload,
        encrypt_hook: Option<&EncryptHook>,
    ) -> Result<String, JweError> {
        let mut jwt = (self.configuration.encrypt_hook)(EncryptJwt::new(payload));
        if let Some(hook) = encrypt_hook {
            jwt = hook(jwt);
        }
        jwt.encrypt(&self.configuration.public_key)
    }

    fn merge_cookie_options(&self, options: Option<&SetCookieOptions>) -> SetCookieOptions {
        match options {
            Some(options) => self.configuration.default_cookie_options.merge(options),
            None => self.configuration.default_cookie_options.clone(),
        }
    }
}

/// Generate a fresh configuration and bind a new map to it.
///
/// Starts from an empty header set when `headers` is `None`. A supplied
/// `cookie_options` becomes the new configuration's default cookie options.
///
/// # Errors
///
/// Returns [`KeyError::Generation`] if key generation fails.
pub async fn map_with_new_key_pair(
    headers: Option<&HeaderMap>,
    cookie_options: Option<SetCookieOptions>,
) -> Result<JweCookieMap, KeyError> {
    let mut configuration = configuration_with_new_key_pair().await?;
    if let Some(options) = cookie_options {
        configuration.default_cookie_options = options;
    }
    let configuration = Arc::new(configuration);
    let map = match headers {
        Some(headers) => JweCookieMap::with_configuration(headers, configuration),
        None => JweCookieMap::from_store(CookieMap::empty(), configuration),
    };
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_encrypt_hook;
    use http::header::COOKIE;
    use jwe_token::KeyManagementAlg;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> JwtPayload {
        value.as_object().cloned().unwrap()
    }

    /// Simulate the next request: turn every staged `Set-Cookie` into a
    /// single `Cookie` header.
    fn next_request_headers(map: &JweCookieMap) -> HeaderMap {
        let pairs: Vec<String> = map
            .set_cookie_values()
            .iter()
            .map(|set_cookie| set_cookie.split(';').next().unwrap().to_owned())
            .collect();
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, pairs.join("; ").parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn encrypted_and_decrypted_payload_stays_the_same() {
        let mut first = map_with_new_key_pair(None, None).await.unwrap();
        first
            .set_encrypted("key", payload(json!({"foo": "bar"})))
            .await
            .unwrap();

        let headers = next_request_headers(&first);
        let next = JweCookieMap::with_configuration(&headers, Arc::clone(first.configuration()));
        assert_eq!(
            next.get_decrypted("key").await.unwrap(),
            Some(payload(json!({"foo": "bar"})))
        );
    }

    #[tokio::test]
    async fn configuration_hook_adds_claims() {
        let base = default_encrypt_hook();
        let configuration = configuration_with_new_key_pair()
            .await
            .unwrap()
            .with_encrypt_hook(Arc::new(move |jwt| base(jwt).set_issued_at(1_700_000_000)));
        let mut first = JweCookieMap::from_store(CookieMap::empty(), Arc::new(configuration));

        first
            .set_encrypted("key", payload(json!({"foo": "bar"})))
            .await
            .unwrap();

        let headers = next_request_headers(&first);
        let next = JweCookieMap::with_configuration(&headers, Arc::clone(first.configuration()));
        assert_eq!(
            next.get_decrypted("key").await.unwrap(),
            Some(payload(json!({"foo": "bar", "iat": 1_700_000_000})))
        );
    }

    #[tokio::test]
    async fn per_call_hook_composes_after_configuration_hook() {
        let mut map = map_with_new_key_pair(None, None).await.unwrap();
        let call_site: EncryptHook = Arc::new(|jwt| jwt.claim("stage", json!("call-site")));
        map.set_encrypted_with(
            "key",
            payload(json!({"stage": "payload"})),
            None,
            Some(&call_site),
        )
        .await
        .unwrap();

        let decrypted = map.get_decrypted("key").await.unwrap().unwrap();
        // The call-site hook runs last, so its claim wins.
        assert_eq!(decrypted.get("stage"), Some(&json!("call-site")));
    }

    #[tokio::test]
    async fn decrypting_with_a_new_key_pair_fails() {
        let mut first = map_with_new_key_pair(None, None).await.unwrap();
        first
            .set_encrypted("key", payload(json!({"foo": "bar"})))
            .await
            .unwrap();

        let headers = next_request_headers(&first);
        let foreign = map_with_new_key_pair(Some(&headers), None).await.unwrap();
        let err = foreign.get_decrypted("key").await.unwrap_err();
        assert!(matches!(err, JweError::DecryptionFailed(_)));
    }

    #[tokio::test]
    async fn decrypting_a_plain_value_fails_as_invalid_token() {
        let mut map = map_with_new_key_pair(None, None).await.unwrap();
        map.set("key", &json!({"foo": "bar"}).to_string(), None);

        let err = map.get_decrypted("key").await.unwrap_err();
        assert!(matches!(err, JweError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn absent_key_is_none_not_an_error() {
        let map = map_with_new_key_pair(None, None).await.unwrap();
        assert_eq!(map.get_decrypted("never-set").await.unwrap(), None);
    }

    #[tokio::test]
    async fn plain_operations_delegate_unchanged() {
        let headers = {
            let mut headers = HeaderMap::new();
            headers.insert(COOKIE, "foo=bar".parse().unwrap());
            headers
        };
        let mut map = map_with_new_key_pair(Some(&headers), None).await.unwrap();

        assert_eq!(map.get("foo").as_deref(), Some("bar"));
        map.set("session", "1234567", None);
        assert_eq!(map.get("session").as_deref(), Some("1234567"));
        assert!(map.entries().contains(&("foo".into(), "bar".into())));
    }

    #[tokio::test]
    async fn bulk_set_then_bulk_decrypt() {
        let mut map = map_with_new_key_pair(None, None).await.unwrap();
        let payloads = BTreeMap::from([
            ("a".to_owned(), payload(json!({"x": 1}))),
            ("b".to_owned(), payload(json!({"y": 2}))),
        ]);
        map.set_multiple_encrypted(payloads, None).await.unwrap();

        let decrypted = map.decrypted_cookies().await.unwrap();
        assert_eq!(decrypted.len(), 2);
        assert_eq!(decrypted["a"], payload(json!({"x": 1})));
        assert_eq!(decrypted["b"], payload(json!({"y": 2})));
    }

    #[tokio::test]
    async fn bulk_decrypt_is_all_or_nothing() {
        let mut map = map_with_new_key_pair(None, None).await.unwrap();
        map.set_encrypted("good", payload(json!({"x": 1})))
            .await
            .unwrap();
        map.set("bad", "not a token", None);

        assert!(map.decrypted_cookies().await.is_err());
    }

    #[tokio::test]
    async fn encrypted_cookie_options_merge_over_defaults() {
        let defaults = SetCookieOptions::new().path("/").secure(true);
        let mut map = map_with_new_key_pair(None, Some(defaults)).await.unwrap();
        let call_site = SetCookieOptions::new().http_only(true).secure(false);
        map.set_encrypted_with("key", payload(json!({"foo": "bar"})), Some(&call_site), None)
            .await
            .unwrap();

        let staged = map.set_cookie_values().remove(0);
        assert!(staged.contains("Path=/"));
        assert!(staged.contains("HttpOnly"));
        assert!(!staged.contains("Secure"));
    }

    #[tokio::test]
    async fn call_site_decrypt_options_override_configuration() {
        let mut configuration = configuration_with_new_key_pair().await.unwrap();
        // Configuration forbids every key management algorithm.
        configuration.decrypt_options = DecryptOptions {
            key_management_algorithms: Some(vec![]),
            content_encryption_algorithms: None,
        };
        let mut map = JweCookieMap::from_store(CookieMap::empty(), Arc::new(configuration));
        map.set_encrypted("key", payload(json!({"foo": "bar"})))
            .await
            .unwrap();

        let err = map.get_decrypted("key").await.unwrap_err();
        assert!(matches!(err, JweError::DecryptionFailed(_)));

        let relaxed = DecryptOptions {
            key_management_algorithms: Some(vec![KeyManagementAlg::RsaOaep256]),
            content_encryption_algorithms: None,
        };
        let decrypted = map
            .get_decrypted_with("key", Some(&relaxed))
            .await
            .unwrap();
        assert_eq!(decrypted, Some(payload(json!({"foo": "bar"}))));
    }

    #[tokio::test]
    async fn failed_encryption_stages_nothing() {
        let mut configuration = configuration_with_new_key_pair().await.unwrap();
        // A hook that clears the protected header makes encryption fail.
        configuration.encrypt_hook = Arc::new(|jwt| jwt);
        let mut map = JweCookieMap::from_store(CookieMap::empty(), Arc::new(configuration));

        let err = map
            .set_encrypted("key", payload(json!({"foo": "bar"})))
            .await
            .unwrap_err();
        assert!(matches!(err, JweError::Encryption(_)));
        assert!(map.store().set_cookie_values().is_empty());
        assert_eq!(map.get("key"), None);
    }
}
