//! Iterable map interface for managing JWE cookies server side.
//!
//! A [`JweCookieMap`] wraps a plaintext cookie collection parsed from request
//! headers and adds encrypted operations: [`JweCookieMap::set_encrypted`]
//! seals a JSON payload into a JWE compact token and stages it as a cookie;
//! [`JweCookieMap::get_decrypted`] recovers the payload on a later request.
//!
//! By default a map uses a process-wide configuration holding an
//! automatically generated RSA-OAEP-256 key pair that is not persisted
//! between executions. The recommended production use is loading your own
//! key pair into a reusable [`JweCookieConfiguration`] with your default
//! cookie options, and passing it to every map explicitly.
//!
//! # Examples
//!
//! Setting an encrypted cookie and reading it back on the next request:
//!
//! ```no_run
//! use http::{header::COOKIE, HeaderMap};
//! use jwe_cookie_map::{map_with_new_key_pair, JweCookieMap, JwtPayload};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut cookies = map_with_new_key_pair(None, None).await?;
//! let payload: JwtPayload = json!({"foo": "bar"}).as_object().cloned().unwrap();
//! cookies.set_encrypted("key", payload).await?;
//!
//! // The staged cookie comes back on the client's next request.
//! let set_cookie = cookies.set_cookie_values().remove(0);
//! let pair = set_cookie.split(';').next().unwrap().to_owned();
//! let mut next_request = HeaderMap::new();
//! next_request.insert(COOKIE, pair.parse()?);
//!
//! let next = JweCookieMap::with_configuration(&next_request, Arc::clone(cookies.configuration()));
//! println!("{:?}", next.get_decrypted("key").await?); // Some({"foo": "bar"})
//! # Ok(())
//! # }
//! ```
//!
//! Plain cookies pass through untouched, and staged cookies can be written
//! onto a response header map:
//!
//! ```no_run
//! use http::{header::COOKIE, HeaderMap};
//! use jwe_cookie_map::JweCookieMap;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut request = HeaderMap::new();
//! request.insert(COOKIE, "foo=bar; bar=baz".parse()?);
//!
//! let mut cookies = JweCookieMap::new(&request).await?;
//! assert_eq!(cookies.get("foo").as_deref(), Some("bar"));
//! cookies.set("session", "1234567", None);
//!
//! let mut response = HeaderMap::new();
//! cookies.write_response(&mut response);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod map;
pub mod options;
pub mod store;

pub use config::{
    configuration_with_new_key_pair, default_configuration, default_encrypt_hook, EncryptHook,
    JweCookieConfiguration,
};
pub use map::{map_with_new_key_pair, JweCookieMap};
pub use options::{SameSite, SetCookieOptions};
pub use store::{CookieMap, CookieStore};

pub use jwe_token::{
    decrypt_jwt, generate_key_pair, ContentEncryptionAlg, DecryptOptions, DecryptedJwt,
    DecryptionKey, EncryptJwt, EncryptionKey, JweError, JwtPayload, KeyError, KeyManagementAlg,
    KeyPair,
};
