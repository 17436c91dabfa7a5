//! Plaintext cookie collection bound to request headers.
//!
//! Parsing, percent-encoding, and attribute serialization belong to the
//! `cookie` crate; [`CookieMap`] binds its jar to an incoming
//! [`HeaderMap`] and exposes staged mutations as `Set-Cookie` values.

use cookie::{Cookie, CookieJar};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};

use crate::options::SetCookieOptions;

/// Capability interface for a plaintext cookie collection.
///
/// The encrypted map composes over any implementation, so tests can
/// substitute an in-memory store for the header-bound [`CookieMap`].
pub trait CookieStore {
    /// Value stored under `name`, if any.
    fn get(&self, name: &str) -> Option<String>;

    /// Stage `name=value` with the given attributes.
    fn set(&mut self, name: &str, value: &str, options: Option<&SetCookieOptions>);

    /// Every entry currently visible, in collection-defined order.
    fn entries(&self) -> Vec<(String, String)>;
}

/// Cookie collection parsed from `Cookie` request headers.
///
/// Mutations are staged in the jar and become visible both to reads on this
/// map and, via [`CookieMap::set_cookie_values`] /
/// [`CookieMap::write_response`], as `Set-Cookie` header values.
#[derive(Debug, Default)]
pub struct CookieMap {
    jar: CookieJar,
}

impl CookieMap {
    /// Parse every `Cookie` header in `headers`. Unparseable header values
    /// and cookie pairs are skipped.
    pub fn new(headers: &HeaderMap) -> Self {
        let mut jar = CookieJar::new();
        for value in headers.get_all(COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            for cookie in Cookie::split_parse_encoded(raw.to_owned()).flatten() {
                jar.add_original(cookie);
            }
        }
        Self { jar }
    }

    /// A collection with no request cookies.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Serialized `Set-Cookie` values for every staged mutation.
    pub fn set_cookie_values(&self) -> Vec<String> {
        self.jar
            .delta()
            .map(|cookie| cookie.encoded().to_string())
            .collect()
    }

    /// Append a `Set-Cookie` header to `headers` for every staged mutation.
    pub fn write_response(&self, headers: &mut HeaderMap) {
        for value in self.set_cookie_values() {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.append(SET_COOKIE, value);
            }
        }
    }
}

impl CookieStore for CookieMap {
    fn get(&self, name: &str) -> Option<String> {
        self.jar.get(name).map(|cookie| cookie.value().to_owned())
    }

    fn set(&mut self, name: &str, value: &str, options: Option<&SetCookieOptions>) {
        let mut cookie = Cookie::new(name.to_owned(), value.to_owned());
        if let Some(options) = options {
            options.apply(&mut cookie);
        }
        self.jar.add(cookie);
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.jar
            .iter()
            .map(|cookie| (cookie.name().to_owned(), cookie.value().to_owned()))
            .collect()
    }
}
