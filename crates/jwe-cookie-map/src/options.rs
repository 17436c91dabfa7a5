//! Cookie attribute options applied when staging a `Set-Cookie` entry.

use cookie::time::Duration;
use cookie::Cookie;

pub use cookie::SameSite;

/// Attributes for a staged cookie. `None` fields are left to the cookie
/// collection's defaults.
///
/// A configuration carries one of these as its default set;
/// call-site options are overlaid via [`SetCookieOptions::merge`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetCookieOptions {
    /// `Path` attribute.
    pub path: Option<String>,
    /// `Domain` attribute.
    pub domain: Option<String>,
    /// `Secure` attribute.
    pub secure: Option<bool>,
    /// `HttpOnly` attribute.
    pub http_only: Option<bool>,
    /// `SameSite` attribute.
    pub same_site: Option<SameSite>,
    /// `Max-Age` attribute, in seconds.
    pub max_age_secs: Option<i64>,
}

impl SetCookieOptions {
    /// Options with every attribute unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `Path` attribute.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the `Domain` attribute.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the `Secure` attribute.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Set the `HttpOnly` attribute.
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = Some(http_only);
        self
    }

    /// Set the `SameSite` attribute.
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Set the `Max-Age` attribute in seconds.
    pub fn max_age_secs(mut self, secs: i64) -> Self {
        self.max_age_secs = Some(secs);
        self
    }

    /// Overlay `overrides` on `self`; attributes present in `overrides` win.
    pub fn merge(&self, overrides: &SetCookieOptions) -> SetCookieOptions {
        SetCookieOptions {
            path: overrides.path.clone().or_else(|| self.path.clone()),
            domain: overrides.domain.clone().or_else(|| self.domain.clone()),
            secure: overrides.secure.or(self.secure),
            http_only: overrides.http_only.or(self.http_only),
            same_site: overrides.same_site.or(self.same_site),
            max_age_secs: overrides.max_age_secs.or(self.max_age_secs),
        }
    }

    /// Apply the set attributes to `cookie`.
    pub(crate) fn apply(&self, cookie: &mut Cookie<'static>) {
        if let Some(path) = &self.path {
            cookie.set_path(path.clone());
        }
        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        if let Some(secure) = self.secure {
            cookie.set_secure(secure);
        }
        if let Some(http_only) = self.http_only {
            cookie.set_http_only(http_only);
        }
        if let Some(same_site) = self.same_site {
            cookie.set_same_site(same_site);
        }
        if let Some(secs) = self.max_age_secs {
            cookie.set_max_age(Duration::seconds(secs));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_override_attribute_by_attribute() {
        let defaults = SetCookieOptions::new()
            .path("/")
            .secure(true)
            .http_only(true);
        let call_site = SetCookieOptions::new().path("/api").secure(false);

        let merged = defaults.merge(&call_site);
        assert_eq!(merged.path.as_deref(), Some("/api"));
        assert_eq!(merged.secure, Some(false));
        assert_eq!(merged.http_only, Some(true));
        assert_eq!(merged.domain, None);
    }

    #[test]
    fn apply_sets_attributes() {
        let mut cookie = Cookie::new("name", "value");
        SetCookieOptions::new()
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age_secs(3600)
            .apply(&mut cookie);

        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(3600)));
    }
}
