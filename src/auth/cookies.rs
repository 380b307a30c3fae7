//! Named-cookie lookup over raw `Set-Cookie` header values.
//!
//! The handshake never uses a cookie jar: each cookie is located by its name
//! prefix and re-attached by hand on the hops that need it.

use std::fmt;

use thiserror::Error;

/// Anonymous login-session cookie issued by the identity provider.
pub const PROVIDENCE_COOKIE: &str = "prov=";

/// Cookie issued once the credentials are accepted.
pub const ACCOUNT_COOKIE: &str = "acct=";

/// Session cookie issued by the query service at the end of the handshake.
pub const SESSION_COOKIE: &str = ".ASPXAUTH=";

/// No `Set-Cookie` value starts with the requested prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no Set-Cookie header starts with '{prefix}'")]
pub struct CookieNotFound {
    /// The prefix that was searched for.
    pub prefix: String,
}

/// Returns the first raw `Set-Cookie` value that starts with `prefix`.
///
/// # Errors
///
/// Returns [`CookieNotFound`] when no value matches.
pub fn find_cookie<'a, I>(set_cookies: I, prefix: &str) -> Result<&'a str, CookieNotFound>
where
    I: IntoIterator<Item = &'a str>,
{
    set_cookies
        .into_iter()
        .find(|cookie| cookie.starts_with(prefix))
        .ok_or_else(|| CookieNotFound {
            prefix: prefix.to_string(),
        })
}

/// Returns the `name=value` pair of a raw `Set-Cookie` value, without attributes.
#[must_use]
pub fn cookie_pair(raw: &str) -> &str {
    raw.split(';').next().unwrap_or(raw).trim()
}

/// A cookie pair captured during the handshake.
///
/// The value is sensitive and is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedCookie(String);

impl CapturedCookie {
    /// Captures the `name=value` pair of a raw `Set-Cookie` value.
    #[must_use]
    pub fn from_set_cookie(raw: &str) -> Self {
        Self(cookie_pair(raw).to_string())
    }

    /// Returns the pair, ready for a `Cookie` header.
    ///
    /// Avoid logging the return value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Joins this cookie with `other` into a single `Cookie` header value.
    #[must_use]
    pub fn joined_with(&self, other: &CapturedCookie) -> String {
        format!("{}; {}", self.0, other.0)
    }

    fn name(&self) -> &str {
        self.0.split('=').next().unwrap_or_default()
    }
}

impl fmt::Debug for CapturedCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=[REDACTED]", self.name())
    }
}
